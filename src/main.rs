fn main() {
    if let Err(err) = stepwatch_lib::run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
