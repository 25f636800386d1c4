use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::bridge::LogPresentation;
use crate::config::EngineConfig;
use crate::curriculum::{parse_steps, select_steps, CurriculumClient};
use crate::models::Step;
use crate::monitoring::{Collaborators, MonitorHandle, MonitoringController, SessionPhase};
use crate::replay::{load_trace, replay, ReplayReport, ReplaySource};
use crate::session_store::SessionStore;
use crate::telemetry::{HttpTelemetrySink, LogTelemetrySink, TelemetrySink};

const HANDOFF_WAIT: Duration = Duration::from_secs(2);

/// Where the replayed curriculum comes from.
pub enum StepSource {
    File(PathBuf),
    Server(String),
}

pub struct ReplayOptions {
    pub trace: PathBuf,
    pub steps: StepSource,
    /// 1-based step numbers to keep; empty keeps all.
    pub only: Vec<usize>,
    pub store: Option<PathBuf>,
    pub telemetry: bool,
}

pub async fn list_sessions(config: &EngineConfig) -> Result<()> {
    let client = CurriculumClient::new(config.server_base(), config.http_timeout());
    let sessions = client.list_sessions().await;
    if sessions.is_empty() {
        warn!("no sessions found at {}", config.server_base());
    }
    for session in sessions {
        println!("{session}");
    }
    Ok(())
}

pub async fn session_info(config: &EngineConfig, session: &str) -> Result<()> {
    let client = CurriculumClient::new(config.server_base(), config.http_timeout());
    let info = client.session_info(session).await;
    println!("{}", serde_json::to_string_pretty(&info)?);
    for name in client.step_names(session).await {
        println!("  {name}");
    }
    Ok(())
}

pub async fn run_replay(config: EngineConfig, options: ReplayOptions) -> Result<ReplayReport> {
    let trace = load_trace(&options.trace)?;
    let steps = load_curriculum(&config, &options.steps).await?;
    let steps = filter_steps(steps, &options.only);
    if steps.is_empty() {
        bail!("no steps to track");
    }
    info!("replaying {} entries against {} steps", trace.len(), steps.len());

    let telemetry: Arc<dyn TelemetrySink> = if options.telemetry {
        Arc::new(HttpTelemetrySink::new(config.server_base(), config.http_timeout()))
    } else {
        Arc::new(LogTelemetrySink)
    };
    let source = Arc::new(ReplaySource::new());
    let collaborators = Collaborators {
        observer: source.clone(),
        presentation: Arc::new(LogPresentation),
        telemetry,
    };

    let mut controller = MonitoringController::new(collaborators);
    let handle = controller.start(config)?;

    let store = match &options.store {
        Some(path) => {
            let store = SessionStore::new(path.clone())?;
            store.reset()?;
            controller.follow_handoff(store.subscribe())?;
            store.start_tracking(&steps)?;
            wait_for_session(&handle).await?;
            Some(store)
        }
        None => {
            handle.load_session(steps);
            None
        }
    };

    let report = replay(&handle, &source, &trace).await;

    if let Some(store) = store {
        if let Err(err) = store.stop_tracking() {
            warn!("failed to clear session store: {err:#}");
        }
    }
    controller.stop().await?;
    report
}

async fn load_curriculum(config: &EngineConfig, source: &StepSource) -> Result<Vec<Step>> {
    match source {
        StepSource::File(path) => read_steps_file(path),
        StepSource::Server(session) => {
            let client = CurriculumClient::new(config.server_base(), config.http_timeout());
            Ok(client.load_steps(session).await)
        }
    }
}

fn read_steps_file(path: &Path) -> Result<Vec<Step>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read steps file {}", path.display()))?;
    parse_steps(&body)
}

fn filter_steps(steps: Vec<Step>, only: &[usize]) -> Vec<Step> {
    if only.is_empty() {
        return steps;
    }
    let mask: Vec<bool> = (1..=steps.len()).map(|number| only.contains(&number)).collect();
    select_steps(&steps, &mask)
}

async fn wait_for_session(handle: &MonitorHandle) -> Result<()> {
    let deadline = tokio::time::Instant::now() + HANDOFF_WAIT;
    loop {
        if handle.status().await?.session == SessionPhase::Active {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("session hand-off was not picked up");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
