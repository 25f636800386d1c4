use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

use crate::bridge::RawEvent;
use crate::models::Step;
use crate::session_store::SessionHandoff;

use super::engine::MonitorEngine;
use super::state::{MonitorStatus, SessionPhase};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Everything that can touch monitoring state goes through this queue.
#[derive(Debug)]
pub enum ControlEvent {
    Raw(RawEvent),
    Command(Command),
}

/// Host-issued requests, as opposed to raw UI notifications.
#[derive(Debug)]
pub enum Command {
    PreviousStep,
    NextStep,
    LoadSession(Vec<Step>),
    EndSession,
    Handoff(SessionHandoff),
    Status(oneshot::Sender<MonitorStatus>),
}

/// Single owner of the engine. Content changes are coalesced behind one pending sleep; every
/// other event is handled as it arrives.
pub async fn monitor_loop(
    mut engine: MonitorEngine,
    mut events: mpsc::UnboundedReceiver<ControlEvent>,
    cancel_token: CancellationToken,
) {
    let debounce = engine.config().debounce();
    let mut pending: Option<Pin<Box<Sleep>>> = None;

    log_info!("monitor loop started (debounce {}ms)", debounce.as_millis());

    loop {
        let debounce_armed = pending.is_some();

        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_info!("monitor loop shutting down");
                break;
            }
            received = events.recv() => {
                let Some(event) = received else {
                    log_info!("event channel closed; monitor loop exiting");
                    break;
                };

                match event {
                    ControlEvent::Raw(RawEvent::ContentChanged) => {
                        // Restart the quiet window; an earlier pending pass is dropped.
                        pending = Some(Box::pin(tokio::time::sleep(debounce)));
                    }
                    ControlEvent::Raw(RawEvent::Click { view_id }) => {
                        engine.on_click(view_id);
                    }
                    ControlEvent::Raw(RawEvent::WindowChanged | RawEvent::TextChanged) => {
                        engine.evaluate();
                    }
                    ControlEvent::Command(command) => {
                        let session_ended = handle_command(&mut engine, command);
                        if session_ended && pending.take().is_some() {
                            log_debug!("session ended; pending debounced pass dropped");
                        }
                    }
                }
            }
            _ = async {
                if let Some(sleep) = pending.as_mut() {
                    sleep.await;
                }
            }, if debounce_armed => {
                pending = None;
                log_debug!("debounced pass firing");
                engine.evaluate();
            }
        }
    }
}

/// Returns true when the command left the monitor without a session.
fn handle_command(engine: &mut MonitorEngine, command: Command) -> bool {
    match command {
        Command::PreviousStep => {
            engine.move_to_previous_step();
            false
        }
        Command::NextStep => {
            engine.move_to_next_step();
            false
        }
        Command::LoadSession(steps) => {
            engine.load_session(steps);
            engine.state().session == SessionPhase::NoSession
        }
        Command::EndSession => {
            engine.end_session();
            true
        }
        Command::Handoff(handoff) => {
            engine.apply_handoff(&handoff);
            engine.state().session == SessionPhase::NoSession
        }
        Command::Status(reply) => {
            let _ = reply.send(engine.status());
            false
        }
    }
}
