use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bridge::RawEvent;
use crate::config::EngineConfig;
use crate::models::Step;
use crate::session_store::SessionHandoff;

use super::engine::{Collaborators, MonitorEngine};
use super::loop_worker::{monitor_loop, Command, ControlEvent};
use super::state::MonitorStatus;

/// Cloneable sender side of a running monitor. Hosts hand this to their event callbacks and to
/// the overlay's previous/next buttons.
#[derive(Clone)]
pub struct MonitorHandle {
    events: mpsc::UnboundedSender<ControlEvent>,
}

impl MonitorHandle {
    pub fn notify(&self, event: RawEvent) {
        self.send(ControlEvent::Raw(event));
    }

    pub fn previous_step(&self) {
        self.command(Command::PreviousStep);
    }

    pub fn next_step(&self) {
        self.command(Command::NextStep);
    }

    pub fn load_session(&self, steps: Vec<Step>) {
        self.command(Command::LoadSession(steps));
    }

    pub fn end_session(&self) {
        self.command(Command::EndSession);
    }

    pub fn apply_handoff(&self, handoff: SessionHandoff) {
        self.command(Command::Handoff(handoff));
    }

    /// Answered after every event queued before it has been handled.
    pub async fn status(&self) -> Result<MonitorStatus> {
        let (tx, rx) = oneshot::channel();
        self.events
            .send(ControlEvent::Command(Command::Status(tx)))
            .map_err(|_| anyhow!("monitor is not running"))?;
        rx.await.context("monitor stopped before answering")
    }

    fn command(&self, command: Command) {
        self.send(ControlEvent::Command(command));
    }

    fn send(&self, event: ControlEvent) {
        if let Err(err) = self.events.send(event) {
            debug!("monitor stopped; dropping {:?}", err.0);
        }
    }
}

/// Owns the monitor worker. `start` spins it up, `stop` cancels pending debounces and joins.
pub struct MonitoringController {
    collaborators: Collaborators,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    sender: Option<MonitorHandle>,
}

impl MonitoringController {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            handle: None,
            cancel_token: None,
            sender: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(&mut self, config: EngineConfig) -> Result<MonitorHandle> {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let engine = MonitorEngine::new(config, self.collaborators.clone());

        let handle = tokio::spawn(monitor_loop(engine, rx, cancel_token.clone()));
        let sender = MonitorHandle { events: tx };

        info!("monitoring controller started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.sender = Some(sender.clone());
        Ok(sender)
    }

    /// Reloads the session whenever the hand-off changes, until the controller stops.
    pub fn follow_handoff(&self, mut updates: watch::Receiver<SessionHandoff>) -> Result<()> {
        let (Some(sender), Some(token)) = (self.sender.clone(), self.cancel_token.clone()) else {
            bail!("monitoring is not active");
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            debug!("hand-off source dropped");
                            break;
                        }
                        let handoff = updates.borrow_and_update().clone();
                        debug!("hand-off changed: tracking_active={}", handoff.tracking_active);
                        sender.apply_handoff(handoff);
                    }
                }
            }
        });
        Ok(())
    }

    pub fn handle(&self) -> Option<MonitorHandle> {
        self.sender.clone()
    }

    pub fn notify(&self, event: RawEvent) {
        if let Some(sender) = &self.sender {
            sender.notify(event);
        }
    }

    pub async fn status(&self) -> Result<MonitorStatus> {
        match &self.sender {
            Some(sender) => sender.status().await,
            None => bail!("monitoring is not active"),
        }
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.sender = None;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| info!("monitoring controller stopped"))
        } else {
            Ok(())
        }
    }
}
