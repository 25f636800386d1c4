use std::sync::Arc;

use crate::{
    bridge::{ObservationSource, PresentationSink, StepStatus},
    config::EngineConfig,
    matching::StepMatcher,
    models::{ErrorType, Step},
    session_store::SessionHandoff,
    telemetry::{TelemetryEvent, TelemetrySink},
};

use super::state::{MonitorStatus, MonitoringState, SessionPhase, StepPhase};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// External collaborators injected into the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub observer: Arc<dyn ObservationSource>,
    pub presentation: Arc<dyn PresentationSink>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

/// What a snapshot-and-evaluate pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Active step already completed; nothing was observed.
    Skipped,
    /// Snapshot taken but no step is active.
    NoActiveStep,
    Matched { newly_completed: bool },
    Unmatched {
        detected: ErrorType,
        reported: Option<ErrorType>,
    },
}

/// Synchronous core of the monitor: matching, thresholds, navigation and reload.
///
/// Owned by exactly one task; see `loop_worker::monitor_loop`.
pub struct MonitorEngine {
    state: MonitoringState,
    matcher: StepMatcher,
    collaborators: Collaborators,
    config: EngineConfig,
}

impl MonitorEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        Self {
            state: MonitoringState::new(),
            matcher: StepMatcher::new(config.frozen_after()),
            collaborators,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &MonitoringState {
        &self.state
    }

    pub fn matcher(&self) -> &StepMatcher {
        &self.matcher
    }

    pub fn status(&self) -> MonitorStatus {
        self.state.status()
    }

    /// Records the click unconditionally, then evaluates right away.
    pub fn on_click(&mut self, view_id: Option<String>) -> PassOutcome {
        log_debug!("click: viewId={:?}", view_id);
        self.matcher.record_click(view_id.as_deref());
        self.evaluate()
    }

    /// The snapshot-and-evaluate pass.
    pub fn evaluate(&mut self) -> PassOutcome {
        // The click marker is single-use context for this pass only.
        let clicked_view_id = self.matcher.take_clicked_view_id();

        if self.state.current_is_completed() {
            log_debug!("step {} already completed; skipping pass", self.state.current_index() + 1);
            return PassOutcome::Skipped;
        }

        let snapshot = self.collaborators.observer.current_snapshot();
        log_debug!(
            "snapshot: pkg={}, views={}, texts={}",
            snapshot.package_name,
            snapshot.visible_views.len(),
            snapshot.text_nodes.len()
        );
        self.emit(TelemetryEvent::Snapshot {
            package_name: snapshot.package_name.clone(),
            view_count: snapshot.visible_views.len(),
            text_count: snapshot.text_nodes.len(),
        });

        self.matcher.update_snapshot(snapshot.clone());

        let Some(step) = self.state.current_step().cloned() else {
            log_debug!("no active step; ignoring snapshot");
            return PassOutcome::NoActiveStep;
        };

        let step_number = self.state.current_index() + 1;
        let total_steps = self.state.len();

        self.emit(TelemetryEvent::StepCheck {
            step_number,
            total_steps,
            step_name: step.step_name.clone(),
            expected_package: step.expected_package().to_string(),
            current_package: snapshot.package_name.clone(),
        });
        let presentation = &self.collaborators.presentation;
        presentation.set_current_step(step_number, total_steps, &step.step_name);
        presentation.set_status(StepStatus::Checking);
        self.state.phase = StepPhase::Checking;

        if self.matcher.is_step_matched(&step, &snapshot) {
            return self.on_matched(&step, step_number);
        }

        self.collaborators.presentation.set_status(StepStatus::Waiting);
        self.state.phase = StepPhase::Waiting;

        let detected = self
            .matcher
            .detect_error(&step, &snapshot, clicked_view_id.as_deref());
        let reported = self.apply_threshold(detected);

        if let Some(error) = reported {
            self.report_error(step_number, error);
        }

        PassOutcome::Unmatched { detected, reported }
    }

    fn on_matched(&mut self, step: &Step, step_number: usize) -> PassOutcome {
        log_info!("step {} ({}) matched", step_number, step.step_name);
        self.state.reset_errors();
        self.collaborators.presentation.set_status(StepStatus::Matched);
        self.state.phase = StepPhase::Matched;

        let newly_completed = match self.state.current_progress_mut() {
            Some(progress) if !progress.is_completed => {
                progress.is_completed = true;
                progress.error_type = ErrorType::None;
                true
            }
            _ => false,
        };

        if newly_completed {
            self.emit(TelemetryEvent::StepMatched {
                step_number,
                step_name: step.step_name.clone(),
            });

            if self.state.is_last_step() {
                log_info!("final step matched; curriculum complete");
                self.emit(TelemetryEvent::AllCompleted {});
                self.collaborators.presentation.set_status(StepStatus::Completed);
                self.state.phase = StepPhase::Completed;
            }
        }

        PassOutcome::Matched { newly_completed }
    }

    /// Confidence gate. Returns the error to surface, if any.
    fn apply_threshold(&mut self, detected: ErrorType) -> Option<ErrorType> {
        if detected.is_confidence_gated() {
            return self.count_sighting(detected);
        }

        self.state.reset_errors();
        if detected == ErrorType::WrongClick {
            log_warn!("wrong click detected");
            Some(ErrorType::WrongClick)
        } else {
            None
        }
    }

    fn count_sighting(&mut self, gated: ErrorType) -> Option<ErrorType> {
        if gated != self.state.last_error_type {
            self.state.last_error_type = gated;
            self.state.consecutive_error_count = 1;
            return None;
        }

        self.state.consecutive_error_count += 1;
        let threshold = self.config.effective_error_threshold();
        log_debug!(
            "consecutive {} count: {}/{}",
            gated,
            self.state.consecutive_error_count,
            threshold
        );

        if self.state.consecutive_error_count >= threshold {
            log_warn!(
                "confirmed {} after {} sightings",
                gated,
                self.state.consecutive_error_count
            );
            self.state.consecutive_error_count = 0;
            Some(gated)
        } else {
            None
        }
    }

    fn report_error(&mut self, step_number: usize, error: ErrorType) {
        if let Some(progress) = self.state.current_progress_mut() {
            progress.error_type = error;
        }
        self.emit(TelemetryEvent::Error {
            step_number,
            error_type: error,
        });
        self.collaborators
            .presentation
            .show_error(error, self.config.error_auto_hide_ms);
    }

    pub fn move_to_previous_step(&mut self) -> bool {
        let index = self.state.current_index();
        if self.state.is_empty() || index == 0 {
            log_debug!("already at first step; cannot go back");
            return false;
        }
        self.navigate_to(index - 1, "Moved back to step")
    }

    pub fn move_to_next_step(&mut self) -> bool {
        let index = self.state.current_index();
        if self.state.is_empty() || index + 1 >= self.state.len() {
            log_debug!("already at last step; cannot go forward");
            return false;
        }
        self.navigate_to(index + 1, "Moved forward to step")
    }

    fn navigate_to(&mut self, index: usize, verb: &str) -> bool {
        if !self.state.activate(index) {
            return false;
        }
        self.state.phase = StepPhase::Waiting;

        let total = self.state.len();
        let Some(step) = self.state.current_step() else {
            return false;
        };
        let name = step.step_name.clone();

        let presentation = &self.collaborators.presentation;
        presentation.set_current_step(index + 1, total, &name);
        presentation.set_status(StepStatus::Waiting);

        log_info!("{} {}/{}: {}", verb, index + 1, total, name);
        self.emit(TelemetryEvent::status(format!("{verb} {}: {name}", index + 1)));
        true
    }

    /// Replaces the curriculum wholesale; a restart and a first start look the same.
    pub fn load_session(&mut self, steps: Vec<Step>) {
        if steps.is_empty() {
            log_warn!("session signalled with no steps; clearing");
            self.end_session();
            return;
        }

        let mut seen = std::collections::HashSet::new();
        for step in &steps {
            if !seen.insert(step.step_id) {
                log_warn!("duplicate step id {} shares progress", step.step_id);
            }
        }

        let run_id = self.state.replace_steps(steps);
        let total = self.state.len();
        let first_name = self
            .state
            .current_step()
            .map(|step| step.step_name.clone())
            .unwrap_or_default();

        log_info!("loaded {} steps (run {}); first: {}", total, run_id, first_name);

        let presentation = &self.collaborators.presentation;
        presentation.hide();
        presentation.show();
        presentation.set_current_step(1, total, &first_name);
        presentation.set_status(StepStatus::Waiting);

        self.emit(TelemetryEvent::status("New tracking session started"));
        self.emit(TelemetryEvent::status(format!(
            "Loaded {total} steps. First step: {first_name}"
        )));
    }

    pub fn end_session(&mut self) {
        if self.state.session == SessionPhase::Active {
            log_info!("tracking session ended");
        }
        self.state.clear();
        self.collaborators.presentation.hide();
        self.emit(TelemetryEvent::status("No active tracking session"));
    }

    /// Applies a persisted hand-off. Malformed step lists clear the session.
    pub fn apply_handoff(&mut self, handoff: &SessionHandoff) {
        match handoff.decode_steps() {
            Ok(Some(steps)) => self.load_session(steps),
            Ok(None) => self.end_session(),
            Err(err) => {
                log_error!("failed to load steps from hand-off: {err:#}");
                self.state.clear();
                self.collaborators.presentation.hide();
                self.emit(TelemetryEvent::status(format!("Step load error: {err}")));
            }
        }
    }

    fn emit(&self, event: TelemetryEvent) {
        self.collaborators.telemetry.send(event);
    }
}
