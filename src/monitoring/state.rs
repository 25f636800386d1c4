use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{ErrorType, Step, StepId, StepProgress};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    NoSession,
    Active,
}

/// Where the active step is in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StepPhase {
    #[default]
    Idle,
    Waiting,
    Checking,
    Matched,
    Completed,
}

/// Read model of the controller, handed out to hosts and tests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub session: SessionPhase,
    pub phase: StepPhase,
    pub run_id: Option<Uuid>,
    pub step_index: usize,
    pub total_steps: usize,
    pub step_id: Option<StepId>,
    pub step_name: Option<String>,
    pub completed: bool,
    pub step_error: ErrorType,
    pub consecutive_errors: u32,
    pub last_error: ErrorType,
    /// Completion flags for every loaded step, in curriculum order.
    pub completed_flags: Vec<bool>,
}

/// Controller-owned state. Only the monitor worker mutates it.
#[derive(Debug, Default)]
pub struct MonitoringState {
    steps: Vec<Step>,
    progress: HashMap<StepId, StepProgress>,
    current_index: usize,
    pub(crate) consecutive_error_count: u32,
    pub(crate) last_error_type: ErrorType,
    pub(crate) session: SessionPhase,
    pub(crate) phase: StepPhase,
    run_id: Option<Uuid>,
}

impl MonitoringState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a new curriculum as one unit: steps, index, progress and counters together.
    pub fn replace_steps(&mut self, steps: Vec<Step>) -> Uuid {
        let run_id = Uuid::new_v4();
        let progress = steps
            .iter()
            .map(|step| (step.step_id, StepProgress::default()))
            .collect();

        *self = Self {
            steps,
            progress,
            current_index: 0,
            consecutive_error_count: 0,
            last_error_type: ErrorType::None,
            session: SessionPhase::Active,
            phase: StepPhase::Waiting,
            run_id: Some(run_id),
        };
        run_id
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_index)
    }

    pub fn is_last_step(&self) -> bool {
        !self.steps.is_empty() && self.current_index == self.steps.len() - 1
    }

    pub fn progress_of(&self, step_id: StepId) -> StepProgress {
        self.progress.get(&step_id).copied().unwrap_or_default()
    }

    pub fn current_progress(&self) -> Option<StepProgress> {
        self.current_step().map(|step| self.progress_of(step.step_id))
    }

    pub fn current_progress_mut(&mut self) -> Option<&mut StepProgress> {
        let step_id = self.current_step()?.step_id;
        Some(self.progress.entry(step_id).or_default())
    }

    pub fn current_is_completed(&self) -> bool {
        self.current_progress()
            .map(|progress| progress.is_completed)
            .unwrap_or(false)
    }

    /// Moves to `index` and resets that step's progress. Out-of-range targets are refused.
    pub fn activate(&mut self, index: usize) -> bool {
        if index >= self.steps.len() {
            return false;
        }
        self.current_index = index;
        if let Some(progress) = self.current_progress_mut() {
            progress.reset();
        }
        true
    }

    pub fn reset_errors(&mut self) {
        self.consecutive_error_count = 0;
        self.last_error_type = ErrorType::None;
    }

    pub fn status(&self) -> MonitorStatus {
        let step = self.current_step();
        let progress = self.current_progress().unwrap_or_default();

        MonitorStatus {
            session: self.session,
            phase: self.phase,
            run_id: self.run_id,
            step_index: self.current_index,
            total_steps: self.steps.len(),
            step_id: step.map(|s| s.step_id),
            step_name: step.map(|s| s.step_name.clone()),
            completed: progress.is_completed,
            step_error: progress.error_type,
            consecutive_errors: self.consecutive_error_count,
            last_error: self.last_error_type,
            completed_flags: self
                .steps
                .iter()
                .map(|s| self.progress_of(s.step_id).is_completed)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepExpectation;

    fn steps(ids: &[StepId]) -> Vec<Step> {
        ids.iter()
            .map(|id| Step::new(*id, format!("step {id}"), StepExpectation::default()))
            .collect()
    }

    #[test]
    fn replace_resets_index_progress_and_counters() {
        let mut state = MonitoringState::new();
        state.replace_steps(steps(&[10, 20]));
        state.activate(1);
        state.current_progress_mut().unwrap().is_completed = true;
        state.consecutive_error_count = 3;
        state.last_error_type = ErrorType::WrongApp;

        let first_run = state.run_id();
        state.replace_steps(steps(&[10, 20, 30]));

        assert_eq!(state.current_index(), 0);
        assert_eq!(state.len(), 3);
        assert_eq!(state.consecutive_error_count, 0);
        assert_eq!(state.last_error_type, ErrorType::None);
        assert!(state.status().completed_flags.iter().all(|done| !done));
        assert_ne!(state.run_id(), first_run);
    }

    #[test]
    fn activate_rejects_out_of_range() {
        let mut state = MonitoringState::new();
        assert!(!state.activate(0));
        state.replace_steps(steps(&[1]));
        assert!(!state.activate(1));
        assert!(state.activate(0));
    }

    #[test]
    fn status_of_empty_state() {
        let status = MonitoringState::new().status();
        assert_eq!(status.session, SessionPhase::NoSession);
        assert_eq!(status.phase, StepPhase::Idle);
        assert_eq!(status.step_id, None);
        assert!(status.completed_flags.is_empty());
    }
}
