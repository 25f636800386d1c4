use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tokio::sync::watch;

use crate::models::Step;

/// What the curriculum picker hands to the monitor: a tracking flag plus the selected steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionHandoff {
    pub tracking_active: bool,
    /// JSON-encoded array of steps.
    pub steps_json: Option<String>,
}

impl SessionHandoff {
    pub fn active(steps: &[Step]) -> Result<Self> {
        Ok(Self {
            tracking_active: true,
            steps_json: Some(serde_json::to_string(steps).context("failed to encode steps")?),
        })
    }

    /// `Ok(None)` when tracking is off or no steps were handed over.
    pub fn decode_steps(&self) -> Result<Option<Vec<Step>>> {
        if !self.tracking_active {
            return Ok(None);
        }
        let Some(json) = self.steps_json.as_deref() else {
            return Ok(None);
        };
        let steps = serde_json::from_str(json).context("malformed persisted step list")?;
        Ok(Some(steps))
    }
}

/// File-backed hand-off. Every write is published to subscribers.
pub struct SessionStore {
    path: PathBuf,
    data: RwLock<SessionHandoff>,
    tx: watch::Sender<SessionHandoff>,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            SessionHandoff::default()
        };

        let (tx, _) = watch::channel(data.clone());
        Ok(Self {
            path,
            data: RwLock::new(data),
            tx,
        })
    }

    pub fn handoff(&self) -> SessionHandoff {
        self.read().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionHandoff> {
        self.tx.subscribe()
    }

    /// Forces tracking off; called when the monitor comes up so a stale flag never auto-starts.
    pub fn reset(&self) -> Result<()> {
        self.update(|data| data.tracking_active = false)
    }

    /// Writes the steps with the flag off, then flips it on, so every start is a transition.
    pub fn start_tracking(&self, steps: &[Step]) -> Result<()> {
        let encoded = serde_json::to_string(steps).context("failed to encode steps")?;
        self.update(|data| {
            data.steps_json = Some(encoded);
            data.tracking_active = false;
        })?;
        self.update(|data| data.tracking_active = true)
    }

    pub fn stop_tracking(&self) -> Result<()> {
        self.update(|data| data.tracking_active = false)
    }

    fn update(&self, apply: impl FnOnce(&mut SessionHandoff)) -> Result<()> {
        let snapshot = {
            let mut guard = self.write();
            apply(&mut guard);
            self.persist(&guard)?;
            guard.clone()
        };
        self.tx.send_replace(snapshot);
        Ok(())
    }

    fn persist(&self, data: &SessionHandoff) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionHandoff> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionHandoff> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeyView, StepExpectation};

    fn sample_steps() -> Vec<Step> {
        vec![Step::new(
            1,
            "Open app",
            StepExpectation {
                expected_package: "com.a".into(),
                expected_activity: None,
                expected_key_views: vec![KeyView::with_id("go")],
            },
        )]
    }

    #[test]
    fn start_tracking_persists_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(path.clone()).unwrap();
        let mut rx = store.subscribe();

        store.start_tracking(&sample_steps()).unwrap();

        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone();
        assert!(published.tracking_active);
        assert_eq!(published.decode_steps().unwrap().unwrap(), sample_steps());

        let reopened = SessionStore::new(path).unwrap();
        assert_eq!(reopened.handoff(), published);
    }

    #[test]
    fn reset_turns_tracking_off_but_keeps_steps() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json")).unwrap();
        store.start_tracking(&sample_steps()).unwrap();
        store.reset().unwrap();

        let handoff = store.handoff();
        assert!(!handoff.tracking_active);
        assert!(handoff.steps_json.is_some());
        assert_eq!(handoff.decode_steps().unwrap(), None);
    }

    #[test]
    fn malformed_steps_are_an_error() {
        let handoff = SessionHandoff {
            tracking_active: true,
            steps_json: Some("[{\"stepId\": ".into()),
        };
        assert!(handoff.decode_steps().is_err());
    }

    #[test]
    fn corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let store = SessionStore::new(path).unwrap();
        assert_eq!(store.handoff(), SessionHandoff::default());
    }
}
