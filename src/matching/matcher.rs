use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::models::{ErrorType, KeyView, Snapshot, Step};

pub const DEFAULT_FROZEN_AFTER: Duration = Duration::from_millis(3000);

/// Decides whether a snapshot satisfies a step and classifies what went wrong when it does not.
///
/// Holds only the context needed for frozen-screen detection: when the last click happened and
/// the two most recent snapshots.
#[derive(Debug, Clone)]
pub struct StepMatcher {
    frozen_after: Duration,
    last_click_at: Option<Instant>,
    last_clicked_view_id: Option<String>,
    /// Most recent snapshot handed to `update_snapshot`.
    latest: Option<Snapshot>,
    /// The snapshot `latest` replaced; the frozen-screen baseline.
    previous: Option<Snapshot>,
}

impl Default for StepMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FROZEN_AFTER)
    }
}

impl StepMatcher {
    pub fn new(frozen_after: Duration) -> Self {
        Self {
            frozen_after,
            last_click_at: None,
            last_clicked_view_id: None,
            latest: None,
            previous: None,
        }
    }

    /// Any-of matching: the package must contain the expected package and at least one key view
    /// must be evidenced on screen. Activity is never consulted.
    pub fn is_step_matched(&self, step: &Step, snapshot: &Snapshot) -> bool {
        let expected_package = step.expected_package();
        if !contains_ignore_case(&snapshot.package_name, expected_package) {
            debug!(
                "[matcher] package mismatch: expected={}, actual={}",
                expected_package, snapshot.package_name
            );
            return false;
        }

        for key_view in step.key_views() {
            if key_view_evidenced(key_view, snapshot) {
                debug!("[matcher] step {} matched on {:?}", step.step_id, key_view);
                return true;
            }
        }

        debug!(
            "[matcher] no key views matched for step {} (checked {})",
            step.step_id,
            step.key_views().len()
        );
        false
    }

    pub fn detect_error(
        &self,
        step: &Step,
        snapshot: &Snapshot,
        clicked_view_id: Option<&str>,
    ) -> ErrorType {
        self.detect_error_at(step, snapshot, clicked_view_id, Instant::now())
    }

    /// Classification with an explicit clock reading. Precedence is wrong app, then frozen
    /// screen, then wrong click.
    pub fn detect_error_at(
        &self,
        step: &Step,
        snapshot: &Snapshot,
        clicked_view_id: Option<&str>,
        now: Instant,
    ) -> ErrorType {
        let expected_package = step.expected_package();
        let same_app = starts_with_ignore_case(&snapshot.package_name, expected_package)
            || starts_with_ignore_case(expected_package, &snapshot.package_name);
        if !same_app {
            return ErrorType::WrongApp;
        }

        if self.is_frozen(snapshot, now) {
            return ErrorType::FrozenScreen;
        }

        if let Some(clicked) = clicked_view_id {
            let expected = step
                .key_views()
                .iter()
                .any(|kv| kv.view_id.as_deref() == Some(clicked));
            if !expected {
                return ErrorType::WrongClick;
            }
        }

        ErrorType::None
    }

    pub fn record_click(&mut self, view_id: Option<&str>) {
        self.record_click_at(view_id, Instant::now());
    }

    pub fn record_click_at(&mut self, view_id: Option<&str>, at: Instant) {
        self.last_click_at = Some(at);
        self.last_clicked_view_id = view_id.map(str::to_string);
    }

    pub fn update_snapshot(&mut self, snapshot: Snapshot) {
        self.previous = self.latest.replace(snapshot);
    }

    pub fn last_click_at(&self) -> Option<Instant> {
        self.last_click_at
    }

    /// The clicked view id is context for one pass only; taking it clears it.
    pub fn take_clicked_view_id(&mut self) -> Option<String> {
        self.last_clicked_view_id.take()
    }

    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    fn is_frozen(&self, snapshot: &Snapshot, now: Instant) -> bool {
        // No click yet: an idle screen is not a frozen one.
        let Some(clicked_at) = self.last_click_at else {
            return false;
        };

        if now.saturating_duration_since(clicked_at) < self.frozen_after {
            return false;
        }

        self.previous
            .as_ref()
            .map(|baseline| baseline.same_screen_as(snapshot))
            .unwrap_or(false)
    }
}

fn key_view_evidenced(key_view: &KeyView, snapshot: &Snapshot) -> bool {
    if let Some(view_id) = key_view.view_id.as_deref() {
        let id_suffix = format!("/{view_id}");
        let res_suffix = format!(":id/{view_id}");
        let hit = snapshot.visible_views.iter().any(|visible| {
            visible == view_id
                || visible.ends_with(&id_suffix)
                || visible.ends_with(&res_suffix)
                || contains_ignore_case(visible, view_id)
        });
        if hit {
            return true;
        }
    }

    if let Some(text) = key_view.text.as_deref() {
        // Bidirectional: rendered text and recorded text may each be truncated.
        let hit = snapshot
            .text_nodes
            .iter()
            .any(|node| contains_ignore_case(node, text) || contains_ignore_case(text, node));
        if hit {
            return true;
        }
    }

    false
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.to_lowercase())
}
