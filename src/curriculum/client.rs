use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info};
use serde::Deserialize;

use crate::models::{RawStep, Step};

use super::session::SessionInfo;

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StepList {
    #[serde(default)]
    steps: Vec<RawStep>,
}

/// Parses a `list_sessions` body, newest session first.
pub fn parse_sessions(body: &str) -> Result<Vec<String>> {
    let list: SessionList = serde_json::from_str(body).context("malformed session list")?;
    let mut sessions = list.sessions;
    sessions.sort_unstable_by(|a, b| b.cmp(a));
    Ok(sessions)
}

pub fn parse_steps(body: &str) -> Result<Vec<Step>> {
    let list: StepList = serde_json::from_str(body).context("malformed step list")?;
    Ok(list.steps.into_iter().map(RawStep::into_step).collect())
}

/// Keeps the steps whose position is marked in `selected`.
pub fn select_steps(all: &[Step], selected: &[bool]) -> Vec<Step> {
    all.iter()
        .zip(selected)
        .filter(|(_, keep)| **keep)
        .map(|(step, _)| step.clone())
        .collect()
}

/// HTTP client for the demonstration server. Every public call degrades to an empty result.
#[derive(Clone)]
pub struct CurriculumClient {
    base_url: String,
    client: reqwest::Client,
}

impl CurriculumClient {
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn list_sessions(&self) -> Vec<String> {
        match self.fetch_sessions().await {
            Ok(sessions) => sessions,
            Err(err) => {
                error!("Error loading sessions: {err:#}");
                Vec::new()
            }
        }
    }

    pub async fn load_steps(&self, session: &str) -> Vec<Step> {
        match self.fetch_steps(session).await {
            Ok(steps) => {
                info!("Loaded {} steps from {}", steps.len(), session);
                steps
            }
            Err(err) => {
                error!("Error loading steps from session {session}: {err:#}");
                Vec::new()
            }
        }
    }

    pub async fn load_step(&self, session: &str, index: usize) -> Option<Step> {
        self.load_steps(session).await.into_iter().nth(index)
    }

    pub async fn step_names(&self, session: &str) -> Vec<String> {
        self.load_steps(session)
            .await
            .iter()
            .map(|step| format!("step{}.json", step.step_id))
            .collect()
    }

    pub async fn session_info(&self, session: &str) -> SessionInfo {
        let steps = self.load_steps(session).await;
        SessionInfo::new(session, steps.len())
    }

    async fn fetch_sessions(&self) -> Result<Vec<String>> {
        let body = self.get_text(&format!("{}/api/list_sessions", self.base_url)).await?;
        parse_sessions(&body)
    }

    async fn fetch_steps(&self, session: &str) -> Result<Vec<Step>> {
        let url = format!("{}/api/get_steps/{}", self.base_url, session);
        let body = self.get_text(&url).await?;
        parse_steps(&body)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?
            .text()
            .await
            .with_context(|| format!("failed to read body from {url}"))
    }
}
