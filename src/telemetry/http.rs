use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, warn};

use super::{TelemetryEvent, TelemetrySink};

const LOG_PATH: &str = "/api/log_tracking";

/// POSTs each event to `{server}/api/log_tracking` on a spawned task.
///
/// Requires a running tokio runtime; outside one, events are dropped with a warning.
#[derive(Clone)]
pub struct HttpTelemetrySink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTelemetrySink {
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), LOG_PATH),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(client: reqwest::Client, endpoint: String, event: TelemetryEvent) -> Result<()> {
        let response = client
            .post(&endpoint)
            .json(&event)
            .send()
            .await
            .with_context(|| format!("failed to send {} telemetry", event.kind()))?;

        let status = response.status();
        if !status.is_success() {
            bail!("telemetry server answered {status} for {}", event.kind());
        }
        Ok(())
    }
}

impl TelemetrySink for HttpTelemetrySink {
    fn send(&self, event: TelemetryEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("[telemetry] no runtime; dropping {} event", event.kind());
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        runtime.spawn(async move {
            let kind = event.kind();
            match Self::post(client, endpoint, event).await {
                Ok(()) => debug!("[telemetry] sent {kind}"),
                // The log server is often simply not running.
                Err(err) => debug!("[telemetry] {err:#}"),
            }
        });
    }
}
