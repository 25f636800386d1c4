pub mod http;

use serde::Serialize;

use crate::models::ErrorType;

pub use http::HttpTelemetrySink;

/// Tracking events shipped to the log server. The `type` tag selects the payload shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    ServiceStatus {
        status: String,
    },
    Snapshot {
        #[serde(rename = "package")]
        package_name: String,
        view_count: usize,
        text_count: usize,
    },
    StepCheck {
        step_number: usize,
        total_steps: usize,
        step_name: String,
        expected_package: String,
        current_package: String,
    },
    StepMatched {
        step_number: usize,
        step_name: String,
    },
    Error {
        step_number: usize,
        error_type: ErrorType,
    },
    AllCompleted {},
}

impl TelemetryEvent {
    pub fn status(status: impl Into<String>) -> Self {
        TelemetryEvent::ServiceStatus {
            status: status.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryEvent::ServiceStatus { .. } => "service_status",
            TelemetryEvent::Snapshot { .. } => "snapshot",
            TelemetryEvent::StepCheck { .. } => "step_check",
            TelemetryEvent::StepMatched { .. } => "step_matched",
            TelemetryEvent::Error { .. } => "error",
            TelemetryEvent::AllCompleted {} => "all_completed",
        }
    }
}

/// Fire-and-forget telemetry. Implementations must not block and must swallow their own
/// failures.
pub trait TelemetrySink: Send + Sync {
    fn send(&self, event: TelemetryEvent);
}

/// Writes telemetry to the log instead of the network.
#[derive(Debug, Default, Clone)]
pub struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn send(&self, event: TelemetryEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!("[telemetry] {json}"),
            Err(err) => log::warn!("[telemetry] failed to encode {}: {err}", event.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payloads_carry_type_tag_and_wire_names() {
        let snapshot = TelemetryEvent::Snapshot {
            package_name: "com.a".into(),
            view_count: 4,
            text_count: 2,
        };
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"type": "snapshot", "package": "com.a", "view_count": 4, "text_count": 2})
        );

        let error = TelemetryEvent::Error {
            step_number: 2,
            error_type: ErrorType::WrongApp,
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"type": "error", "step_number": 2, "error_type": "WRONG_APP"})
        );

        assert_eq!(
            serde_json::to_value(TelemetryEvent::AllCompleted {}).unwrap(),
            json!({"type": "all_completed"})
        );
    }

    #[test]
    fn step_check_shape() {
        let event = TelemetryEvent::StepCheck {
            step_number: 1,
            total_steps: 3,
            step_name: "Open".into(),
            expected_package: "com.a".into(),
            current_package: "com.b".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "step_check");
        assert_eq!(value["total_steps"], 3);
        assert_eq!(value["current_package"], "com.b");
        assert_eq!(event.kind(), "step_check");
    }
}
