use serde::{Deserialize, Serialize};

use super::{KeyView, Step, StepExpectation, StepId};

const MAX_KEY_VIEWS: usize = 3;
const UNKNOWN_STEP_NAME: &str = "Unknown Step";

/// A step as recorded by the demonstration server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub step: StepId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub event_type: Option<i64>,
    #[serde(default, rename = "package")]
    pub package_name: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content_description: Option<String>,
    #[serde(default)]
    pub view_id: Option<String>,
    #[serde(default)]
    pub bounds: Option<String>,
}

impl RawStep {
    pub fn into_step(self) -> Step {
        let mut key_views = self.candidate_key_views();

        if key_views.is_empty() {
            if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
                key_views.push(KeyView::with_text(title));
            }
        }

        Step {
            step_id: self.step,
            step_name: self
                .title
                .clone()
                .unwrap_or_else(|| UNKNOWN_STEP_NAME.to_string()),
            expectation: StepExpectation {
                expected_package: self.package_name.clone().unwrap_or_default(),
                expected_activity: self.class_name.clone().filter(|c| c != "null"),
                expected_key_views: key_views,
            },
        }
    }

    fn candidate_key_views(&self) -> Vec<KeyView> {
        let mut key_views = Vec::with_capacity(MAX_KEY_VIEWS);

        if let Some(desc) = meaningful(self.content_description.as_deref()) {
            key_views.push(KeyView::with_text(desc));
        }

        // Recorded text arrives as a list literal, e.g. "[One UI Home]".
        if let Some(text) = meaningful(self.text.as_deref()).filter(|t| *t != "[]") {
            let cleaned: String = text.chars().filter(|c| *c != '[' && *c != ']').collect();
            if !cleaned.is_empty() {
                key_views.push(KeyView::with_text(cleaned));
            }
        }

        if let Some(view_id) = meaningful(self.view_id.as_deref()) {
            key_views.push(KeyView::with_id(view_id));
        }

        key_views.truncate(MAX_KEY_VIEWS);
        key_views
    }
}

fn meaningful(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(step: StepId) -> RawStep {
        RawStep {
            step,
            title: Some("Tap Home".into()),
            package_name: Some("com.sec.android.app.launcher".into()),
            class_name: Some("android.widget.FrameLayout".into()),
            ..Default::default()
        }
    }

    #[test]
    fn collects_description_text_and_view_id_in_order() {
        let mut r = raw(3);
        r.content_description = Some("Home".into());
        r.text = Some("[One UI Home]".into());
        r.view_id = Some("com.app:id/home".into());

        let step = r.into_step();
        assert_eq!(step.step_id, 3);
        assert_eq!(
            step.key_views(),
            &[
                KeyView::with_text("Home"),
                KeyView::with_text("One UI Home"),
                KeyView::with_id("com.app:id/home"),
            ]
        );
        assert_eq!(
            step.expectation.expected_activity.as_deref(),
            Some("android.widget.FrameLayout")
        );
    }

    #[test]
    fn skips_null_literals_and_empty_lists() {
        let mut r = raw(1);
        r.content_description = Some("null".into());
        r.text = Some("[]".into());
        r.view_id = Some("null".into());
        r.class_name = Some("null".into());

        let step = r.into_step();
        assert_eq!(step.key_views(), &[KeyView::with_text("Tap Home")]);
        assert_eq!(step.expectation.expected_activity, None);
    }

    #[test]
    fn missing_title_and_package_fall_back() {
        let json = r#"{"step": 9, "viewId": "go"}"#;
        let step = serde_json::from_str::<RawStep>(json).unwrap().into_step();
        assert_eq!(step.step_name, "Unknown Step");
        assert_eq!(step.expected_package(), "");
        assert_eq!(step.key_views(), &[KeyView::with_id("go")]);
    }

    #[test]
    fn parses_wire_field_names() {
        let json = r#"{
            "step": 2, "title": "Open", "description": "d", "time": 1700000000,
            "eventType": 1, "package": "com.a", "className": "X",
            "text": "[Go]", "contentDescription": "", "viewId": "", "bounds": "[0,0][1,1]"
        }"#;
        let step = serde_json::from_str::<RawStep>(json).unwrap().into_step();
        assert_eq!(step.expected_package(), "com.a");
        assert_eq!(step.key_views(), &[KeyView::with_text("Go")]);
    }
}
