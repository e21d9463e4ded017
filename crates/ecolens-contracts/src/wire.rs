use serde::Deserialize;
use serde_json::Value;

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// The response shapes accepted from the analysis service.
///
/// `{"html": "..."}` is the success path and `{"error": "..."}` the
/// application-error path. Anything else is folded into
/// `Error("Unknown error")` here so no untyped JSON travels further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisPayload {
    Content(String),
    Error(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysisResponse {
    #[serde(default)]
    html: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl AnalysisPayload {
    pub fn unknown() -> Self {
        Self::Error(UNKNOWN_ERROR_MESSAGE.to_string())
    }

    /// Content wins over error when both are present.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::unknown();
        }
        let raw: RawAnalysisResponse =
            serde_json::from_value(value.clone()).unwrap_or_default();
        if let Some(Value::String(html)) = raw.html {
            return Self::Content(html);
        }
        match raw.error {
            Some(Value::String(message)) if !message.trim().is_empty() => Self::Error(message),
            _ => Self::unknown(),
        }
    }

    pub fn from_json_str(body: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_value(&value))
    }

    /// Returns `None` when the body is JSON but not one of the two shapes.
    pub fn recognize(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let has_html = object.get("html").map(Value::is_string).unwrap_or(false);
        let has_error = object.get("error").map(Value::is_string).unwrap_or(false);
        if has_html || has_error {
            Some(Self::from_value(value))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::AnalysisPayload;

    #[test]
    fn html_field_is_content() {
        let payload = AnalysisPayload::from_value(&json!({"html": "<p>x</p>"}));
        assert_eq!(payload, AnalysisPayload::Content("<p>x</p>".to_string()));
    }

    #[test]
    fn empty_html_is_still_content() {
        let payload = AnalysisPayload::from_value(&json!({"html": ""}));
        assert_eq!(payload, AnalysisPayload::Content(String::new()));
    }

    #[test]
    fn error_field_is_application_error() {
        let payload = AnalysisPayload::from_value(&json!({"error": "bad image"}));
        assert_eq!(payload, AnalysisPayload::Error("bad image".to_string()));
    }

    #[test]
    fn missing_fields_become_unknown_error() {
        let payload = AnalysisPayload::from_value(&json!({"raw": {"candidates": []}}));
        assert_eq!(payload, AnalysisPayload::Error("Unknown error".to_string()));
        assert_eq!(
            AnalysisPayload::from_value(&json!(["html"])),
            AnalysisPayload::unknown()
        );
    }

    #[test]
    fn non_string_html_falls_back_to_error_field() {
        let payload = AnalysisPayload::from_value(&json!({"html": 42, "error": "parse failed"}));
        assert_eq!(payload, AnalysisPayload::Error("parse failed".to_string()));
    }

    #[test]
    fn content_takes_precedence_over_error() {
        let payload = AnalysisPayload::from_value(&json!({"html": "ok", "error": "ignored"}));
        assert_eq!(payload, AnalysisPayload::Content("ok".to_string()));
    }

    #[test]
    fn recognize_rejects_foreign_shapes() {
        assert_eq!(AnalysisPayload::recognize(&json!({"detail": "Not Found"})), None);
        assert_eq!(
            AnalysisPayload::recognize(&json!({"error": "quota"})),
            Some(AnalysisPayload::Error("quota".to_string()))
        );
    }

    #[test]
    fn from_json_str_rejects_invalid_json() {
        assert!(AnalysisPayload::from_json_str("not json").is_err());
    }
}
