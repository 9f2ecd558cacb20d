//! Parsing of package manager `--json` output
//!
//! Lifecycle scripts (`prepublish`, `prepack`, ...) print to the same stream
//! as the machine-readable payload, so the payload is located by skipping
//! everything before the first `{`.

use crate::core::error::PublishError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error object reported by npm-compatible tools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryError {
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RegistryError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// Pull the `error` member out of a parsed payload, if any
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let error = payload.get("error")?;
        if error.is_null() {
            return None;
        }
        Some(serde_json::from_value(error.clone()).unwrap_or_default())
    }
}

/// Parse the first JSON object in `output`, skipping any prefix noise.
///
/// Text after the object is ignored. Fails when no `{` exists or the text
/// from the first `{` does not start with a valid JSON value.
pub fn parse_json_output(output: &str, context: &str) -> Result<Value, PublishError> {
    let parse_error = |message: String| PublishError::JsonParse {
        context: context.to_string(),
        message,
        output: output.to_string(),
    };

    let start = output
        .find('{')
        .ok_or_else(|| parse_error("no JSON object found".to_string()))?;

    serde_json::Deserializer::from_str(&output[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| parse_error("no JSON object found".to_string()))?
        .map_err(|e| parse_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let value = parse_json_output(r#"{"published":true}"#, "test").unwrap();
        assert_eq!(value, json!({"published": true}));
    }

    #[test]
    fn test_skips_prefix_noise() {
        let value =
            parse_json_output("prepublish hook ran\n{\"published\":true}", "test").unwrap();
        assert_eq!(value, json!({"published": true}));
    }

    #[test]
    fn test_ignores_trailing_output() {
        let output = "> build\n{\n  \"id\": \"pkg@1.0.0\"\n}\npostpublish done\n";
        let value = parse_json_output(output, "test").unwrap();
        assert_eq!(value["id"], "pkg@1.0.0");
    }

    #[test]
    fn test_no_object_fails() {
        let err = parse_json_output("npm ERR! something broke", "npm publish").unwrap_err();
        assert!(matches!(err, PublishError::JsonParse { .. }));
        assert!(err.to_string().contains("npm publish"));
    }

    #[test]
    fn test_invalid_object_fails() {
        let err = parse_json_output("noise {not json", "npm publish").unwrap_err();
        assert!(matches!(err, PublishError::JsonParse { .. }));
    }

    #[test]
    fn test_registry_error_extraction() {
        let payload = json!({
            "error": {
                "code": "E401",
                "summary": "Unauthorized",
                "detail": "Provide --otp=<code>"
            }
        });
        let error = RegistryError::from_payload(&payload).unwrap();
        assert_eq!(error.code, "E401");
        assert_eq!(error.summary.as_deref(), Some("Unauthorized"));
        assert!(error.detail.unwrap().contains("--otp=<code>"));
    }

    #[test]
    fn test_registry_error_absent() {
        assert!(RegistryError::from_payload(&json!({"name": "pkg"})).is_none());
        assert!(RegistryError::from_payload(&json!({"error": null})).is_none());
    }

    #[test]
    fn test_malformed_error_member_still_counts_as_error() {
        let error = RegistryError::from_payload(&json!({"error": "boom"})).unwrap();
        assert_eq!(error.code, "");
    }
}
