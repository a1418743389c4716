use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::UploadError;

/// Body returned by the upload endpoint. `file_name` only accompanies success.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Decode a response body. The HTTP status is not consulted; error replies
/// carry a `message` too.
pub fn parse_status(body: &str) -> Result<StatusResponse, UploadError> {
    let value: JsonValue =
        serde_json::from_str(body).map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
    let message = value
        .get("message")
        .and_then(JsonValue::as_str)
        .ok_or(UploadError::MissingMessage)?
        .to_string();
    let file_name = value
        .get("file_name")
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    Ok(StatusResponse { message, file_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_extracted_verbatim() {
        let resp = parse_status(r#"{"message": "File found and processed."}"#).unwrap();
        assert_eq!(resp.message, "File found and processed.");
        assert_eq!(resp.file_name, None);
    }

    #[test]
    fn success_body_carries_file_name() {
        let body = r#"{"message": "File \"export/activities.csv\" has been uploaded successfully!!", "file_name": "export/activities.csv"}"#;
        let resp = parse_status(body).unwrap();
        assert_eq!(resp.file_name.as_deref(), Some("export/activities.csv"));
    }

    #[test]
    fn html_body_is_malformed() {
        let err = parse_status("<!doctype html><title>500</title>").unwrap_err();
        assert!(matches!(err, UploadError::MalformedResponse(_)));
    }

    #[test]
    fn non_string_message_is_missing() {
        assert_eq!(parse_status(r#"{"status": "ok"}"#), Err(UploadError::MissingMessage));
        assert_eq!(parse_status(r#"{"message": 42}"#), Err(UploadError::MissingMessage));
        assert_eq!(parse_status("[]"), Err(UploadError::MissingMessage));
    }
}
