//! Newline-delimited-JSON vocabulary for the LFS custom-transfer-agent
//! protocol (spec §4.1.2). Unlike the VCS side, framing is one JSON object
//! per line and there is no blank-line batch terminator: every request is
//! standalone and the session simply runs until `terminate`.

use serde::{Deserialize, Serialize};

/// The `operation` an `init` request declares for the whole session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Upload,
    Download,
}

/// One request line sent by the LFS subsystem.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum LfsRequest {
    Init {
        operation: Operation,
        remote: String,
    },
    Upload {
        oid: String,
        size: i64,
        path: String,
    },
    Download {
        oid: String,
        size: i64,
    },
    Terminate,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LfsValidationError {
    #[error("oid must not be empty")]
    EmptyOid,
    #[error("size must be greater than zero for an upload")]
    NonPositiveUploadSize,
    #[error("size must not be negative")]
    NegativeSize,
    #[error("path must not be empty")]
    EmptyPath,
}

impl LfsRequest {
    /// Field-level validation beyond what the JSON shape already enforces
    /// (spec §4.1.2: "oid non-empty; size > 0 for upload, size ≥ 0 for
    /// download; path non-empty for upload").
    pub fn validate(&self) -> Result<(), LfsValidationError> {
        match self {
            Self::Init { .. } | Self::Terminate => Ok(()),
            Self::Upload { oid, size, path } => {
                if oid.is_empty() {
                    return Err(LfsValidationError::EmptyOid);
                }
                if *size <= 0 {
                    return Err(LfsValidationError::NonPositiveUploadSize);
                }
                if path.is_empty() {
                    return Err(LfsValidationError::EmptyPath);
                }
                Ok(())
            }
            Self::Download { oid, size } => {
                if oid.is_empty() {
                    return Err(LfsValidationError::EmptyOid);
                }
                if *size < 0 {
                    return Err(LfsValidationError::NegativeSize);
                }
                Ok(())
            }
        }
    }
}

/// `{ "code": 1, "message": "..." }`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LfsError {
    pub code: u32,
    pub message: String,
}

impl LfsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 1,
            message: message.into(),
        }
    }
}

/// Response to `init`: `{}` on success, `{ "error": { ... } }` otherwise.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct InitResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LfsError>,
}

/// `{ "event": "progress", "oid": ..., "bytesSoFar": ..., "bytesSinceLast": ... }`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub event: &'static str,
    pub oid: String,
    pub bytes_so_far: u64,
    pub bytes_since_last: u64,
}

impl ProgressResponse {
    pub fn new(oid: impl Into<String>, bytes_so_far: u64, bytes_since_last: u64) -> Self {
        Self {
            event: "progress",
            oid: oid.into(),
            bytes_so_far,
            bytes_since_last,
        }
    }
}

/// `{ "event": "complete", "oid": ..., "path"?: ..., "error"?: ... }`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CompleteResponse {
    pub event: &'static str,
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LfsError>,
}

impl CompleteResponse {
    pub fn ok(oid: impl Into<String>, path: Option<String>) -> Self {
        Self {
            event: "complete",
            oid: oid.into(),
            path,
            error: None,
        }
    }

    pub fn failed(oid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event: "complete",
            oid: oid.into(),
            path: None,
            error: Some(LfsError::new(message)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn init_request_decodes() {
        let json = r#"{"event":"init","operation":"upload","remote":"oci://reg/x:y"}"#;
        let req: LfsRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req,
            LfsRequest::Init {
                operation: Operation::Upload,
                remote: "oci://reg/x:y".into()
            }
        );
    }

    #[test]
    fn terminate_decodes() {
        let req: LfsRequest = serde_json::from_str(r#"{"event":"terminate"}"#).unwrap();
        assert_eq!(req, LfsRequest::Terminate);
    }

    #[test]
    fn upload_validation_rejects_zero_size() {
        let req = LfsRequest::Upload {
            oid: "abc".into(),
            size: 0,
            path: "/tmp/f".into(),
        };
        assert_eq!(req.validate(), Err(LfsValidationError::NonPositiveUploadSize));
    }

    #[test]
    fn download_validation_allows_zero_size() {
        let req = LfsRequest::Download {
            oid: "abc".into(),
            size: 0,
        };
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn init_response_success_serializes_to_empty_object() {
        let resp = InitResponse::default();
        assert_eq!(serde_json::to_string(&resp).unwrap(), "{}");
    }

    #[test]
    fn init_response_error_serializes_with_code() {
        let resp = InitResponse {
            error: Some(LfsError::new("boom")),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"error":{"code":1,"message":"boom"}}"#);
    }

    #[test]
    fn progress_and_complete_field_names_match_wire_format() {
        let progress = ProgressResponse::new("abc", 10, 5);
        let json = serde_json::to_string(&progress).unwrap();
        assert!(json.contains("\"bytesSoFar\":10"));
        assert!(json.contains("\"bytesSinceLast\":5"));

        let complete = CompleteResponse::ok("abc", Some("/tmp/out".into()));
        let json = serde_json::to_string(&complete).unwrap();
        assert!(json.contains("\"path\":\"/tmp/out\""));
    }
}
