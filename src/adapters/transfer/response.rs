//! Classification of provider HTTP responses
//!
//! Connectors turn a raw response into one of a small fixed set of
//! outcomes. Two are recoverable (everything fine, or the access token
//! needs a refresh); the rest map onto [`ProviderError`] and end the job.

use crate::domain::{PortaError, ProviderError, Result};

const ACCESS_DENIED: &str = "Access Denied";
const INSUFFICIENT_SPACE: &str = "Insufficient Space Available";

/// How a response should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx
    Okay,
    /// 401; refresh the token and retry
    NeedsTokenRefresh,
    /// 403 whose status message says access was denied
    PermissionDenied,
    /// 507 whose body reports insufficient space
    DestinationFull,
    /// Anything else
    Unspecified,
}

impl ResponseClass {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ResponseClass::Okay | ResponseClass::NeedsTokenRefresh)
    }
}

/// The parts of an HTTP response classification looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    /// Status message (reason phrase)
    pub message: String,
    pub body: Option<String>,
}

impl ProviderResponse {
    pub fn new(status: u16, message: impl Into<String>, body: Option<String>) -> Self {
        Self {
            status,
            message: message.into(),
            body,
        }
    }

    /// Reads status, reason phrase and body from a reqwest response
    pub async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let message = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await?;
        Ok(Self {
            status: status.as_u16(),
            message,
            body: (!body.is_empty()).then_some(body),
        })
    }

    fn body_contains(&self, needle: &str) -> bool {
        self.body.as_deref().is_some_and(|body| body.contains(needle))
    }

    pub fn classify(&self) -> ResponseClass {
        match self.status {
            200..=299 => ResponseClass::Okay,
            401 => ResponseClass::NeedsTokenRefresh,
            403 if self.message.contains(ACCESS_DENIED) => ResponseClass::PermissionDenied,
            507 if self.body_contains(INSUFFICIENT_SPACE) => ResponseClass::DestinationFull,
            _ => ResponseClass::Unspecified,
        }
    }

    fn describe(&self, context: &str) -> String {
        format!(
            "{context}: HTTP {} {} {}",
            self.status,
            self.message,
            self.body.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string()
    }

    /// Turns a non-okay response into an error
    ///
    /// With `transient_as_io`, unspecified 5xx and 429 responses become
    /// retryable `PortaError::Io` instead of a fatal provider error.
    pub fn error_for_status(&self, context: &str, transient_as_io: bool) -> Result<()> {
        let class = self.classify();
        let description = self.describe(context);
        match class {
            ResponseClass::Okay => Ok(()),
            ResponseClass::NeedsTokenRefresh => {
                Err(ProviderError::TokenRefreshRequired(description).into())
            }
            ResponseClass::PermissionDenied => {
                Err(ProviderError::PermissionDenied(description).into())
            }
            ResponseClass::DestinationFull => {
                Err(ProviderError::DestinationFull(description).into())
            }
            ResponseClass::Unspecified
                if transient_as_io && (self.status >= 500 || self.status == 429) =>
            {
                Err(PortaError::Io(description))
            }
            ResponseClass::Unspecified => Err(ProviderError::Unspecified {
                status: self.status,
                message: description,
            }
            .into()),
        }
    }

    /// Extracts a top-level string field from a JSON body
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Serialization` if the body is missing, not JSON,
    /// or lacks a non-empty string under `key`.
    pub fn json_value(&self, key: &str) -> Result<String> {
        let body = self
            .body
            .as_deref()
            .ok_or_else(|| PortaError::Serialization("response body unexpectedly empty".to_string()))?;
        let json: serde_json::Value = serde_json::from_str(body)?;
        match json.get(key).and_then(|v| v.as_str()) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(PortaError::Serialization(format!(
                "response body missing top-level field \"{key}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(200, "OK", None => ResponseClass::Okay; "ok")]
    #[test_case(204, "No Content", None => ResponseClass::Okay; "no content")]
    #[test_case(401, "Unauthorized", None => ResponseClass::NeedsTokenRefresh; "token refresh")]
    #[test_case(403, "Access Denied", None => ResponseClass::PermissionDenied; "access denied")]
    #[test_case(403, "Forbidden", None => ResponseClass::Unspecified; "forbidden without marker")]
    #[test_case(507, "Insufficient Storage", Some("{\"message\":\"Insufficient Space Available\"}") => ResponseClass::DestinationFull; "destination full")]
    #[test_case(507, "Insufficient Storage", None => ResponseClass::Unspecified; "507 without body")]
    #[test_case(500, "Internal Server Error", None => ResponseClass::Unspecified; "server error")]
    fn test_classify(status: u16, message: &str, body: Option<&str>) -> ResponseClass {
        ProviderResponse::new(status, message, body.map(str::to_string)).classify()
    }

    #[test]
    fn test_error_for_status_fatal_taxonomy() {
        let denied = ProviderResponse::new(403, "Access Denied", None)
            .error_for_status("upload", true)
            .unwrap_err();
        assert!(matches!(
            denied,
            PortaError::Provider(ProviderError::PermissionDenied(_))
        ));
        assert!(!denied.is_recoverable());

        let unknown = ProviderResponse::new(418, "I'm a teapot", None)
            .error_for_status("upload", true)
            .unwrap_err();
        assert!(matches!(
            unknown,
            PortaError::Provider(ProviderError::Unspecified { status: 418, .. })
        ));
    }

    #[test]
    fn test_error_for_status_transient() {
        let io = ProviderResponse::new(503, "Service Unavailable", None)
            .error_for_status("upload", true)
            .unwrap_err();
        assert!(matches!(io, PortaError::Io(_)));
        assert!(io.is_recoverable());

        let fatal = ProviderResponse::new(503, "Service Unavailable", None)
            .error_for_status("upload", false)
            .unwrap_err();
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn test_token_refresh_is_recoverable() {
        let err = ProviderResponse::new(401, "Unauthorized", None)
            .error_for_status("list albums", false)
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(ProviderResponse::new(201, "Created", None)
            .error_for_status("create", false)
            .is_ok());
    }

    #[test]
    fn test_json_value() {
        let response = ProviderResponse::new(201, "Created", Some(r#"{"id":"abc"}"#.to_string()));
        assert_eq!(response.json_value("id").unwrap(), "abc");
        assert!(response.json_value("missing").is_err());
        assert!(ProviderResponse::new(201, "Created", None).json_value("id").is_err());
    }
}
