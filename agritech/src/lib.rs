pub mod air_quality;
pub mod auth;
mod cache;
pub mod chat;
pub mod climate;
pub mod fallback;
pub mod guard;
pub mod http;
pub mod resource;
pub mod simulate;
pub mod soil;
pub mod types;
pub mod weather;

pub use crate::air_quality::{AirQualityClient, AirQualityFetcher, AirQualityResource};
pub use crate::auth::{
    Auth, AuthEndpoints, AuthState, FileTokenStore, MemoryTokenStore, StoreError, TokenStore,
};
pub use crate::chat::{AdviceClient, ChatState, Chatbot};
pub use crate::climate::{ClimateClient, ClimateResource};
pub use crate::guard::{Access, RouteGuard};
pub use crate::http::{HttpClient, RequestOptions};
pub use crate::resource::{FallbackPolicy, FetchState, Fetcher, Resource, ResourceStatus};
pub use crate::soil::{SoilClient, SoilResource};
pub use crate::weather::{WeatherClient, WeatherResource};

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Broad failure class, stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// No response was received.
    Transport,
    /// The server answered with a non-2xx status.
    Protocol,
    /// The request exceeded its deadline.
    Timeout,
    /// A 2xx payload that signals an error or cannot be decoded.
    Application,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("No response from server: {0}")]
    Transport(String),
    #[error("{message}")]
    Protocol { status: StatusCode, message: String },
    #[error("Request timed out")]
    Timeout,
    #[error("{0}")]
    Application(String),
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Timeout => ErrorKind::Timeout,
            Self::Application(_) => ErrorKind::Application,
        }
    }

    /// HTTP status of a protocol failure.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Builds a protocol error from a non-2xx response body.
    ///
    /// The message comes from a JSON envelope (`{"error": "..."}`,
    /// `{"error": {"message": "..."}}` or `{"message": "..."}`) when one can
    /// be decoded, otherwise from the status code and its reason phrase.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| envelope_message(&value))
            .unwrap_or_else(|| {
                format!(
                    "Error {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                )
            });
        Self::Protocol { status, message }
    }
}

fn envelope_message(value: &Value) -> Option<String> {
    match value.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Object(inner)) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Application(format!("Invalid response body: {err}"))
        } else if err.is_builder() {
            Self::Application(format!("Invalid request: {err}"))
        } else if let Some(status) = err.status() {
            Self::from_status(status, "")
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Application(format!("Invalid response body: {err}"))
    }
}

/// Returns true for keys that are empty or still carry the shipped
/// `your_..._here` placeholder.
#[must_use]
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || (key.starts_with("your_") && key.ends_with("_here"))
}

/// Drops unconfigured keys so providers can fall back to simulated data.
pub(crate) fn configured_key(key: Option<String>) -> Option<String> {
    key.map(|key| key.trim().to_string())
        .filter(|key| !is_placeholder_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_prefers_error_envelope() {
        let err = Error::from_status(StatusCode::BAD_REQUEST, r#"{"error":"bad polygon"}"#);
        assert_eq!(err.to_string(), "bad polygon");
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn protocol_error_reads_nested_and_message_envelopes() {
        let nested = Error::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"rate limited","code":429}}"#,
        );
        assert_eq!(nested.to_string(), "rate limited");

        let flat = Error::from_status(StatusCode::UNAUTHORIZED, r#"{"message":"Identifiants invalides"}"#);
        assert_eq!(flat.to_string(), "Identifiants invalides");
    }

    #[test]
    fn protocol_error_synthesizes_message_without_envelope() {
        let err = Error::from_status(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");
        assert_eq!(err.to_string(), "Error 502: Bad Gateway");
    }

    #[test]
    fn error_kind_serializes_lowercase() {
        let kind = serde_json::to_string(&Error::Timeout.kind()).unwrap();
        assert_eq!(kind, "\"timeout\"");
        assert_eq!(Error::Application("x".into()).status(), None);
    }

    #[test]
    fn placeholder_keys_are_not_configured() {
        assert!(is_placeholder_key(""));
        assert!(is_placeholder_key("   "));
        assert!(is_placeholder_key("your_openweather_api_key_here"));
        assert!(!is_placeholder_key("1707374d07315cd524c6e04d0b0b734b"));
        assert_eq!(configured_key(Some("your_openrouter_key_here".into())), None);
        assert_eq!(configured_key(Some(" abc ".into())), Some("abc".into()));
        assert_eq!(configured_key(None), None);
    }
}
