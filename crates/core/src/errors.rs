use serde_json::{json, Value};
use thiserror::Error;

pub const MISSING_LOCATION_MESSAGE: &str = "At least one location search method is required (hotelIds, aiSearch, placeId, countryCode/cityName, latitude/longitude, or iataCode)";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", MISSING_LOCATION_MESSAGE)]
    MissingLocationSelector,
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("invalid arguments: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField { field: field.into(), reason: reason.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Validation,
    Upstream,
    Transport,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Upstream => "upstream",
            Self::Transport => "transport",
        }
    }
}

/// Failure taxonomy shared by every tool boundary.
///
/// Only [`SearchError::Configuration`] may end a conversation turn; the other
/// classes are turned into result payloads the model can reason about.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
}

impl SearchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration(_) => ErrorClass::Configuration,
            Self::Validation(_) => ErrorClass::Validation,
            Self::Upstream { .. } => ErrorClass::Upstream,
            Self::Transport(_) => ErrorClass::Transport,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Result payload handed back to the model in place of provider data.
    pub fn to_tool_payload(&self) -> Value {
        match self {
            Self::Upstream { status, message } => json!({ "error": message, "status": status }),
            Self::Validation(error) => {
                json!({ "error": error.to_string(), "kind": "invalid_arguments" })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

/// Provider endpoint a failed response came from; each words its errors
/// differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamEndpoint {
    Places,
    Rates,
}

/// Extracts the most specific message from a non-2xx provider body.
///
/// Places prefers a flat `error` string, then `error.message`, then
/// `message`. Rates reads only `error.message` and then `message`. Non-JSON
/// bodies are used verbatim. Empty bodies fall through to `fallback`.
pub fn upstream_message(
    endpoint: UpstreamEndpoint,
    body: &str,
    fallback: impl FnOnce() -> String,
) -> String {
    let parsed = serde_json::from_str::<Value>(body).unwrap_or_else(|_| json!({ "message": body }));

    let nested = parsed.get("error").and_then(|error| error.get("message")).and_then(Value::as_str);
    let flat = parsed.get("error").and_then(Value::as_str);
    let message = parsed.get("message").and_then(Value::as_str);

    let chosen = match endpoint {
        UpstreamEndpoint::Places => flat.or(nested).or(message),
        UpstreamEndpoint::Rates => nested.or(message),
    };
    chosen.filter(|text| !text.trim().is_empty()).map(str::to_string).unwrap_or_else(fallback)
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The hotel service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl SearchError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Validation(error) => {
                InterfaceError::BadRequest { message: error.to_string(), correlation_id }
            }
            Self::Upstream { message, .. } | Self::Transport(message) => {
                InterfaceError::ServiceUnavailable { message, correlation_id }
            }
            Self::Configuration(message) => InterfaceError::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::errors::{
        upstream_message, InterfaceError, SearchError, UpstreamEndpoint, ValidationError,
    };

    #[test]
    fn only_configuration_errors_are_fatal() {
        assert!(SearchError::Configuration("missing key".to_owned()).is_fatal());
        assert!(!SearchError::from(ValidationError::MissingLocationSelector).is_fatal());
        assert!(!SearchError::Upstream { status: 502, message: "bad gateway".to_owned() }
            .is_fatal());
        assert!(!SearchError::Transport("dns failure".to_owned()).is_fatal());
    }

    #[test]
    fn upstream_payload_carries_status() {
        let payload =
            SearchError::Upstream { status: 401, message: "invalid key".to_owned() }
                .to_tool_payload();
        assert_eq!(payload, json!({ "error": "invalid key", "status": 401 }));
    }

    #[test]
    fn missing_selector_payload_uses_provider_wording() {
        let payload = SearchError::from(ValidationError::MissingLocationSelector).to_tool_payload();
        let message = payload["error"].as_str().unwrap_or_default();
        assert!(message.starts_with("At least one location search method is required"));
        assert_eq!(payload["kind"], "invalid_arguments");
    }

    #[test]
    fn rates_message_prefers_nested_error_message() {
        let body = r#"{"error":{"code":4002,"message":"invalid checkin"},"message":"outer"}"#;
        assert_eq!(
            upstream_message(UpstreamEndpoint::Rates, body, || "fallback".to_owned()),
            "invalid checkin"
        );
    }

    #[test]
    fn rates_message_skips_flat_error_string() {
        let body = r#"{"error":"x","message":"y"}"#;
        assert_eq!(upstream_message(UpstreamEndpoint::Rates, body, || "fallback".to_owned()), "y");

        let bare = r#"{"error":"x"}"#;
        assert_eq!(
            upstream_message(UpstreamEndpoint::Rates, bare, || "Request failed with status 400".to_owned()),
            "Request failed with status 400"
        );
    }

    #[test]
    fn places_message_accepts_flat_error_string() {
        let body = r#"{"error":"textQuery is required","message":"outer"}"#;
        assert_eq!(
            upstream_message(UpstreamEndpoint::Places, body, || "fallback".to_owned()),
            "textQuery is required"
        );
    }

    #[test]
    fn upstream_message_uses_raw_text_for_non_json_bodies() {
        assert_eq!(
            upstream_message(UpstreamEndpoint::Places, "Gateway Timeout", || "fallback".to_owned()),
            "Gateway Timeout"
        );
    }

    #[test]
    fn upstream_message_falls_back_on_empty_body() {
        assert_eq!(
            upstream_message(UpstreamEndpoint::Rates, "", || "Request failed with status 503".to_owned()),
            "Request failed with status 503"
        );
    }

    #[test]
    fn transport_error_maps_to_service_unavailable() {
        let interface = SearchError::Transport("connection reset".to_owned()).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
        assert_eq!(
            interface.user_message(),
            "The hotel service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            SearchError::Configuration("provider api key".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
