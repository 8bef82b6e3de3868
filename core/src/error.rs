//! Error types for the resource client.
//!
//! # Design
//! `ApiError` is what every operation resolves to on failure. Non-2xx
//! responses land in `Http` with the raw status and body. Only a failed store
//! call is promoted to a `RequestError`, which carries the server's display
//! message and is announced on the event bus for whatever UI listens there.

use std::fmt;

use serde::Deserialize;

use crate::events::{BusEvent, EventBus};

/// Errors returned by `Resource` operations and the injected services.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A response body was not the expected JSON shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("unknown route: {0}")]
    UnknownRoute(String),

    #[error("route {route} requires parameter `{param}`")]
    MissingRouteParam { route: String, param: String },

    /// A failed response whose body carries no `message` string.
    #[error("HTTP {status} without an error message: {body}")]
    UnrecognizedErrorBody { status: u16, body: String },

    /// A failed store call, already logged and published.
    #[error(transparent)]
    Request(Box<RequestError>),

    /// A debounced read cancelled by a later read of the same kind.
    #[error("superseded by a later request")]
    Superseded,
}

impl ApiError {
    /// The HTTP status behind this error, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::UnrecognizedErrorBody { status, .. } => Some(*status),
            ApiError::Request(inner) => inner.error().status(),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// A failed request turned into something a user can be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    message: String,
    error: ApiError,
}

impl RequestError {
    /// Extract the display message from `error`, log it, and publish the
    /// original error on `bus` under [`crate::events::REQUEST_ERROR`].
    ///
    /// The body must be a JSON object with a string `message`. Anything else
    /// yields `UnrecognizedErrorBody` and nothing is published; errors that
    /// never reached the server are handed back unchanged.
    pub fn new(error: ApiError, bus: &EventBus) -> Result<Self, ApiError> {
        let message = match Self::extract_message(&error) {
            Ok(message) => message,
            Err(unrecognized) => {
                tracing::error!(%error, "request failed without a displayable message");
                return Err(unrecognized);
            }
        };
        tracing::error!(%error, %message, "request failed");
        bus.publish(BusEvent::RequestError(error.clone()));
        Ok(Self { message, error })
    }

    fn extract_message(error: &ApiError) -> Result<String, ApiError> {
        match error {
            ApiError::Http { status, body } => serde_json::from_str::<ErrorBody>(body)
                .map(|parsed| parsed.message)
                .map_err(|_| ApiError::UnrecognizedErrorBody {
                    status: *status,
                    body: body.clone(),
                }),
            other => Err(other.clone()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The failure this error was built from.
    pub fn error(&self) -> &ApiError {
        &self.error
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::Request(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> ApiError {
        ApiError::Http {
            status: 404,
            body: r#"{"message":"Not found"}"#.to_string(),
        }
    }

    #[tokio::test]
    async fn message_is_extracted_and_error_published() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();

        let err = RequestError::new(not_found(), &bus).unwrap();
        assert_eq!(err.to_string(), "Not found");
        assert_eq!(err.message(), "Not found");

        let event = events.recv().await.unwrap();
        assert_eq!(event.name(), crate::events::REQUEST_ERROR);
        assert_eq!(event, BusEvent::RequestError(not_found()));
        assert!(events.try_recv().is_err(), "exactly one event expected");
    }

    #[test]
    fn missing_message_is_a_distinct_error() {
        let bus = EventBus::default();
        let mut events = bus.subscribe();
        let err = RequestError::new(
            ApiError::Http {
                status: 500,
                body: "<html>oops</html>".to_string(),
            },
            &bus,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::UnrecognizedErrorBody { status: 500, .. }));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn non_string_message_is_rejected() {
        let bus = EventBus::default();
        let err = RequestError::new(
            ApiError::Http {
                status: 422,
                body: r#"{"message":42}"#.to_string(),
            },
            &bus,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::UnrecognizedErrorBody { status: 422, .. }));
    }

    #[test]
    fn transport_failures_are_returned_unchanged() {
        let bus = EventBus::default();
        let original = ApiError::Transport("connection refused".to_string());
        let err = RequestError::new(original.clone(), &bus).unwrap_err();
        assert_eq!(err, original);
    }

    #[test]
    fn wrapped_request_error_keeps_status_and_display() {
        let bus = EventBus::default();
        let wrapped: ApiError = RequestError::new(not_found(), &bus).unwrap().into();
        assert_eq!(wrapped.status(), Some(404));
        assert_eq!(wrapped.to_string(), "Not found");
    }

    #[test]
    #[tracing_test::traced_test]
    fn failure_is_logged() {
        let bus = EventBus::default();
        RequestError::new(not_found(), &bus).unwrap();
        assert!(logs_contain("request failed"));
    }
}
