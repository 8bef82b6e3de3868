//! HTTP transport types and the client seam.
//!
//! # Design
//! Requests and responses are plain data. `Resource` builds an `HttpRequest`
//! and hands it to whatever `HttpClient` was injected; the client only moves
//! bytes. Non-2xx statuses come back as ordinary `HttpResponse` values so
//! status interpretation stays in one place (`HttpResponse::into_json`).

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Build a JSON request. Every request asks for JSON back; requests with
    /// a body also declare a JSON content type.
    pub fn json(method: HttpMethod, path: String, body: Option<&Value>) -> Result<Self, ApiError> {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        let body = match body {
            Some(value) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))?)
            }
            None => None,
        };
        Ok(Self {
            method,
            path,
            headers,
            body,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Interpret the response: 2xx bodies are parsed as JSON (an empty body
    /// is `null`), anything else becomes `ApiError::Http`.
    pub fn into_json(self) -> Result<Value, ApiError> {
        if !self.is_success() {
            return Err(ApiError::Http {
                status: self.status,
                body: self.body,
            });
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Executes `HttpRequest`s against the network (or a stand-in for it).
///
/// Implementations return `Err` only when no response was received at all.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}
