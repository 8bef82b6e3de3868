//! In-memory `HttpClient` for tests.
//!
//! `MockHttpClient` records every request it is asked to execute and answers
//! from a queue of scripted replies, falling back to a fixed reply (or a
//! transport error) once the queue is empty. Clones share the same script and
//! log, so a test can keep one handle while the resource owns another.
//!
//! ```
//! use resource_core::mock::MockHttpClient;
//! use resource_core::{EventBus, Params, Resource, ResourceOptions, RouteTable, Services};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let http = MockHttpClient::new();
//! http.reply(200, json!({"data": [{"id": 1}], "meta": {"total": 1}}));
//!
//! let routes = RouteTable::new("http://api.test").unwrap().resource("users");
//! let users = Resource::new(
//!     Services::new(http.clone(), routes, EventBus::default()),
//!     ResourceOptions::new("users"),
//! );
//!
//! users.fetch_all(Params::new(), None).await.unwrap();
//! assert_eq!(users.data(), vec![json!({"id": 1})]);
//! assert_eq!(http.requests()[0].request.path, "http://api.test/users");
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};

/// A request as the mock saw it, with the (tokio) time it arrived.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: HttpRequest,
    pub at: Instant,
}

impl RecordedRequest {
    /// The request body parsed as JSON.
    pub fn json(&self) -> Option<Value> {
        self.request.body.as_deref().and_then(|body| serde_json::from_str(body).ok())
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<HttpResponse, ApiError>>,
    fallback: Option<HttpResponse>,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    script: Arc<Mutex<Script>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON reply.
    pub fn reply(&self, status: u16, body: Value) -> &Self {
        self.reply_raw(status, &body.to_string())
    }

    /// Queue a reply with a verbatim body.
    pub fn reply_raw(&self, status: u16, body: &str) -> &Self {
        self.script.lock().replies.push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport failure.
    pub fn fail(&self, error: ApiError) -> &Self {
        self.script.lock().replies.push_back(Err(error));
        self
    }

    /// Reply used whenever the queue is empty.
    pub fn fallback(&self, status: u16, body: Value) -> &Self {
        self.script.lock().fallback = Some(HttpResponse::new(status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().requests.len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut script = self.script.lock();
        let description = format!("{} {}", request.method, request.path);
        script.requests.push(RecordedRequest {
            request,
            at: Instant::now(),
        });
        match script.replies.pop_front() {
            Some(reply) => reply,
            None => script
                .fallback
                .clone()
                .ok_or_else(|| ApiError::Transport(format!("no reply scripted for {description}"))),
        }
    }
}
