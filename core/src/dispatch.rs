//! Completion handle for a scheduled operation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::ApiError;

/// Resolves to the response body once the operation finishes.
///
/// The operation runs whether or not this is awaited; dropping it only
/// discards the outcome. A debounced read that a later read cancelled
/// resolves to `ApiError::Superseded`.
#[derive(Debug)]
pub struct Dispatch {
    receiver: oneshot::Receiver<Result<Value, ApiError>>,
}

impl Dispatch {
    pub(crate) fn channel() -> (oneshot::Sender<Result<Value, ApiError>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// Run `operation` as its own task.
    pub(crate) fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        let (sender, dispatch) = Self::channel();
        tokio::spawn(async move {
            let _ = sender.send(operation.await);
        });
        dispatch
    }
}

impl Future for Dispatch {
    type Output = Result<Value, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ApiError::Superseded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn resolves_to_operation_result() {
        let result = Dispatch::spawn(async { Ok(json!({"ok": true})) }).await;
        assert_eq!(result.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn dropped_sender_means_superseded() {
        let (sender, dispatch) = Dispatch::channel();
        drop(sender);
        assert_eq!(dispatch.await.unwrap_err(), ApiError::Superseded);
    }
}
