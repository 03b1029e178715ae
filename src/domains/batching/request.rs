use super::params::GenerationParams;
use crate::common::{BatchError, BatchResult};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Write side of a request's result. Resolving consumes the slot, so a
/// request can be resolved at most once.
#[derive(Debug)]
pub struct ResultSlot {
    tx: oneshot::Sender<BatchResult<String>>,
}

impl ResultSlot {
    pub fn resolve(self, result: BatchResult<String>) {
        // The caller may have stopped waiting; nothing to deliver to then.
        let _ = self.tx.send(result);
    }

    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Read side of a request's result, returned by `BatchEngine::enqueue`.
///
/// If the engine drops the request without resolving it the handle yields
/// `BatchError::Cancelled`.
#[derive(Debug)]
pub struct ResultHandle {
    request_id: Uuid,
    rx: oneshot::Receiver<BatchResult<String>>,
}

impl ResultHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub async fn wait(self) -> BatchResult<String> {
        self.rx.await.unwrap_or(Err(BatchError::Cancelled))
    }

    /// Non-blocking poll. `None` while the request is still pending.
    pub fn try_result(&mut self) -> Option<BatchResult<String>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(BatchError::Cancelled)),
        }
    }
}

impl IntoFuture for ResultHandle {
    type Output = BatchResult<String>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

/// A prompt waiting in an engine queue together with its result slot.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: Uuid,
    pub content: String,
    pub params: GenerationParams,
    pub enqueued_at: Instant,
    pub slot: ResultSlot,
}

impl PendingRequest {
    pub fn new(content: String, params: GenerationParams) -> (Self, ResultHandle) {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let request = Self {
            id,
            content,
            params,
            enqueued_at: Instant::now(),
            slot: ResultSlot { tx },
        };
        (request, ResultHandle { request_id: id, rx })
    }
}
