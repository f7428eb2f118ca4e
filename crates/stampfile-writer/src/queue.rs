#![allow(clippy::redundant_pub_crate)]

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::WriterResult;
use crate::model::{WriteOutcome, WriteRequest};

pub(crate) type Completion = oneshot::Sender<WriterResult<WriteOutcome>>;

/// A request waiting in the queue together with its completion.
#[derive(Debug)]
pub(crate) struct QueuedWrite {
    pub(crate) request: Arc<WriteRequest>,
    respond_to: Option<Completion>,
}

impl QueuedWrite {
    pub(crate) fn new(request: WriteRequest, respond_to: Option<Completion>) -> Self {
        Self {
            request: Arc::new(request),
            respond_to,
        }
    }

    /// Run the completion. Callers that stopped waiting are ignored.
    pub(crate) fn complete(self, result: WriterResult<WriteOutcome>) {
        if let Some(respond_to) = self.respond_to {
            let _ = respond_to.send(result);
        }
    }
}

/// Pending writes in arrival order. The head is the request being serviced.
#[derive(Debug, Default)]
pub(crate) struct RequestQueue {
    pending: VecDeque<QueuedWrite>,
}

impl RequestQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append to the tail; `true` when the queue was empty beforehand.
    pub(crate) fn enqueue(&mut self, write: QueuedWrite) -> bool {
        let was_empty = self.pending.is_empty();
        self.pending.push_back(write);
        was_empty
    }

    pub(crate) fn head(&self) -> Option<&QueuedWrite> {
        self.pending.front()
    }

    /// Remove the completed head, run its completion with `result`, and return
    /// the next head.
    pub(crate) fn advance(&mut self, result: WriterResult<WriteOutcome>) -> Option<&QueuedWrite> {
        if let Some(done) = self.pending.pop_front() {
            done.complete(result);
        }
        self.pending.front()
    }

    /// Empty the queue, handing back everything still pending.
    pub(crate) fn reset(&mut self) -> Vec<QueuedWrite> {
        self.pending.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
