#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Status and report bus for stampfile writers.
//!
//! The bus provides a typed event enum, sequential identifiers, and replay of
//! recent events for late subscribers. Internally it uses `tokio::broadcast`
//! with a bounded buffer; when the channel overflows, the oldest events are
//! dropped. Publishing never blocks and never fails the writer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};
use uuid::Uuid;

/// Identifier assigned to each published event.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Category of a request-level failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No directory could be resolved for the request.
    MissingDirectory,
    /// The target directory could not be created.
    CreateDirectory,
    /// The output stream could not be opened.
    Open,
    /// Writing the payload failed.
    Write,
}

impl FailureKind {
    /// Machine-friendly label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingDirectory => "missing_directory",
            Self::CreateDirectory => "create_directory",
            Self::Open => "open",
            Self::Write => "write",
        }
    }
}

/// Events surfaced by a writer instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A payload was persisted.
    FileWritten {
        /// Request that produced the write.
        request_id: Uuid,
        /// Path relative to the base directory.
        shortname: String,
        /// Absolute path of the file.
        fullname: String,
        /// Number of bytes written.
        bytes: u64,
    },
    /// A request was abandoned.
    WriteFailed {
        /// Request that failed.
        request_id: Uuid,
        /// Failure category.
        kind: FailureKind,
        /// Human-readable report including the underlying cause.
        message: String,
    },
    /// Display status changed; `None` clears it.
    StatusChanged {
        /// Status text, usually the latest generated file name.
        text: Option<String>,
    },
    /// The writer hit an unexpected fault and reset its queue.
    WriterFault {
        /// Description of the fault.
        message: String,
    },
    /// The writer finished shutting down.
    WriterClosed,
}

impl Event {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FileWritten { .. } => "file_written",
            Self::WriteFailed { .. } => "write_failed",
            Self::StatusChanged { .. } => "status_changed",
            Self::WriterFault { .. } => "writer_fault",
            Self::WriterClosed => "writer_closed",
        }
    }
}

/// Event plus its identifier and emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a bus with the provided broadcast and replay capacity.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default replay buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish an event, assigning it the next sequential identifier.
    ///
    /// Delivery to zero subscribers is not an error.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let receiver = self.sender.subscribe();
        let backlog = since_id.map_or_else(VecDeque::new, |since| {
            self.lock_buffer()
                .iter()
                .filter(|item| item.id > since)
                .cloned()
                .collect()
        });
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_buffer().back().map(|event| event.id)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream that yields events from the replay backlog, then the live channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    ///
    /// Lagged receivers skip to the oldest retained event.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(index: usize) -> Event {
        Event::StatusChanged {
            text: Some(format!("file-{index}.txt")),
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(status(i));
        }
        assert_eq!(last_id, 5);
        assert_eq!(bus.last_event_id(), Some(5));

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event.id);
            }
        }
        assert_eq!(received, vec![3, 4, 5]);
    }

    #[test]
    fn failure_labels_match_wire_names() -> Result<(), serde_json::Error> {
        for kind in [
            FailureKind::MissingDirectory,
            FailureKind::CreateDirectory,
            FailureKind::Open,
            FailureKind::Write,
        ] {
            assert_eq!(serde_json::to_value(kind)?, kind.as_str());
        }
        Ok(())
    }

    #[test]
    fn replay_ring_drops_oldest() {
        let bus = EventBus::with_capacity(2);
        for i in 0..4 {
            let _ = bus.publish(status(i));
        }
        let stream = bus.subscribe(Some(0));
        let ids: Vec<_> = stream.backlog.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn events_serialise_with_type_tag() -> Result<(), serde_json::Error> {
        let event = Event::WriteFailed {
            request_id: Uuid::nil(),
            kind: FailureKind::CreateDirectory,
            message: "boom".to_string(),
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], "write_failed");
        assert_eq!(value["kind"], "create_directory");
        assert_eq!(event.kind(), "write_failed");
        assert_eq!(Event::WriterClosed.kind(), "writer_closed");
        Ok(())
    }
}
