//! Public entry points: build a writer, submit requests, close it.
//!
//! # Design
//! - `FileWriter` is a cheap cloneable handle over the writer task's inbox.
//! - Dropping every handle is treated as a shutdown request.
//! - Each submission resolves exactly once, in submission order.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use stampfile_config::WriterConfig;
use stampfile_events::EventBus;
use stampfile_telemetry::Metrics;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::directory::{CreateDirAll, DirectoryCreator};
use crate::error::{WriterError, WriterResult};
use crate::manager::StreamSettings;
use crate::model::{WriteOutcome, WriteRequest, WrittenMessage};
use crate::naming::{NameGenerator, TimestampNames};
use crate::queue::QueuedWrite;
use crate::worker::{self, Command, WorkerParts};

/// Configures and spawns a writer task.
pub struct WriterBuilder {
    config: WriterConfig,
    events: Option<EventBus>,
    metrics: Option<Metrics>,
    names: Option<Arc<dyn NameGenerator>>,
    directories: Option<Arc<dyn DirectoryCreator>>,
}

/// Handles returned by [`WriterBuilder::spawn`].
pub struct WriterHandles {
    /// Submission handle.
    pub writer: FileWriter,
    /// Every emitted message, in write order.
    pub output: mpsc::UnboundedReceiver<WrittenMessage>,
    /// The writer task; it exits once closed and every handle is dropped.
    pub task: JoinHandle<()>,
}

impl WriterBuilder {
    /// Start from `config` with default collaborators.
    #[must_use]
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            events: None,
            metrics: None,
            names: None,
            directories: None,
        }
    }

    /// Publish status and reports on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Record counters in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the timestamp name generator.
    #[must_use]
    pub fn with_name_generator(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = Some(names);
        self
    }

    /// Replace the directory creator.
    #[must_use]
    pub fn with_directory_creator(mut self, directories: Arc<dyn DirectoryCreator>) -> Self {
        self.directories = Some(directories);
        self
    }

    /// Validate the configuration and spawn the writer on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Config`] for invalid configuration,
    /// [`WriterError::MissingRuntime`] outside a tokio runtime, and
    /// [`WriterError::Fault`] if the metrics registry cannot be built.
    pub fn spawn(self) -> WriterResult<WriterHandles> {
        let runtime = Handle::try_current().map_err(|_| WriterError::MissingRuntime)?;
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new().map_err(|err| WriterError::Fault {
                detail: err.to_string(),
            })?,
        };
        let names: Arc<dyn NameGenerator> = match self.names {
            Some(names) => names,
            None => Arc::new(TimestampNames::from_config(&self.config)),
        };
        let directories: Arc<dyn DirectoryCreator> = match self.directories {
            Some(directories) => directories,
            None => Arc::new(CreateDirAll),
        };
        let settings = StreamSettings::new(self.config, names, directories, metrics.clone())?;

        let (commands, inbox) = mpsc::unbounded_channel();
        let (output_tx, output) = mpsc::unbounded_channel();
        let parts = WorkerParts {
            settings,
            events: self.events.unwrap_or_default(),
            metrics,
            output: output_tx,
        };
        let task = worker::spawn(&runtime, parts, inbox);
        Ok(WriterHandles {
            writer: FileWriter { commands },
            output,
            task,
        })
    }
}

/// Cloneable handle for submitting writes to one writer task.
#[derive(Clone)]
pub struct FileWriter {
    commands: mpsc::UnboundedSender<Command>,
}

impl FileWriter {
    /// Queue `request`; the returned future resolves once it has been applied.
    ///
    /// The request is queued immediately, before the future is polled.
    #[must_use = "dropping the pending write discards its result, not the write"]
    pub fn submit(&self, request: WriteRequest) -> PendingWrite {
        let (respond_to, receiver) = oneshot::channel();
        let queued = QueuedWrite::new(request, Some(respond_to));
        if let Err(mpsc::error::SendError(Command::Write(queued))) =
            self.commands.send(Command::Write(queued))
        {
            queued.complete(Err(WriterError::Closed));
        }
        PendingWrite {
            receiver: Some(receiver),
        }
    }

    /// Queue `request` and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Returns the request-level failure, [`WriterError::Closed`] after
    /// shutdown, or a fault raised while the request was queued.
    pub async fn write(&self, request: WriteRequest) -> WriterResult<WriteOutcome> {
        self.submit(request).await
    }

    /// Request shutdown and wait until queued writes drain and the stream is
    /// closed. Safe to call repeatedly.
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown(Some(ack))).is_ok() {
            let _ = done.await;
        }
    }

    /// Whether the writer task has stopped accepting commands.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Outcome of one submitted write.
pub struct PendingWrite {
    receiver: Option<oneshot::Receiver<WriterResult<WriteOutcome>>>,
}

impl Future for PendingWrite {
    type Output = WriterResult<WriteOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(Err(WriterError::Closed));
        };
        let result = ready!(Pin::new(receiver).poll(cx));
        self.receiver = None;
        Poll::Ready(result.unwrap_or(Err(WriterError::Closed)))
    }
}
