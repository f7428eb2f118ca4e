#![allow(clippy::redundant_pub_crate)]

use std::time::{Duration, Instant};

use chrono::Utc;
use stampfile_events::{Event, EventBus, FailureKind};
use stampfile_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{WriterError, WriterResult};
use crate::manager::{StreamManager, StreamSettings};
use crate::model::{WriteOutcome, WrittenMessage};
use crate::queue::{QueuedWrite, RequestQueue};
use crate::shutdown::{ShutdownAck, ShutdownCoordinator, ShutdownDecision};

const STATUS_INTERVAL: Duration = Duration::from_millis(333);

/// Commands accepted by the writer task.
#[derive(Debug)]
pub(crate) enum Command {
    Write(QueuedWrite),
    Shutdown(Option<ShutdownAck>),
}

/// Everything the writer task needs besides its inbox.
pub(crate) struct WorkerParts {
    pub(crate) settings: StreamSettings,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
    pub(crate) output: mpsc::UnboundedSender<WrittenMessage>,
}

type Job = JoinHandle<(StreamManager, WriterResult<WriteOutcome>)>;

enum Step {
    Finished(Result<(StreamManager, WriterResult<WriteOutcome>), JoinError>),
    Received(Option<Command>),
}

pub(crate) fn spawn(
    runtime: &tokio::runtime::Handle,
    parts: WorkerParts,
    inbox: mpsc::UnboundedReceiver<Command>,
) -> JoinHandle<()> {
    let worker = Worker::new(parts, inbox);
    runtime.spawn(worker.run())
}

struct Worker {
    settings: StreamSettings,
    manager: Option<StreamManager>,
    queue: RequestQueue,
    shutdown: ShutdownCoordinator,
    events: EventBus,
    metrics: Metrics,
    output: mpsc::UnboundedSender<WrittenMessage>,
    inbox: mpsc::UnboundedReceiver<Command>,
    inbox_open: bool,
    last_status: Option<Instant>,
}

impl Worker {
    fn new(parts: WorkerParts, inbox: mpsc::UnboundedReceiver<Command>) -> Self {
        let manager = StreamManager::new(parts.settings.clone());
        Self {
            settings: parts.settings,
            manager: Some(manager),
            queue: RequestQueue::new(),
            shutdown: ShutdownCoordinator::new(),
            events: parts.events,
            metrics: parts.metrics,
            output: parts.output,
            inbox,
            inbox_open: true,
            last_status: None,
        }
    }

    async fn run(mut self) {
        let mut job: Option<Job> = None;
        loop {
            if job.is_none() {
                job = self.start_next();
            }
            let step = if let Some(running) = job.as_mut() {
                tokio::select! {
                    finished = running => Step::Finished(finished),
                    command = self.inbox.recv(), if self.inbox_open => Step::Received(command),
                }
            } else if self.inbox_open {
                Step::Received(self.inbox.recv().await)
            } else {
                break;
            };
            match step {
                Step::Finished(finished) => {
                    job = None;
                    self.finish(finished);
                }
                Step::Received(command) => self.accept(command),
            }
        }
        debug!("writer task exited");
    }

    fn accept(&mut self, command: Option<Command>) {
        match command {
            Some(Command::Write(write)) => self.enqueue(write),
            Some(Command::Shutdown(ack)) => self.request_shutdown(ack),
            None => {
                self.inbox_open = false;
                debug!("all writer handles dropped; shutting down");
                self.request_shutdown(None);
            }
        }
    }

    fn enqueue(&mut self, write: QueuedWrite) {
        if self.shutdown.is_closed() {
            debug!(request_id = %write.request.id, "write rejected after shutdown");
            write.complete(Err(WriterError::Closed));
            return;
        }
        self.queue.enqueue(write);
        self.metrics.set_queue_depth(self.queue.len());
    }

    fn request_shutdown(&mut self, ack: Option<ShutdownAck>) {
        match self.shutdown.request(ack, self.queue.is_empty()) {
            ShutdownDecision::FinalizeNow => self.finalize(),
            ShutdownDecision::Deferred => {
                debug!(pending = self.queue.len(), "draining before close");
            }
            ShutdownDecision::AlreadyClosed => {}
        }
    }

    /// Hand the head request to a blocking job, unless one is already running.
    fn start_next(&mut self) -> Option<Job> {
        let request = self.queue.head()?.request.clone();
        let mut manager = self.manager.take()?;
        let now = Utc::now();
        Some(tokio::task::spawn_blocking(move || {
            let result = manager.service(&request, now);
            (manager, result)
        }))
    }

    fn finish(
        &mut self,
        finished: Result<(StreamManager, WriterResult<WriteOutcome>), JoinError>,
    ) {
        match finished {
            Ok((manager, result)) => {
                self.manager = Some(manager);
                self.report(&result);
                self.queue.advance(result);
                self.metrics.set_queue_depth(self.queue.len());
                if self.queue.is_empty() && self.shutdown.is_draining() {
                    self.finalize();
                }
            }
            Err(join_error) => self.on_fault(&join_error),
        }
    }

    fn report(&mut self, result: &WriterResult<WriteOutcome>) {
        let mode = self.settings.config().write_mode.as_str();
        match result {
            Ok(WriteOutcome::Written(message)) => {
                self.metrics.inc_write(mode, "written");
                debug!(
                    request_id = %message.request_id,
                    path = %message.fullname.display(),
                    bytes = message.bytes,
                    "payload written"
                );
                let _ = self.events.publish(Event::FileWritten {
                    request_id: message.request_id,
                    shortname: message.shortname.display().to_string(),
                    fullname: message.fullname.display().to_string(),
                    bytes: message.bytes,
                });
                self.update_status(message);
                if self.output.send(message.clone()).is_err() {
                    debug!(request_id = %message.request_id, "output receiver dropped");
                }
            }
            Ok(WriteOutcome::Skipped { request_id }) => {
                self.metrics.inc_write(mode, "skipped");
                debug!(request_id = %request_id, "request has no payload; skipped");
            }
            Err(err) => {
                self.metrics.inc_write(mode, "failed");
                let request_id = self.queue.head().map(|write| write.request.id);
                self.report_failure(request_id, err);
            }
        }
    }

    fn report_failure(&self, request_id: Option<Uuid>, err: &WriterError) {
        let message = err.report();
        let kind = err.failure_kind().map_or("unknown", FailureKind::as_str);
        if matches!(err, WriterError::MissingDirectory { .. }) {
            warn!(request_id = ?request_id, kind, error = %message, "write request abandoned");
        } else {
            error!(request_id = ?request_id, kind, error = %message, "write request failed");
        }
        if let (Some(request_id), Some(kind)) = (request_id, err.failure_kind()) {
            let _ = self.events.publish(Event::WriteFailed {
                request_id,
                kind,
                message,
            });
        }
    }

    /// Leading-edge throttle: the first write after a quiet interval updates
    /// the status, later writes inside the interval do not.
    fn update_status(&mut self, message: &WrittenMessage) {
        if !self.settings.config().is_dynamic() {
            return;
        }
        let now = Instant::now();
        if self
            .last_status
            .is_some_and(|last| now.duration_since(last) < STATUS_INTERVAL)
        {
            return;
        }
        self.last_status = Some(now);
        let text = message
            .fullname
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let _ = self.events.publish(Event::StatusChanged { text });
    }

    fn on_fault(&mut self, join_error: &JoinError) {
        let detail = if join_error.is_panic() {
            "write job panicked".to_string()
        } else {
            join_error.to_string()
        };
        self.metrics.inc_writer_fault();
        let mut pending = self.queue.reset().into_iter();
        let aborted = pending.len().saturating_sub(1);
        error!(error = %detail, aborted, "writer fault; queue reset");
        if let Some(head) = pending.next() {
            head.complete(Err(WriterError::Fault {
                detail: detail.clone(),
            }));
        }
        for write in pending {
            write.complete(Err(WriterError::Aborted));
        }
        self.metrics.set_queue_depth(0);
        self.manager = Some(StreamManager::new(self.settings.clone()));
        let _ = self.events.publish(Event::WriterFault { message: detail });
        if self.shutdown.is_draining() {
            self.finalize();
        }
    }

    fn finalize(&mut self) {
        if let Some(manager) = self.manager.as_mut() {
            manager.release();
        }
        let _ = self.events.publish(Event::StatusChanged { text: None });
        let _ = self.events.publish(Event::WriterClosed);
        let waiters = self.shutdown.finalize();
        info!(
            mode = self.settings.config().write_mode.as_str(),
            waiters, "writer closed"
        );
    }
}
