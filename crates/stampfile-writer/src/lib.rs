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
#![allow(clippy::module_name_repetitions)]

//! Ordered timestamp file writer.
//!
//! One writer task services requests strictly in arrival order, keeps at most
//! one output stream open, reopens it when the file underneath was deleted or
//! replaced, and drains queued work before closing.
//!
//! Layout: `service.rs` (builder and handles), `worker.rs` (writer task),
//! `queue.rs` and `shutdown.rs` (task state), `manager.rs` and `stream.rs`
//! (stream lifecycle), `naming.rs`, `directory.rs`, `payload.rs` (collaborators),
//! `model.rs`, `error.rs`.

pub mod directory;
pub mod error;
pub mod identity;
pub mod manager;
pub mod model;
pub mod naming;
pub mod payload;
mod queue;
pub mod service;
mod shutdown;
pub mod stream;
mod worker;

pub use directory::{CreateDirAll, DirectoryCreator};
pub use error::{WriterError, WriterResult};
pub use manager::{OpenReason, StreamManager, StreamSettings};
pub use model::{Payload, WriteOutcome, WriteRequest, WrittenMessage};
pub use naming::{FixedName, GeneratedName, NameGenerator, TimestampNames};
pub use payload::PayloadEncoder;
pub use service::{FileWriter, PendingWrite, WriterBuilder, WriterHandles};
