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

//! Telemetry primitives shared across the stampfile workspace.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (process span),
//! `metrics.rs` (Prometheus registry).

pub mod context;
pub mod init;
pub mod metrics;

pub use context::GlobalContextGuard;
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_env};
pub use metrics::{Metrics, MetricsSnapshot};
