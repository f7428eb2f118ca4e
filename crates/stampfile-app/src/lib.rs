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

//! Stampfile host application.
//!
//! Layout: `bootstrap.rs` (wiring and the stdin/stdout loop), `error.rs`.

/// Writer wiring and the request loop.
pub mod bootstrap;
/// Application error type.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
