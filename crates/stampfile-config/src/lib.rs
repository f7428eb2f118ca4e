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

//! Configuration primitives for the stampfile writer.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (file and environment
//! loading), `error.rs` (structured errors), `defaults.rs` (default values).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_from_env, load_from_path};
pub use model::{WriteMode, WriterConfig};
