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

//! Binary entrypoint: feeds stdin requests to a writer until EOF or Ctrl-C.

use stampfile_app::{AppResult, run_app};

/// Runs the writer host and blocks until it has drained and closed.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
