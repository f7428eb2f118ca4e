//! Helpers for observing writer events in tests.

use std::time::Duration;

use anyhow::{Result, bail};
use stampfile_events::{Event, EventStream};
use tokio::time::timeout;

/// Upper bound for waiting on a single event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Collect events until `done` returns `true` for one of them.
///
/// # Errors
///
/// Returns an error if the stream closes or stalls before a matching event.
pub async fn collect_until<F>(stream: &mut EventStream, mut done: F) -> Result<Vec<Event>>
where
    F: FnMut(&Event) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let Ok(next) = timeout(EVENT_TIMEOUT, stream.next()).await else {
            bail!("timed out waiting for event; saw {seen:?}");
        };
        let Some(envelope) = next else {
            bail!("event stream closed; saw {seen:?}");
        };
        let finished = done(&envelope.event);
        seen.push(envelope.event);
        if finished {
            return Ok(seen);
        }
    }
}
