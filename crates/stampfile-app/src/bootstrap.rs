use std::future::Future;

use serde_json::Value;
use stampfile_config::{WriterConfig, load_from_env};
use stampfile_events::{Event, EventBus};
use stampfile_telemetry::{
    GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging, log_format_from_env,
};
use stampfile_writer::{WriteRequest, WrittenMessage, WriterBuilder, WriterHandles};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Entry point for the stampfile host.
///
/// # Errors
///
/// Returns an error if logging, configuration, or the writer cannot be set up,
/// or if reading stdin or writing stdout fails.
pub async fn run_app() -> AppResult<()> {
    let logging = LoggingConfig {
        format: log_format_from_env().unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    let config = load_from_env().map_err(|err| AppError::config("config.load_from_env", err))?;
    info!(
        mode = config.write_mode.as_str(),
        dynamic = config.is_dynamic(),
        "stampfile writer starting"
    );

    let input = BufReader::new(tokio::io::stdin());
    run_with(config, input, tokio::io::stdout(), shutdown_signal()).await?;
    info!("stampfile writer stopped");
    Ok(())
}

/// Feed `input` lines to a writer until EOF or `shutdown`, printing every
/// emitted message to `output`. Returns `output` once the writer has closed.
pub(crate) async fn run_with<R, W, S>(
    config: WriterConfig,
    input: R,
    output: W,
    shutdown: S,
) -> AppResult<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let events = EventBus::new();
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let status = spawn_status_logger(&events);
    let bus = events.clone();
    let WriterHandles {
        writer,
        output: messages,
        task,
    } = WriterBuilder::new(config)
        .with_events(events)
        .with_metrics(metrics.clone())
        .spawn()
        .map_err(|err| AppError::writer("writer.spawn", err))?;
    let printer = tokio::spawn(print_messages(messages, output));

    let mut lines = input.lines();
    let mut submitted = 0_usize;
    tokio::pin!(shutdown);
    let read_result = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(request) = parse_line(&line) else {
                        continue;
                    };
                    drop(writer.submit(request));
                    submitted += 1;
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(AppError::io("stdin.read", err)),
            },
            () = &mut shutdown => {
                info!("shutdown signal received");
                break Ok(());
            }
        }
    };

    writer.close().await;
    drop(writer);
    task.await.map_err(|err| AppError::task("writer.join", err))?;
    let output = printer
        .await
        .map_err(|err| AppError::task("printer.join", err))?
        .map_err(|err| AppError::io("stdout.write", err))?;
    status.abort();
    info!(
        submitted,
        last_event = ?bus.last_event_id(),
        metrics = ?metrics.snapshot(),
        "writer drained"
    );
    read_result.map(|()| output)
}

/// Build a request from one input line. Blank lines yield nothing; lines that
/// are not JSON become text payloads.
pub(crate) fn parse_line(line: &str) -> Option<WriteRequest> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<Value>(trimmed).map_or_else(
        |_| WriteRequest::new(line.to_string()),
        WriteRequest::from_message,
    ))
}

async fn print_messages<W>(
    mut messages: mpsc::UnboundedReceiver<WrittenMessage>,
    mut output: W,
) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(output)
}

fn spawn_status_logger(events: &EventBus) -> JoinHandle<()> {
    let mut stream = events.subscribe(None);
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            debug!(event = envelope.event.kind(), id = envelope.id, "writer event");
            match envelope.event {
                Event::StatusChanged { text: Some(text) } => info!(status = %text, "status"),
                Event::WriterFault { message } => warn!(error = %message, "writer fault"),
                Event::WriterClosed => {
                    debug!("writer closed");
                    break;
                }
                _ => {}
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; relying on EOF");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use stampfile_config::WriteMode;
    use stampfile_writer::Payload;
    use std::fs;
    use std::path::Path;

    fn config(root: &Path) -> WriterConfig {
        WriterConfig {
            directory: Some(root.to_path_buf()),
            write_mode: WriteMode::Append,
            append_newline: false,
            create_dir: true,
            ..WriterConfig::default()
        }
    }

    #[test]
    fn parse_line_handles_json_text_and_blanks() {
        assert!(parse_line("   ").is_none());

        let Some(request) = parse_line(r#"{"payload": {"x": 1}, "dirname": "/data", "topic": "t"}"#)
        else {
            panic!("json line should parse");
        };
        assert_eq!(request.payload, Some(Payload::Json(serde_json::json!({"x": 1}))));
        assert_eq!(request.directory.as_deref(), Some(Path::new("/data")));
        assert!(request.fields.contains_key("topic"));

        let Some(request) = parse_line("not json at all") else {
            panic!("text line should parse");
        };
        assert_eq!(
            request.payload,
            Some(Payload::Text("not json at all".to_string()))
        );
    }

    #[tokio::test]
    async fn stdin_lines_are_written_and_echoed() -> Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-app-")?;
        let input: &[u8] = b"{\"payload\":\"a\",\"topic\":\"t\"}\n\nplain\n";
        let output = run_with(
            config(temp.path()),
            input,
            Vec::new(),
            std::future::pending(),
        )
        .await?;

        let text = String::from_utf8(output)?;
        let lines: Vec<Value> = text
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["payload"], "a");
        assert_eq!(lines[0]["topic"], "t");
        assert_eq!(lines[1]["payload"], "plain");

        let mut written = String::new();
        let mut seen = Vec::new();
        for line in &lines {
            let Some(fullname) = line["fullname"].as_str() else {
                anyhow::bail!("fullname missing from {line}");
            };
            if !seen.contains(&fullname.to_string()) {
                written.push_str(&fs::read_to_string(fullname)?);
                seen.push(fullname.to_string());
            }
        }
        assert_eq!(written, "aplain");
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_signal_stops_reading() -> Result<()> {
        let temp = stampfile_test_support::fixtures::temp_dir("stampfile-app-")?;
        let (_client, server) = tokio::io::duplex(64);
        let output = run_with(
            config(temp.path()),
            BufReader::new(server),
            Vec::new(),
            std::future::ready(()),
        )
        .await?;
        assert!(output.is_empty());
        Ok(())
    }
}
