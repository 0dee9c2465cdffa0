//! Streams a job's log summary to stdout.
//!
//! ```text
//! LOG_STREAM_BASE_URL=http://localhost:8000 cargo run --example stream_summary -- 42 1337
//! ```

use futures::StreamExt;
use pipeline_log_stream::observability::{init_logging, LogConfig, LogLevel};
use pipeline_log_stream::{Frame, FrameKind, JobLogRef, LogStreamClient};
use std::io::Write;

/// A `complete` summary repeats the tokens already printed, so it is only
/// shown when none were.
fn summary_to_print(frame: &Frame, streamed_tokens: bool) -> Option<&str> {
    frame.summary.as_deref().filter(|_| !streamed_tokens)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LogConfig::new().level(LogLevel::Warn));

    let mut args = std::env::args().skip(1);
    let project_id: u64 = args.next().ok_or("usage: stream_summary <project_id> <job_id>")?.parse()?;
    let job_id: u64 = args.next().ok_or("usage: stream_summary <project_id> <job_id>")?.parse()?;
    let job = JobLogRef::new(project_id, job_id);

    let client = LogStreamClient::from_env()?;
    if !client.probe(job).await? {
        eprintln!("Stream endpoint for job {job} is not available");
        return Ok(());
    }

    let mut frames = client.stream(job);
    let mut stdout = std::io::stdout();
    let mut streamed_tokens = false;
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        match frame.kind {
            FrameKind::Status => eprintln!("[{}]", frame.message.unwrap_or_default()),
            FrameKind::Token => {
                streamed_tokens = true;
                write!(stdout, "{}", frame.content.unwrap_or_default())?;
                stdout.flush()?;
            }
            FrameKind::Complete => {
                if let Some(summary) = summary_to_print(&frame, streamed_tokens) {
                    println!("{summary}");
                }
                println!();
            }
            FrameKind::Error => eprintln!("error: {}", frame.message.unwrap_or_default()),
        }
    }

    let metrics = client.metrics();
    eprintln!(
        "{} frames, {} bytes, {} undecodable blocks",
        metrics.frames_dispatched, metrics.bytes_received, metrics.decode_failures
    );
    Ok(())
}
