//! Output multiplexer
//!
//! Two drain tasks, one per pipe, read lines concurrently and push them into
//! the session's queue. Lines of one stream keep their order; lines of
//! different streams interleave by read completion time, so no ordering
//! holds between stdout and stderr.
//!
//! While the process runs, drains stop as soon as the session is cancelled,
//! including while blocked on a full queue. Once the controller has observed
//! a clean exit it calls [`Multiplexer::shield`] so a late interrupt cannot
//! cut off lines already written to the pipes. A late interrupt still bounds
//! the wait: [`Multiplexer::join_until`] stops the drains a grace period after
//! it, for pipes a surviving descendant keeps open.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::CommandError;
use crate::session::{EventSink, ProducerSink};
use crate::types::{CommandId, OutputStream, ProgressEvent};

/// What one drain task did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Stream drained
    pub stream: OutputStream,
    /// Lines pushed to the queue
    pub lines: u64,
    /// Read failure, if any
    pub error: Option<String>,
    /// Stopped before EOF because of cancellation
    pub abandoned: bool,
}

impl DrainReport {
    fn new(stream: OutputStream) -> Self {
        Self {
            stream,
            lines: 0,
            error: None,
            abandoned: false,
        }
    }
}

/// Reports of both drains, available once both finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexReport {
    /// Standard output drain
    pub stdout: DrainReport,
    /// Standard error drain
    pub stderr: DrainReport,
}

impl MultiplexReport {
    /// Total lines pushed
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.stdout.lines + self.stderr.lines
    }

    /// First read failure as a stream error
    #[must_use]
    pub fn stream_error(&self) -> Option<CommandError> {
        [&self.stdout, &self.stderr].into_iter().find_map(|report| {
            report
                .error
                .as_ref()
                .map(|message| CommandError::stream(report.stream.as_str(), message.clone()))
        })
    }
}

/// Running pair of drain tasks
pub struct Multiplexer {
    stdout: JoinHandle<DrainReport>,
    stderr: JoinHandle<DrainReport>,
    drain_cancel: CancellationToken,
    shield: CancellationToken,
    forward: JoinHandle<()>,
}

impl Multiplexer {
    /// Start draining both streams into `sink`
    pub fn spawn<O, E>(
        stdout: O,
        stderr: E,
        sink: &EventSink,
        cancel: CancellationToken,
        session_id: &CommandId,
    ) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let drain_cancel = CancellationToken::new();
        let shield = CancellationToken::new();

        let forward = {
            let drain_cancel = drain_cancel.clone();
            let shield = shield.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    () = shield.cancelled() => {}
                    () = cancel.cancelled() => drain_cancel.cancel(),
                }
            })
        };

        let stdout = tokio::spawn(drain(
            stdout,
            OutputStream::Stdout,
            sink.producer(drain_cancel.clone()),
            session_id.clone(),
        ));
        let stderr = tokio::spawn(drain(
            stderr,
            OutputStream::Stderr,
            sink.producer(drain_cancel.clone()),
            session_id.clone(),
        ));

        Self {
            stdout,
            stderr,
            drain_cancel,
            shield,
            forward,
        }
    }

    /// Stop propagating cancellation to the drains
    pub fn shield(&self) {
        self.shield.cancel();
    }

    /// Stop both drains now, whether or not they are shielded
    pub fn stop(&self) {
        self.drain_cancel.cancel();
    }

    /// Wait for both drains, stopping them `grace` after `cancel` fires
    pub async fn join_until(self, cancel: CancellationToken, grace: Duration) -> MultiplexReport {
        let drain_cancel = self.drain_cancel.clone();
        let deadline = tokio::spawn(async move {
            cancel.cancelled().await;
            tokio::time::sleep(grace).await;
            drain_cancel.cancel();
        });
        let report = self.join().await;
        deadline.abort();
        report
    }

    /// Wait until both drains have finished
    pub async fn join(self) -> MultiplexReport {
        let stdout = collect(self.stdout, OutputStream::Stdout).await;
        let stderr = collect(self.stderr, OutputStream::Stderr).await;
        self.forward.abort();
        MultiplexReport { stdout, stderr }
    }
}

async fn collect(handle: JoinHandle<DrainReport>, stream: OutputStream) -> DrainReport {
    match handle.await {
        Ok(report) => report,
        Err(e) => {
            let mut report = DrainReport::new(stream);
            report.error = Some(format!("drain task failed: {e}"));
            report
        }
    }
}

/// Read `reader` line by line into `sink` until EOF, error or cancellation
///
/// If the receiver goes away the pipe is still read to EOF so the process
/// never blocks or dies on a full pipe.
async fn drain<R>(
    reader: R,
    stream: OutputStream,
    sink: ProducerSink,
    session_id: CommandId,
) -> DrainReport
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut report = DrainReport::new(stream);
    let mut discarding = false;

    loop {
        buf.clear();
        // A killed process can leave descendants holding the pipe open
        let read = tokio::select! {
            biased;
            () = sink.cancelled() => {
                report.abandoned = true;
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = trim_line_ending(&String::from_utf8_lossy(&buf)).to_string();
                log::debug!("[{session_id}] {stream}: {line}");
                if discarding {
                    continue;
                }
                if sink.push(ProgressEvent::output(stream, line)).await {
                    report.lines += 1;
                } else if sink.is_cancelled() {
                    report.abandoned = true;
                    break;
                } else {
                    // Nobody reads the queue any more; keep the pipe drained
                    log::debug!("[{session_id}] Event queue closed, discarding {stream}");
                    discarding = true;
                }
            }
            Err(e) => {
                log::error!("[{session_id}] Failed reading {stream}: {e}");
                report.error = Some(e.to_string());
                break;
            }
        }
    }

    report
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
