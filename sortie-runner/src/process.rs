//! Process execution
//!
//! Spawns a binary, drains stdout and stderr on two independent reader
//! tasks while waiting on the process, and enforces a hard wall-clock
//! timeout. The result is only assembled after both readers finished and
//! the process exited.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sortie_core::domain::execution::UNKNOWN_EXIT_CODE;

use crate::error::RunnerError;

/// Receives each stdout line as soon as it is complete
pub type OutputSink = mpsc::UnboundedSender<String>;

/// How long readers may keep draining after the process exited
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Ordered, thread-safe collection of captured lines
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push(line);
    }

    /// Copy of the lines captured so far
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Takes all captured lines, leaving the buffer empty
    pub fn take(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *lines)
    }
}

/// Result of a process that was started
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Clean zero exit within the timeout
    pub success: bool,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Exit code, or `-1` when the process was terminated by a signal
    pub exit_code: i32,
    /// The process was killed because it exceeded the timeout
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl ProcessOutcome {
    pub fn output(&self) -> String {
        self.stdout.join("\n")
    }

    pub fn error_output(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Runs `binary` with `args`, killing it after `timeout`.
///
/// Start failures are errors; a non-zero exit or a timeout kill is a
/// non-success [`ProcessOutcome`] carrying whatever output was captured.
pub async fn run_process(
    binary: &Path,
    args: &[String],
    timeout: Duration,
    sink: Option<OutputSink>,
) -> Result<ProcessOutcome, RunnerError> {
    run_process_in(binary, args, None, timeout, sink).await
}

pub(crate) async fn run_process_in(
    binary: &Path,
    args: &[String],
    work_dir: Option<&Path>,
    timeout: Duration,
    sink: Option<OutputSink>,
) -> Result<ProcessOutcome, RunnerError> {
    debug!(binary = %binary.display(), ?args, "Spawning process");

    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = work_dir {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    command.process_group(0);

    let started_at = Utc::now();
    let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
        binary: binary.to_path_buf(),
        source,
    })?;

    let stdout = child.stdout.take().ok_or(RunnerError::Pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(RunnerError::Pipe("stderr"))?;

    let stdout_lines = LineBuffer::new();
    let stderr_lines = LineBuffer::new();
    let stdout_reader = ReaderTask(tokio::spawn(drain_lines(stdout, stdout_lines.clone(), sink)));
    let stderr_reader = ReaderTask(tokio::spawn(drain_lines(stderr, stderr_lines.clone(), None)));

    let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (status.map_err(RunnerError::Wait)?, false),
        Err(_) => {
            warn!(
                binary = %binary.display(),
                timeout_secs = timeout.as_secs(),
                "Process exceeded timeout, killing"
            );
            terminate(&mut child);
            (child.wait().await.map_err(RunnerError::Wait)?, true)
        }
    };

    tokio::join!(
        join_reader(stdout_reader, "stdout"),
        join_reader(stderr_reader, "stderr")
    );

    let exit_code = status.code().unwrap_or(UNKNOWN_EXIT_CODE);
    let success = status.success() && !timed_out;

    info!(
        binary = %binary.display(),
        exit_code,
        success,
        timed_out,
        "Process exited"
    );

    Ok(ProcessOutcome {
        success,
        stdout: stdout_lines.take(),
        stderr: stderr_lines.take(),
        exit_code,
        timed_out,
        started_at,
        ended_at: Utc::now(),
    })
}

async fn drain_lines<R>(reader: R, buffer: LineBuffer, sink: Option<OutputSink>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&raw);
                if let Some(sink) = &sink {
                    // Receiver gone means nobody is tailing anymore
                    let _ = sink.send(line.clone());
                }
                buffer.push(line);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read process output");
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Output reader that is aborted when dropped, including on early returns
struct ReaderTask(JoinHandle<()>);

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn join_reader(mut task: ReaderTask, stream: &'static str) {
    match tokio::time::timeout(DRAIN_GRACE, &mut task.0).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(stream, error = %e, "Output reader failed"),
        Err(_) => {
            // A descendant outside the process group still holds the pipe
            warn!(stream, "Output reader did not finish after exit, aborting");
        }
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
            if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                debug!(pid, error = %e, "Failed to kill process group");
            }
        }
    }

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Failed to kill child process");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn script(body: &str) -> Vec<String> {
        vec!["-c".to_string(), body.to_string()]
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr_separately() {
        let outcome = run_process(
            &sh(),
            &script("echo one; echo oops >&2; echo two"),
            Duration::from_secs(10),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, vec!["one", "two"]);
        assert_eq!(outcome.stderr, vec!["oops"]);
        assert_eq!(outcome.output(), "one\ntwo");
        assert!(outcome.ended_at >= outcome.started_at);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let outcome = run_process(
            &sh(),
            &script("echo partial; exit 3"),
            Duration::from_secs(10),
            None,
        )
        .await
        .unwrap();

        assert!(!outcome.success);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.output(), "partial");
    }

    #[tokio::test]
    async fn test_zero_exit_is_success_regardless_of_stderr() {
        let outcome = run_process(
            &sh(),
            &script("echo FAILED >&2; exit 0"),
            Duration::from_secs(10),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.error_output(), "FAILED");
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let err = run_process(
            Path::new("sortie-definitely-missing-binary"),
            &[],
            Duration::from_secs(10),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunnerError::Spawn { .. }));
        assert!(err.is_launch_error());
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let started = std::time::Instant::now();
        let outcome = run_process(
            &sh(),
            &script("echo started; sleep 30; echo never"),
            Duration::from_millis(500),
            None,
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, -1);
        assert_eq!(outcome.stdout, vec!["started"]);
    }

    #[tokio::test]
    async fn test_large_output_on_both_streams_does_not_deadlock() {
        // Each stream well beyond a pipe buffer
        let outcome = run_process(
            &sh(),
            &script("i=0; while [ $i -lt 20000 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done"),
            Duration::from_secs(60),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.stdout.len(), 20000);
        assert_eq!(outcome.stderr.len(), 20000);
        assert_eq!(outcome.stdout[19999], "out19999");
        assert_eq!(outcome.stderr[0], "err0");
    }

    #[tokio::test]
    async fn test_sink_receives_stdout_lines_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = run_process(
            &sh(),
            &script("echo a; echo hidden >&2; echo b"),
            Duration::from_secs(10),
            Some(tx),
        )
        .await
        .unwrap();

        let mut received = Vec::new();
        while let Ok(line) = rx.try_recv() {
            received.push(line);
        }
        assert_eq!(received, vec!["a", "b"]);
        assert_eq!(outcome.stdout, received);
    }

    #[tokio::test]
    async fn test_final_line_without_newline_is_kept() {
        let outcome = run_process(
            &sh(),
            &script("printf 'first\\r\\nlast'"),
            Duration::from_secs(10),
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.stdout, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn test_dropped_reader_task_is_aborted() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = ReaderTask(tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        }));

        // same path as a wait error returning before the readers are joined
        drop(task);

        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_join_reader_aborts_a_stuck_reader() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = ReaderTask(tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        }));

        join_reader(task, "stdout").await;

        assert!(rx.await.is_err());
    }

    #[test]
    fn test_decode_line_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"ok\xff\n"), "ok\u{fffd}");
    }

    #[test]
    fn test_line_buffer_take_empties() {
        let buffer = LineBuffer::new();
        buffer.push("x".to_string());
        assert_eq!(buffer.snapshot(), vec!["x"]);
        assert_eq!(buffer.take(), vec!["x"]);
        assert!(buffer.snapshot().is_empty());
    }
}
