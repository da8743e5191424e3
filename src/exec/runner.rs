// src/exec/runner.rs

//! Child process execution with timeout, output cap and outcome
//! classification.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::effects::{Notification, Notifier};
use crate::engine::task::Task;
use crate::exec::script::substitute;

/// Hard cap on combined captured output. A child that exceeds it is killed.
pub const MAX_OUTPUT_BYTES: usize = 32 * 1024 * 1024;

/// How long to wait for the capture tasks after the child is gone.
const OUTPUT_GRACE: std::time::Duration = std::time::Duration::from_millis(250);

/// Classified result of one executed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Interpreter could not be spawned at all.
    SpawnFailed(String),
    /// OS-level failure while waiting on the child.
    WaitFailed(String),
    /// Exceeded the configured timeout and was killed.
    TimedOut,
    NonZeroExit(i32),
    KilledBySignal(i32),
    /// `success_match` configured but the output did not match it.
    SuccessMismatch,
    /// `error_match` configured and the output matched it.
    ErrorMatched,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Failures that indicate the action never ran properly, as opposed to
    /// running and being judged unsuccessful. These get an attention
    /// notification on top of the log entry.
    pub fn is_process_error(&self) -> bool {
        matches!(self, Outcome::SpawnFailed(_) | Outcome::WaitFailed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::SpawnFailed(err) => write!(f, "could not execute command: {err}"),
            Outcome::WaitFailed(err) => write!(f, "process error: {err}"),
            Outcome::TimedOut => write!(f, "command timed out"),
            Outcome::NonZeroExit(code) => {
                write!(f, "command returned non-zero exit code: {code}")
            }
            Outcome::KilledBySignal(sig) => {
                write!(f, "command was killed via signal: {sig}")
            }
            Outcome::SuccessMismatch => {
                write!(f, "command output did not match success pattern")
            }
            Outcome::ErrorMatched => write!(f, "command output matched error pattern"),
        }
    }
}

/// Abstraction the dispatch queue drives.
///
/// Production uses [`ShellRunner`]; tests provide recording fakes.
pub trait ActionRunner: Send + Sync + 'static {
    fn run(&self, task: Task) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
}

/// Runs tasks as real shell children and fires success side effects through
/// the injected [`Notifier`].
pub struct ShellRunner {
    notifier: Arc<dyn Notifier>,
}

impl ShellRunner {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

impl ActionRunner for ShellRunner {
    fn run(&self, task: Task) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        let notifier = Arc::clone(&self.notifier);
        Box::pin(async move { run_and_report(task, notifier).await })
    }
}

/// Execute one task end to end and handle its outcome.
///
/// Failure policy: log with the task identity and drop — no retry. Success
/// policy: optional notification and sound.
pub async fn run_and_report(task: Task, notifier: Arc<dyn Notifier>) {
    let (outcome, _output) = execute(&task).await;

    if outcome.is_success() {
        debug!(
            folder = %task.cwd.display(),
            trigger = %task.trigger,
            path = %task.path.display(),
            "action succeeded"
        );

        if let Some(template) = &task.action.notify {
            let message = substitute(template, &task);
            debug!(folder = %task.cwd.display(), message = %message, "sending notification");
            notifier.notify(Notification {
                title: "Folder Action Complete".to_string(),
                message,
                icon: task.action.icon.clone(),
                attention: false,
            });
        }
        if let Some(sound) = &task.action.sound {
            debug!(folder = %task.cwd.display(), sound = %sound, "playing sound");
            notifier.play_sound(sound);
        }
        return;
    }

    error!(
        folder = %task.cwd.display(),
        trigger = %task.trigger,
        path = %task.path.display(),
        "action failed: {outcome}"
    );

    if outcome.is_process_error() {
        notifier.notify(Notification {
            title: "Folder Action Error".to_string(),
            message: format!("{} action for {}: {outcome}", task.trigger, task.path.display()),
            icon: task.action.icon.clone(),
            attention: true,
        });
    }
}

/// Spawn the shell, drive it via stdin, enforce timeout and output cap, and
/// classify the result. Resolves exactly once per task.
///
/// Returns the outcome and the captured combined output (replaced by a
/// synthetic message on timeout).
pub async fn execute(task: &Task) -> (Outcome, String) {
    let script = substitute(&task.action.exec, task);
    info!(
        folder = %task.cwd.display(),
        trigger = %task.trigger,
        shell = %task.action.shell,
        "executing action script"
    );
    debug!(script = %script, "substituted script body");

    let mut cmd = Command::new(&task.action.shell);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .current_dir(&task.cwd)
        .env_clear()
        .envs(&task.env)
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => return (Outcome::SpawnFailed(err.to_string()), String::new()),
    };

    // Feed the script over stdin, heredoc-style, then close it. Driving the
    // shell via stdin (rather than -c) allows arbitrary multi-line scripts.
    if let Some(mut stdin) = child.stdin.take() {
        let body = format!("{script}\n");
        tokio::spawn(async move {
            let _ = stdin.write_all(body.as_bytes()).await;
            let _ = stdin.shutdown().await;
        });
    }

    // Combined stdout+stderr accumulator with a safety cap. Exceeding the
    // cap asks the main select below to kill the child.
    let output = Arc::new(Mutex::new(Vec::<u8>::new()));
    let (overflow_tx, mut overflow_rx) = mpsc::channel::<()>(1);

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_capture(stdout, Arc::clone(&output), overflow_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_capture(stderr, Arc::clone(&output), overflow_tx.clone()));
    }
    drop(overflow_tx);

    let mut timed_out = false;
    let status = tokio::select! {
        res = child.wait() => res,
        _ = tokio::time::sleep(task.timeout()) => {
            timed_out = true;
            let _ = child.kill().await;
            child.wait().await
        }
        Some(()) = overflow_rx.recv() => {
            debug!(folder = %task.cwd.display(), "output cap exceeded; killing child");
            let _ = child.kill().await;
            child.wait().await
        }
    };

    // Readers normally finish as soon as the pipes hit EOF. A grandchild
    // that inherited the pipes (e.g. a backgrounded command surviving a
    // kill) would hold them open indefinitely, so cap the wait.
    let drained = tokio::time::timeout(OUTPUT_GRACE, async {
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
    })
    .await;
    if drained.is_err() {
        for reader in &readers {
            reader.abort();
        }
    }

    let status = match status {
        Ok(status) => status,
        Err(err) => return (Outcome::WaitFailed(err.to_string()), String::new()),
    };

    let captured = if timed_out {
        format!(
            "Command timed out after {} seconds",
            task.timeout().as_secs()
        )
    } else {
        let bytes = output.lock().map(|g| g.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    };

    debug!(
        folder = %task.cwd.display(),
        code = ?status.code(),
        bytes = captured.len(),
        "child exited"
    );

    let outcome = classify(task, timed_out, status.code(), signal_of(&status), &captured);
    (outcome, captured)
}

/// Pure outcome classification, in strict precedence order: timeout, exit
/// code, signal, success pattern, error pattern.
fn classify(
    task: &Task,
    timed_out: bool,
    code: Option<i32>,
    signal: Option<i32>,
    output: &str,
) -> Outcome {
    if timed_out {
        return Outcome::TimedOut;
    }
    match (code, signal) {
        (Some(0), _) => {}
        (Some(code), _) => return Outcome::NonZeroExit(code),
        (None, Some(sig)) => return Outcome::KilledBySignal(sig),
        (None, None) => return Outcome::KilledBySignal(-1),
    }
    if let Some(re) = &task.action.success_match {
        if !re.is_match(output) {
            return Outcome::SuccessMismatch;
        }
    }
    if let Some(re) = &task.action.error_match {
        if re.is_match(output) {
            return Outcome::ErrorMatched;
        }
    }
    Outcome::Success
}

fn spawn_capture<R>(
    mut stream: R,
    sink: Arc<Mutex<Vec<u8>>>,
    overflow_tx: mpsc::Sender<()>,
) -> tokio::task::JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let overflowed = {
                        let mut sink = match sink.lock() {
                            Ok(guard) => guard,
                            Err(_) => break,
                        };
                        sink.extend_from_slice(&chunk[..n]);
                        sink.len() > MAX_OUTPUT_BYTES
                    };
                    if overflowed {
                        let _ = overflow_tx.try_send(());
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(unix)]
fn signal_of(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
