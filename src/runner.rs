//! Command execution
//!
//! The executor only needs "run this command, give me its exit status and
//! captured output". `CommandRunner` is that seam; `SystemRunner` is the
//! real implementation, tests substitute a recording fake.
//!
//! # SystemRunner
//!
//! - Spawns each command in a new process group
//! - Captures stdout/stderr on reader threads so a chatty package manager
//!   cannot block on a full pipe
//! - Applies the optional per-action timeout by terminating the group, both
//!   while waiting for the child and while draining its output

use crate::action::ConcreteCommand;
use crate::error::{Result, SetupError};
use crate::process::{kill_group, terminate_group, wait_with_limit, CommandProcessGroup};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Grace period between SIGTERM and SIGKILL on timeout
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Output from a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            success: false,
        }
    }

    /// stdout and stderr joined, trimmed
    pub fn combined(&self) -> String {
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        match (out.is_empty(), err.is_empty()) {
            (true, true) => String::new(),
            (false, true) => out.to_string(),
            (true, false) => err.to_string(),
            (false, false) => format!("{}\n{}", out, err),
        }
    }

    /// Check if the command succeeded and return an error if not.
    pub fn ensure_success(&self, command: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(SetupError::CommandExecution {
                command: command.to_string(),
                code: self.exit_code.unwrap_or(-1),
                output: self.combined(),
            })
        }
    }
}

/// Synchronous command execution.
pub trait CommandRunner {
    /// Run `command` to completion.
    ///
    /// A command that starts and exits non-zero is `Ok` with
    /// `success == false`; errors are reserved for spawn failures and
    /// timeouts.
    fn run(&mut self, command: &ConcreteCommand, timeout: Option<Duration>) -> Result<CommandOutput>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &ConcreteCommand, timeout: Option<Duration>) -> Result<CommandOutput> {
        let rendered = command.to_string();
        info!("Running: {}", rendered);

        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .map_err(|source| SetupError::Spawn {
                command: rendered.clone(),
                source,
            })?;
        let pgid = child.id();
        let deadline = timeout.map(|limit| Instant::now() + limit);
        debug!("Spawned PID {} for {}", pgid, rendered);

        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let status = match timeout {
            Some(limit) => match wait_with_limit(&mut child, limit)? {
                Some(status) => status,
                None => {
                    warn!("Timed out after {:?}: {}", limit, rendered);
                    terminate_group(&mut child, TERMINATE_GRACE)?;
                    return Err(SetupError::Timeout {
                        command: rendered,
                        limit,
                    });
                }
            },
            None => child.wait()?,
        };

        // A background descendant can keep the pipes open after the child exits
        let (Some(stdout), Some(stderr)) = (
            drain_reader(stdout_reader, deadline),
            drain_reader(stderr_reader, deadline),
        ) else {
            let limit = timeout.unwrap_or_default();
            warn!("Output still open after {:?}: {}", limit, rendered);
            kill_group(pgid);
            return Err(SetupError::Timeout {
                command: rendered,
                limit,
            });
        };
        let exit_code = status.code();

        if status.success() {
            debug!("Command succeeded: {}", rendered);
        } else {
            info!("Command failed with exit code {}: {}", exit_code.unwrap_or(-1), rendered);
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            success: status.success(),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Collected pipe contents, or `None` if the pipe is still open at `deadline`
fn drain_reader(reader: Option<Receiver<String>>, deadline: Option<Instant>) -> Option<String> {
    let Some(rx) = reader else {
        return Some(String::new());
    };
    match deadline {
        None => Some(rx.recv().unwrap_or_default()),
        Some(deadline) => match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(text) => Some(text),
            Err(RecvTimeoutError::Disconnected) => Some(String::new()),
            Err(RecvTimeoutError::Timeout) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Invocation;

    fn shell(line: &str) -> ConcreteCommand {
        ConcreteCommand::new(Invocation::Shell(line.to_string()), false)
    }

    #[test]
    fn test_command_output_success() {
        let output = CommandOutput::ok("done");
        assert!(output.ensure_success("true").is_ok());
        assert_eq!(output.combined(), "done");
    }

    #[test]
    fn test_command_output_failure() {
        let output = CommandOutput {
            stdout: "Reading package lists...\n".into(),
            stderr: "E: Unable to locate package nope\n".into(),
            exit_code: Some(100),
            success: false,
        };
        let err = output.ensure_success("apt-get install -y nope").unwrap_err();
        match err {
            SetupError::CommandExecution { command, code, output } => {
                assert_eq!(command, "apt-get install -y nope");
                assert_eq!(code, 100);
                assert!(output.contains("Reading package lists"));
                assert!(output.contains("Unable to locate package"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_signal_termination_reports_minus_one() {
        let output = CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            success: false,
        };
        let err = output.ensure_success("brew install x").unwrap_err();
        assert!(err.to_string().contains("exit code -1"));
    }

    #[test]
    fn test_system_runner_captures_output() {
        let output = SystemRunner::new()
            .run(&shell("echo out; echo err >&2"), None)
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_system_runner_reports_exit_code() {
        let output = SystemRunner::new().run(&shell("exit 7"), None).unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(7));
    }

    #[test]
    fn test_system_runner_exec_without_shell() {
        let cmd = ConcreteCommand::new(
            Invocation::Exec {
                program: "echo".into(),
                args: vec!["a b".into(), "c".into()],
            },
            false,
        );
        let output = SystemRunner::new().run(&cmd, None).unwrap();
        assert_eq!(output.stdout.trim(), "a b c");
    }

    #[test]
    fn test_system_runner_spawn_failure() {
        let cmd = ConcreteCommand::new(
            Invocation::Exec {
                program: "definitely-not-a-real-binary-12345".into(),
                args: vec![],
            },
            false,
        );
        let err = SystemRunner::new().run(&cmd, None).unwrap_err();
        assert!(matches!(err, SetupError::Spawn { .. }));
    }

    #[test]
    fn test_system_runner_timeout() {
        let err = SystemRunner::new()
            .run(&shell("sleep 30"), Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, SetupError::Timeout { .. }));
    }

    #[test]
    fn test_subsecond_timeout_reports_duration() {
        let err = SystemRunner::new()
            .run(&shell("sleep 30"), Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(err.to_string().contains("200ms"), "got: {}", err);
    }

    #[test]
    fn test_background_child_holding_pipes_times_out() {
        let start = Instant::now();
        let err = SystemRunner::new()
            .run(&shell("sleep 6 & exit 0"), Some(Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, SetupError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_system_runner_large_output_does_not_block() {
        let output = SystemRunner::new()
            .run(&shell("yes line | head -n 200000"), Some(Duration::from_secs(20)))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.lines().count(), 200000);
    }
}
