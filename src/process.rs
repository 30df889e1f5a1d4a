//! Process-group handling for spawned package-manager commands
//!
//! Every external command runs as the leader of its own process group, so
//! a timed-out action can be stopped together with whatever it forked
//! (`apt-get` → `dpkg`, `brew` → `curl`, ...).
//!
//! Termination sends SIGTERM to the whole group, waits up to the grace
//! period, then sends SIGKILL to anything left.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

/// Poll interval while waiting for a child to exit
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // PGID = child PID
        self.process_group(0)
    }
}

/// Send a signal to an entire process group.
///
/// Negative PID addresses the group led by `pgid`.
fn send_signal_to_group(pgid: u32, sig: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), sig)
}

/// Wait for `child` to exit, giving up after `limit`.
///
/// Returns `Ok(None)` if the child is still running when the limit expires.
pub fn wait_with_limit(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= limit {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL whatever is left in group `pgid` after its leader was reaped.
pub fn kill_group(pgid: u32) {
    match send_signal_to_group(pgid, Signal::SIGKILL) {
        Ok(()) => tracing::debug!("Sent SIGKILL to process group {}", pgid),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => tracing::warn!("Failed to send SIGKILL to process group {}: {}", pgid, e),
    }
}

/// Terminate the process group led by `child` and reap it.
///
/// SIGTERM first, SIGKILL after `grace_period`.
pub fn terminate_group(child: &mut Child, grace_period: Duration) -> std::io::Result<ExitStatus> {
    let pgid = child.id();

    if let Err(e) = send_signal_to_group(pgid, Signal::SIGTERM) {
        tracing::warn!("Failed to send SIGTERM to process group {}: {}", pgid, e);
        let _ = child.kill();
    } else {
        tracing::debug!("Sent SIGTERM to process group {}", pgid);
    }

    if let Some(status) = wait_with_limit(child, grace_period)? {
        return Ok(status);
    }

    tracing::warn!("Process group {} did not terminate, sending SIGKILL", pgid);
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGKILL) {
        tracing::error!("Failed to send SIGKILL to process group {}: {}", pgid, e);
        let _ = child.kill();
    }
    child.wait()
}
