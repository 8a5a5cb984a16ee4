//! Reload signals for config consumers.
//!
//! Notification is best-effort: by the time it runs, the config is already
//! durably written. A failed reload is logged and reported, never fatal.

use crate::target::TargetKind;
use std::process::Command;
use tracing::{debug, warn};

/// How a consumer is told to re-read its config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadAction {
    /// The consumer picks up changes on its own (or on next launch).
    None,
    /// Run a control command.
    Command {
        program: &'static str,
        args: &'static [&'static str],
    },
    /// Deliver a signal to every process with this name.
    Signal {
        process: &'static str,
        signal: &'static str,
    },
}

/// Sends reload signals to the process owning a config family.
pub trait ReloadNotifier {
    /// Returns `true` if the consumer was signalled (or needs no signal).
    fn notify(&self, kind: TargetKind) -> bool;
}

/// Notifier acting on the running system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNotifier;

impl ReloadNotifier for SystemNotifier {
    fn notify(&self, kind: TargetKind) -> bool {
        match kind.reload_action() {
            ReloadAction::None => true,
            ReloadAction::Command { program, args } => run_command(program, args),
            ReloadAction::Signal { process, signal } => signal_processes(process, signal),
        }
    }
}

/// Notifier that never signals anything (`--no-reload`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReloadNotifier for NoopNotifier {
    fn notify(&self, kind: TargetKind) -> bool {
        debug!(target_kind = %kind, "reload skipped");
        true
    }
}

fn run_command(program: &str, args: &[&str]) -> bool {
    match Command::new(program).args(args).output() {
        Ok(out) if out.status.success() => {
            debug!(program, ?args, "reload command succeeded");
            true
        }
        Ok(out) => {
            warn!(
                program,
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "reload command failed"
            );
            false
        }
        Err(e) => {
            warn!(program, "could not run reload command: {e}");
            false
        }
    }
}

#[cfg(unix)]
fn signal_processes(process: &str, signal: &str) -> bool {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use std::str::FromStr;

    let sig = match Signal::from_str(signal) {
        Ok(s) => s,
        Err(e) => {
            warn!(signal, "unknown signal: {e}");
            return false;
        }
    };
    let pids = find_pids(process);
    if pids.is_empty() {
        warn!(process, "no running process to signal");
        return false;
    }
    let mut delivered = true;
    for pid in pids {
        if let Err(e) = kill(Pid::from_raw(pid), sig) {
            warn!(process, pid, "failed to send {signal}: {e}");
            delivered = false;
        } else {
            debug!(process, pid, "sent {signal}");
        }
    }
    delivered
}

#[cfg(not(unix))]
fn signal_processes(process: &str, signal: &str) -> bool {
    warn!(process, signal, "signals are not supported on this platform");
    false
}

/// PIDs whose `/proc/<pid>/comm` equals `name`.
#[cfg(unix)]
fn find_pids(name: &str) -> Vec<i32> {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };
    let mut pids: Vec<i32> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let pid: i32 = entry.file_name().to_str()?.parse().ok()?;
            let comm = std::fs::read_to_string(entry.path().join("comm")).ok()?;
            (comm.trim_end() == name).then_some(pid)
        })
        .collect();
    pids.sort_unstable();
    pids
}
