pub mod procd;
pub mod systemd;

use crate::svc::asyncutil::runtime;
use crate::svc::service::{Result, ServiceError};
use crate::svc::signals;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Run a control command (systemctl, an init script) and capture its output.
/// A non-zero exit becomes an error carrying the command line and stderr.
pub(crate) fn run_command(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let out = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| anyhow::anyhow!("failed to run {program} {}: {e}", args.join(" ")))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        anyhow::bail!(
            "{program} {} failed ({}): {}",
            args.join(" "),
            out.status,
            stderr.trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

/// Platform-convention pidfile probe: first colon-separated field is the pid,
/// liveness checked with signal 0. Stale or empty files are removed.
pub(crate) fn probe_pidfile(path: &Path) -> Result<i32> {
    let raw = fs::read_to_string(path).map_err(|_| ServiceError::NotRunning)?;
    let t = raw.trim();
    if t.is_empty() {
        let _ = fs::remove_file(path);
        return Err(ServiceError::NotRunning);
    }
    let pid: i32 = t
        .split(':')
        .next()
        .unwrap_or("")
        .trim()
        .parse()
        .map_err(|_| ServiceError::NotRunning)?;
    if !signals::process_alive(pid) {
        let _ = fs::remove_file(path);
        return Err(ServiceError::NotRunning);
    }
    Ok(pid)
}

pub(crate) fn stdin_interactive() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

/// Park the calling thread until SIGTERM or SIGINT arrives. Used by native
/// backends between the consumer's start and stop hooks.
pub(crate) fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    runtime().block_on(async {
        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = term.recv() => {}
            _ = int.recv() => {}
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn run_command_captures_output_and_failures() {
        let out = run_command("/bin/sh", &["-c", "echo hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
        let err = run_command("/bin/sh", &["-c", "echo broken >&2; exit 3"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken"), "{msg}");
    }

    #[test]
    fn probe_pidfile_accepts_live_and_rejects_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pid");

        let mut f = fs::File::create(&path).unwrap();
        write!(f, "{}", std::process::id()).unwrap();
        drop(f);
        assert_eq!(probe_pidfile(&path).unwrap(), std::process::id() as i32);

        fs::write(&path, format!("{}", i32::MAX - 1)).unwrap();
        assert!(probe_pidfile(&path).unwrap_err().is_not_running());
        assert!(!path.exists());

        fs::write(&path, "").unwrap();
        assert!(probe_pidfile(&path).unwrap_err().is_not_running());
        assert!(!path.exists());

        assert!(probe_pidfile(&path).unwrap_err().is_not_running());
    }
}
