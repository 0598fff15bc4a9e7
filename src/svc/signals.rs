use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

/// Parse a textual signal name. Case-insensitive, optional `SIG` prefix.
pub fn to_signal(name: &str) -> anyhow::Result<Signal> {
    let raw = name.trim().to_uppercase();
    let short = raw.strip_prefix("SIG").unwrap_or(&raw);
    let sig = match short {
        "HUP" => Signal::SIGHUP,
        "INT" => Signal::SIGINT,
        "QUIT" => Signal::SIGQUIT,
        "ILL" => Signal::SIGILL,
        "TRAP" => Signal::SIGTRAP,
        "ABRT" => Signal::SIGABRT,
        "BUS" => Signal::SIGBUS,
        "FPE" => Signal::SIGFPE,
        "KILL" => Signal::SIGKILL,
        "USR1" => Signal::SIGUSR1,
        "SEGV" => Signal::SIGSEGV,
        "USR2" => Signal::SIGUSR2,
        "PIPE" => Signal::SIGPIPE,
        "ALRM" => Signal::SIGALRM,
        "TERM" => Signal::SIGTERM,
        "CHLD" => Signal::SIGCHLD,
        "CONT" => Signal::SIGCONT,
        "STOP" => Signal::SIGSTOP,
        "TSTP" => Signal::SIGTSTP,
        "TTIN" => Signal::SIGTTIN,
        "TTOU" => Signal::SIGTTOU,
        _ => anyhow::bail!("unrecognized signal name: {name:?}"),
    };
    Ok(sig)
}

/// Deliver `sig` to the child. When the child was given its own process
/// group, the whole group is targeted so grandchildren die with it.
pub fn deliver(pid: i32, sig: Signal, own_group: bool) -> anyhow::Result<()> {
    let target = Pid::from_raw(pid);
    let r = if own_group {
        killpg(target, sig)
    } else {
        kill(target, sig)
    };
    r.map_err(|e| anyhow::anyhow!("failed to deliver {sig} to pid {pid}: {e}"))
}

/// Signal-0 liveness probe.
pub fn process_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}
