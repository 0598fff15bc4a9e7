use crate::svc::asyncutil::tasks;
use crate::svc::event::EventLog;
use crate::svc::options::ConfigEntry;
use crate::svc::signals;
use chrono::TimeZone;
use nix::sys::signal::Signal;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time as tokio_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
}

impl ProcessState {
    /// States in which a child is (believed to be) alive.
    fn is_live(self) -> bool {
        matches!(self, ProcessState::Starting | ProcessState::Running | ProcessState::Stopping)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Stopped => "STOPPED",
            ProcessState::Starting => "STARTING",
            ProcessState::Running => "RUNNING",
            ProcessState::Backoff => "BACKOFF",
            ProcessState::Stopping => "STOPPING",
            ProcessState::Exited => "EXITED",
            ProcessState::Fatal => "FATAL",
            ProcessState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct Inner {
    state: ProcessState,
    pid: Option<i32>,
    /// true when we spawned the child into its own process group; attach()ed
    /// children are signalled individually.
    own_pgroup: bool,
    exit_status: Option<ExitStatus>,
    stdin: Option<ChildStdin>,
    /// Unix epoch seconds; 0 when meaningless.
    start_time: i64,
    stop_time: i64,
    retry_times: i64,
}

/// One supervised program: spawn, promote STARTING to RUNNING after
/// `startsecs`, classify exits as BACKOFF/EXITED, retry up to `startretries`,
/// persist a `"<pid>:<epoch>"` pidfile, and escalate stop signals to SIGKILL.
///
/// The restart loop and the stop watchdog run as supervision tasks; every
/// other reader and writer goes through the one lock. `start(wait=true)` and
/// `stop(wait=true)` block the calling thread and must not be invoked from
/// async context.
pub struct Process {
    config: ConfigEntry,
    pidfile: PathBuf,
    in_start: AtomicBool,
    stop_by_user: AtomicBool,
    inner: RwLock<Inner>,
    log: EventLog,
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn format_epoch(secs: i64) -> String {
    match chrono::Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        _ => secs.to_string(),
    }
}

fn fire(ready: &mut Option<oneshot::Sender<()>>) {
    if let Some(tx) = ready.take() {
        let _ = tx.send(());
    }
}

/// Parse pidfile contents `"<pid>:<epoch>"`. Whitespace is tolerated; a
/// missing or malformed epoch degrades to 0 (unknown start time).
pub(crate) fn parse_pidfile(raw: &str) -> anyhow::Result<(i32, i64)> {
    let t = raw.trim();
    if t.is_empty() {
        anyhow::bail!("empty pid file");
    }
    let mut parts = t.splitn(2, ':');
    let pid: i32 = parts
        .next()
        .unwrap_or("")
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("malformed pid field in pid file: {e}"))?;
    let epoch: i64 = parts.next().and_then(|s| s.trim().parse().ok()).unwrap_or(0);
    Ok((pid, epoch))
}

fn apply_user(cmd: &mut Command, spec: &str) -> anyhow::Result<()> {
    if spec.is_empty() {
        return Ok(());
    }
    let (user, group) = match spec.split_once(':') {
        Some((u, g)) => (u, Some(g)),
        None => (spec, None),
    };
    let u = users::get_user_by_name(user).ok_or_else(|| anyhow::anyhow!("unknown user {user:?}"))?;
    let gid = match group {
        Some(g) if !g.is_empty() => users::get_group_by_name(g)
            .ok_or_else(|| anyhow::anyhow!("unknown group {g:?}"))?
            .gid(),
        _ => u.primary_group_id(),
    };
    cmd.uid(u.uid());
    cmd.gid(gid);
    Ok(())
}

fn open_append_log(path: &str) -> Option<File> {
    if path.is_empty() {
        return None;
    }
    OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o666)
        .open(path)
        .ok()
}

impl Process {
    pub fn new(config: ConfigEntry) -> Arc<Self> {
        let pidfile = config.pidfile_path();
        let log = EventLog::for_program("process", config.name.clone());
        Arc::new(Self {
            config,
            pidfile,
            in_start: AtomicBool::new(false),
            stop_by_user: AtomicBool::new(false),
            inner: RwLock::new(Inner {
                state: ProcessState::Stopped,
                pid: None,
                own_pgroup: false,
                exit_status: None,
                stdin: None,
                start_time: 0,
                stop_time: 0,
                retry_times: 0,
            }),
            log,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ConfigEntry {
        &self.config
    }

    pub fn pidfile(&self) -> &PathBuf {
        &self.pidfile
    }

    fn start_secs(&self) -> i64 {
        self.config.get_int("startsecs", 1)
    }

    fn start_retries(&self) -> i64 {
        self.config.get_int("startretries", 3)
    }

    pub(crate) fn auto_start(&self) -> bool {
        self.config.get_bool("autostart", true)
    }

    fn exit_codes(&self) -> Vec<i32> {
        self.config
            .get_string("exitcodes", "0,2")
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }

    /// Launch the restart loop. Idempotent while a loop is active. With
    /// `wait=true` the caller blocks until the first run attempt has finished
    /// spawning (not until the child exits).
    pub fn start(self: &Arc<Self>, wait: bool) {
        if self.in_start.swap(true, Ordering::SeqCst) {
            self.log.info("already started, not starting again");
            return;
        }
        self.stop_by_user.store(false, Ordering::SeqCst);

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let proc = Arc::clone(self);
        tasks().spawn(async move {
            proc.write().retry_times = 0;
            let mut ready = Some(ready_tx);
            loop {
                let p2 = Arc::clone(&proc);
                let tx = ready.take();
                let joined = tasks()
                    .spawn_blocking(move || {
                        let mut tx = tx;
                        p2.run_once(&mut tx);
                    })
                    .await;
                let _ = fs::remove_file(&proc.pidfile);
                if joined.is_err() {
                    break;
                }

                // Unrecoverable attempt (spawn/user failure): no retry.
                if proc.state() == ProcessState::Fatal {
                    break;
                }

                let (short, retries) = {
                    let mut g = proc.write();
                    let short = g.stop_time - g.start_time < proc.start_secs();
                    if short {
                        g.retry_times += 1;
                    } else {
                        g.retry_times = 0;
                    }
                    (short, g.retry_times)
                };

                if proc.stop_by_user.load(Ordering::SeqCst) {
                    proc.log.info("stopped by user, not restarting");
                    break;
                }
                if !proc.is_auto_restart() {
                    proc.log.info("exit does not qualify for restart, leaving it down");
                    break;
                }
                if short && retries >= proc.start_retries() {
                    proc.log
                        .info(format!("retry budget exhausted ({retries}), giving up"));
                    proc.write().state = ProcessState::Fatal;
                    break;
                }
                tokio_time::sleep(Duration::from_micros(100)).await;
            }
            proc.in_start.store(false, Ordering::SeqCst);
        });

        if wait {
            let _ = ready_rx.blocking_recv();
        }
    }

    /// One spawn/supervise attempt. Runs on the blocking pool; fires `ready`
    /// once spawning is settled so `start(wait=true)` unblocks promptly.
    fn run_once(&self, ready: &mut Option<oneshot::Sender<()>>) {
        let command = self.config.get_string("command", "");
        let mut argv = match shell_words::split(&command) {
            Ok(a) if !a.is_empty() => a,
            _ => {
                self.log.error(format!("command is empty or unparsable: {command:?}"));
                let mut g = self.write();
                g.state = ProcessState::Fatal;
                g.stop_time = now_unix();
                drop(g);
                fire(ready);
                return;
            }
        };

        {
            let g = self.read();
            if let Some(st) = g.exit_status {
                if st.continued() {
                    self.log.info("previous child still running, not starting again");
                    drop(g);
                    fire(ready);
                    return;
                }
            }
        }

        argv.extend(self.config.arguments.iter().cloned());

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);

        let user_spec = self.config.get_string("user", "");
        if let Err(e) = apply_user(&mut cmd, &user_spec) {
            self.log.error(format!("failed to run as user {user_spec:?}: {e}"));
            let mut g = self.write();
            g.state = ProcessState::Fatal;
            g.stop_time = now_unix();
            drop(g);
            fire(ready);
            return;
        }

        for (k, v) in &self.config.envs {
            cmd.env(k, v);
        }

        let dir = self.config.get_string("directory", "");
        if !dir.is_empty() {
            cmd.current_dir(&dir);
        }

        self.apply_log_redirection(&mut cmd);

        // Own process group, so stop signals reach grandchildren, and the
        // child dies with the supervisor.
        cmd.process_group(0);
        unsafe {
            cmd.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL as libc::c_ulong) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        cmd.stdin(Stdio::piped());

        let start_time = now_unix();
        {
            let mut g = self.write();
            g.start_time = start_time;
            g.stop_time = 0;
            g.exit_status = None;
            g.state = ProcessState::Starting;
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                self.log.error(format!(
                    "spawn argv={:?} failed: kind={:?} os_error={:?} err={e}",
                    argv,
                    e.kind(),
                    e.raw_os_error()
                ));
                let mut g = self.write();
                g.state = ProcessState::Fatal;
                g.stop_time = now_unix();
                drop(g);
                fire(ready);
                return;
            }
        };

        let pid = child.id() as i32;
        {
            let mut g = self.write();
            g.pid = Some(pid);
            g.own_pgroup = true;
            g.stdin = child.stdin.take();
        }
        if let Err(e) = fs::write(&self.pidfile, format!("{pid}:{start_time}")) {
            self.log
                .warn(format!("failed to write pidfile {}: {e}", self.pidfile.display()));
        }

        let start_secs = self.start_secs();
        if start_secs <= 0 {
            // startsecs=0: no minimum uptime, consider it started right away.
            self.write().state = ProcessState::Running;
            self.log.info(format!("pid={pid} entered RUNNING"));
        } else {
            // Watch the child through the startup window; one that dies
            // inside it never reaches RUNNING and is classified BACKOFF with
            // its real exit time.
            let window = Duration::from_secs(start_secs as u64);
            let entered = Instant::now();
            let mut early_exit: Option<ExitStatus> = None;
            while entered.elapsed() < window {
                match child.try_wait() {
                    Ok(Some(st)) => {
                        early_exit = Some(st);
                        break;
                    }
                    Ok(None) => std::thread::sleep(Duration::from_millis(50)),
                    Err(_) => break,
                }
            }
            if let Some(st) = early_exit {
                let mut g = self.write();
                g.stop_time = now_unix();
                g.pid = None;
                g.stdin = None;
                g.exit_status = Some(st);
                g.state = ProcessState::Backoff;
                drop(g);
                fire(ready);
                self.log
                    .info(format!("pid={pid} exited ({st}) during startup window, state=BACKOFF"));
                return;
            }
            self.write().state = ProcessState::Running;
            self.log
                .info(format!("pid={pid} entered RUNNING after {start_secs}s"));
        }

        // Unblock start(wait=true) before parking on the child.
        fire(ready);

        let status = child.wait();
        let mut g = self.write();
        g.stop_time = now_unix();
        g.pid = None;
        g.stdin = None;
        let rendered = match status {
            Ok(st) => {
                g.exit_status = Some(st);
                st.to_string()
            }
            Err(e) => format!("wait failed: {e}"),
        };
        let uptime = g.stop_time - g.start_time;
        g.state = if uptime < start_secs {
            ProcessState::Backoff
        } else {
            ProcessState::Exited
        };
        let state = g.state;
        drop(g);
        self.log
            .info(format!("pid={pid} exited ({rendered}) uptime={uptime}s state={state}"));
    }

    fn apply_log_redirection(&self, cmd: &mut Command) {
        let redirect = self.config.get_bool("redirect_stderr", false);
        let stdout_path = self.config.get_string("stdout_logfile", "/dev/null");
        // Open failure silently disables the stream; the child still runs.
        match open_append_log(&stdout_path) {
            Some(f) => {
                if redirect {
                    match f.try_clone() {
                        Ok(dup) => {
                            cmd.stderr(Stdio::from(dup));
                        }
                        Err(_) => {
                            cmd.stderr(Stdio::null());
                        }
                    }
                }
                cmd.stdout(Stdio::from(f));
            }
            None => {
                cmd.stdout(Stdio::null());
                if redirect {
                    cmd.stderr(Stdio::null());
                }
            }
        }
        if !redirect {
            let stderr_path = self.config.get_string("stderr_logfile", "/dev/null");
            match open_append_log(&stderr_path) {
                Some(f) => {
                    cmd.stderr(Stdio::from(f));
                }
                None => {
                    cmd.stderr(Stdio::null());
                }
            }
        }
    }

    /// Re-hydrate from the pidfile after a supervisor restart. On success the
    /// process is RUNNING with the recorded start time; any failure leaves the
    /// state at STOPPED (dead or garbled pidfile, which is removed) or UNKNOWN
    /// (unreadable pidfile) and returns the error.
    pub fn attach(&self) -> anyhow::Result<()> {
        let raw = match fs::read_to_string(&self.pidfile) {
            Ok(s) => s,
            Err(e) => {
                self.log
                    .warn(format!("cannot read pidfile {}: {e}", self.pidfile.display()));
                self.write().state = ProcessState::Unknown;
                anyhow::bail!("cannot read pidfile {}: {e}", self.pidfile.display());
            }
        };
        let (pid, epoch) = match parse_pidfile(&raw) {
            Ok(v) => v,
            Err(e) => {
                self.write().state = ProcessState::Stopped;
                let _ = fs::remove_file(&self.pidfile);
                return Err(e);
            }
        };
        if !signals::process_alive(pid) {
            self.log.warn(format!(
                "pid {pid} from {} is gone, removing stale pidfile",
                self.pidfile.display()
            ));
            self.write().state = ProcessState::Stopped;
            let _ = fs::remove_file(&self.pidfile);
            anyhow::bail!("process {pid} is not running");
        }
        {
            let mut g = self.write();
            g.pid = Some(pid);
            g.own_pgroup = false;
            g.exit_status = None;
            g.stdin = None;
            g.start_time = epoch;
            g.stop_time = 0;
            g.state = ProcessState::Running;
        }
        self.in_start.store(true, Ordering::SeqCst);
        self.log.info(format!("attached to pid={pid} start_time={epoch}"));
        Ok(())
    }

    /// Graceful stop: remove the pidfile, mark the stop as user-requested,
    /// deliver `stopsignal` (TERM by default), and arm a watchdog that
    /// escalates to SIGKILL after `stopwaitsecs`. With `wait=true` the caller
    /// blocks until the child has left the live states.
    pub fn stop(self: &Arc<Self>, wait: bool) {
        {
            let _g = self.read();
            let _ = fs::remove_file(&self.pidfile);
        }
        self.stop_by_user.store(true, Ordering::SeqCst);
        self.log.info("stop requested");

        match signals::to_signal(&self.config.get_string("stopsignal", "TERM")) {
            // Delivery errors are ignored: the watchdog force-kills anyway.
            Ok(sig) => {
                let _ = self.signal(sig);
            }
            Err(e) => self.log.warn(e.to_string()),
        }

        let wait_secs = self.config.get_int("stopwaitsecs", 10).max(0) as u64;
        let deadline = Instant::now() + Duration::from_secs(wait_secs);
        let proc = Arc::clone(self);
        tasks().spawn(async move {
            loop {
                if !proc.state().is_live() {
                    break;
                }
                if Instant::now() >= deadline {
                    proc.log.info("grace period expired, force killing");
                    let _ = proc.signal(Signal::SIGKILL);
                    break;
                }
                tokio_time::sleep(Duration::from_secs(1)).await;
            }
        });

        if wait {
            while self.state().is_live() {
                std::thread::sleep(Duration::from_secs(1));
            }
        }
    }

    /// Deliver an arbitrary signal to the child.
    pub fn signal(&self, sig: Signal) -> anyhow::Result<()> {
        let g = self.read();
        match g.pid {
            Some(pid) => signals::deliver(pid, sig, g.own_pgroup),
            None => anyhow::bail!("process is not started"),
        }
    }

    /// Write to the child's stdin pipe.
    pub fn send_stdin(&self, chars: &str) -> anyhow::Result<()> {
        let mut g = self.write();
        match g.stdin.as_mut() {
            Some(w) => {
                w.write_all(chars.as_bytes())?;
                Ok(())
            }
            None => anyhow::bail!("no stdin pipe available"),
        }
    }

    fn is_auto_restart(&self) -> bool {
        match self
            .config
            .get_string("autorestart", "unexpected")
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "false" => false,
            "true" => true,
            _ => {
                let g = self.read();
                match g.exit_status {
                    Some(st) => match st.code() {
                        Some(code) => !self.exit_codes().contains(&code),
                        // Signalled termination carries no exit code and
                        // counts as unexpected.
                        None => true,
                    },
                    None => false,
                }
            }
        }
    }

    /// 0 unless a child is live.
    pub fn pid(&self) -> i32 {
        let g = self.read();
        if g.state.is_live() {
            g.pid.unwrap_or(0)
        } else {
            0
        }
    }

    pub fn state(&self) -> ProcessState {
        self.read().state
    }

    /// Unix epoch seconds of the last spawn; 0 when never started.
    pub fn start_time(&self) -> i64 {
        self.read().start_time
    }

    /// Unix epoch seconds of the last exit; 0 while the child is live.
    pub fn stop_time(&self) -> i64 {
        let g = self.read();
        if g.state.is_live() {
            0
        } else {
            g.stop_time
        }
    }

    /// Exit code of the last run; 0 unless EXITED/BACKOFF or when the wait
    /// status is missing or carried no code.
    pub fn exit_status(&self) -> i32 {
        let g = self.read();
        if matches!(g.state, ProcessState::Exited | ProcessState::Backoff) {
            g.exit_status.and_then(|st| st.code()).unwrap_or(0)
        } else {
            0
        }
    }

    pub fn retry_times(&self) -> i64 {
        self.read().retry_times
    }

    pub fn stopped_by_user(&self) -> bool {
        self.stop_by_user.load(Ordering::SeqCst)
    }

    /// Human-readable status line: `"pid P, uptime D days, H:MM:SS"` while
    /// RUNNING, the stop timestamp for other non-STOPPED states.
    pub fn describe(&self) -> String {
        let g = self.read();
        match g.state {
            ProcessState::Running => {
                let pid = g.pid.unwrap_or(0);
                let seconds = (now_unix() - g.start_time).max(0);
                let minutes = seconds / 60;
                let hours = minutes / 60;
                let days = hours / 24;
                if days > 0 {
                    format!(
                        "pid {pid}, uptime {days} days, {}:{:02}:{:02}",
                        hours % 24,
                        minutes % 60,
                        seconds % 60
                    )
                } else {
                    format!(
                        "pid {pid}, uptime {}:{:02}:{:02}",
                        hours % 24,
                        minutes % 60,
                        seconds % 60
                    )
                }
            }
            ProcessState::Stopped => String::new(),
            _ => format_epoch(g.stop_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pidfile_round_trip() {
        let (pid, epoch) = parse_pidfile("1234:1700000000").unwrap();
        assert_eq!((pid, epoch), (1234, 1_700_000_000));
        let written = format!("{pid}:{epoch}");
        assert_eq!(parse_pidfile(&written).unwrap(), (pid, epoch));
    }

    #[test]
    fn pidfile_tolerates_whitespace_and_missing_epoch() {
        assert_eq!(parse_pidfile(" 42 : 99 \n").unwrap(), (42, 99));
        assert_eq!(parse_pidfile("42").unwrap(), (42, 0));
        assert_eq!(parse_pidfile("42:junk").unwrap(), (42, 0));
    }

    #[test]
    fn pidfile_rejects_empty_and_garbled() {
        assert!(parse_pidfile("").is_err());
        assert!(parse_pidfile("   \n").is_err());
        assert!(parse_pidfile("abc:123").is_err());
    }

    #[test]
    fn exit_codes_parse_with_invalid_entries_skipped() {
        let p = Process::new(ConfigEntry::new("x").with_option("exitcodes", "0, 2,oops,7"));
        assert_eq!(p.exit_codes(), vec![0, 2, 7]);
        let q = Process::new(ConfigEntry::new("y"));
        assert_eq!(q.exit_codes(), vec![0, 2]);
    }

    #[test]
    fn unexpected_restart_policy_consults_exit_codes() {
        let p = Process::new(
            ConfigEntry::new("x")
                .with_option("autorestart", "unexpected")
                .with_option("exitcodes", "0,2"),
        );
        p.write().exit_status = Some(ExitStatus::from_raw(7 << 8));
        assert!(p.is_auto_restart());
        p.write().exit_status = Some(ExitStatus::from_raw(2 << 8));
        assert!(!p.is_auto_restart());
        // SIGTERM: no exit code, counts as unexpected.
        p.write().exit_status = Some(ExitStatus::from_raw(15));
        assert!(p.is_auto_restart());
    }

    #[test]
    fn fixed_restart_policies() {
        let always = Process::new(ConfigEntry::new("a").with_option("autorestart", "true"));
        assert!(always.is_auto_restart());
        let never = Process::new(ConfigEntry::new("n").with_option("autorestart", "false"));
        assert!(!never.is_auto_restart());
    }

    #[test]
    fn pid_is_zero_outside_live_states() {
        let p = Process::new(ConfigEntry::new("x"));
        {
            let mut g = p.write();
            g.pid = Some(77);
            g.state = ProcessState::Exited;
        }
        assert_eq!(p.pid(), 0);
        p.write().state = ProcessState::Running;
        assert_eq!(p.pid(), 77);
    }

    #[test]
    fn exit_status_guarded_by_state() {
        let p = Process::new(ConfigEntry::new("x"));
        {
            let mut g = p.write();
            g.exit_status = Some(ExitStatus::from_raw(7 << 8));
            g.state = ProcessState::Running;
        }
        assert_eq!(p.exit_status(), 0);
        p.write().state = ProcessState::Exited;
        assert_eq!(p.exit_status(), 7);
        // BACKOFF after a spawn failure has no wait status: still 0, no panic.
        {
            let mut g = p.write();
            g.exit_status = None;
            g.state = ProcessState::Backoff;
        }
        assert_eq!(p.exit_status(), 0);
    }

    #[test]
    fn stop_time_hidden_while_live() {
        let p = Process::new(ConfigEntry::new("x"));
        {
            let mut g = p.write();
            g.stop_time = 12345;
            g.state = ProcessState::Running;
        }
        assert_eq!(p.stop_time(), 0);
        p.write().state = ProcessState::Exited;
        assert_eq!(p.stop_time(), 12345);
    }

    #[test]
    fn description_formats_uptime() {
        let p = Process::new(ConfigEntry::new("x"));
        {
            let mut g = p.write();
            g.state = ProcessState::Running;
            g.pid = Some(42);
            g.start_time = now_unix() - 3661;
        }
        let d = p.describe();
        assert!(d.starts_with("pid 42, uptime 1:01:0"), "{d}");

        p.write().start_time = now_unix() - (2 * 86_400 + 3661);
        let d = p.describe();
        assert!(d.starts_with("pid 42, uptime 2 days, 1:01:0"), "{d}");

        p.write().state = ProcessState::Stopped;
        assert_eq!(p.describe(), "");
    }

    #[test]
    fn state_names_render_upper_case() {
        assert_eq!(ProcessState::Backoff.to_string(), "BACKOFF");
        assert_eq!(ProcessState::Fatal.to_string(), "FATAL");
        assert_eq!(ProcessState::Running.to_string(), "RUNNING");
    }
}
