use crate::svc::backends::{run_command, stdin_interactive, wait_for_shutdown_signal};
use crate::svc::event::EventLog;
use crate::svc::service::{Backend, Config, Program, Result, Service, ServiceError};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

pub struct SystemdBackend;

impl Backend for SystemdBackend {
    fn name(&self) -> &'static str {
        "linux-systemd"
    }

    fn detect(&self) -> bool {
        PathBuf::from("/run/systemd/system").exists()
    }

    fn interactive(&self) -> bool {
        stdin_interactive()
    }

    fn build(&self, program: Arc<dyn Program>, config: Config) -> Result<Box<dyn Service>> {
        Ok(Box::new(SystemdService { program, config }))
    }
}

pub struct SystemdService {
    program: Arc<dyn Program>,
    config: Config,
}

impl SystemdService {
    fn unit_name(&self) -> String {
        format!("{}.service", self.config.name)
    }

    fn unit_path(&self) -> PathBuf {
        PathBuf::from(format!("/etc/systemd/system/{}", self.unit_name()))
    }

    fn is_installed(&self) -> bool {
        self.unit_path().exists()
    }

    fn render_unit(&self) -> anyhow::Result<String> {
        let path = self.config.exec_path()?;
        // The executable field may carry arguments; split them off so the
        // condition line stays a bare path.
        let mut argv = shell_words::split(&path)
            .map_err(|e| anyhow::anyhow!("unparsable executable {path:?}: {e}"))?;
        anyhow::ensure!(!argv.is_empty(), "empty executable");
        let exe = argv.remove(0);
        argv.extend(self.config.arguments.iter().cloned());

        let exec_start = shell_words::join(std::iter::once(exe.as_str()).chain(argv.iter().map(String::as_str)));

        let mut unit = String::new();
        writeln!(unit, "[Unit]")?;
        writeln!(unit, "Description={}", self.config.description)?;
        writeln!(unit, "ConditionFileIsExecutable={exe}")?;
        writeln!(unit)?;
        writeln!(unit, "[Service]")?;
        writeln!(unit, "StartLimitInterval=5")?;
        writeln!(unit, "StartLimitBurst=10")?;
        writeln!(unit, "ExecStart={exec_start}")?;
        if !self.config.working_directory.is_empty() {
            writeln!(unit, "WorkingDirectory={}", self.config.working_directory)?;
        }
        if !self.config.user_name.is_empty() {
            // systemd has separate User=/Group= directives.
            match self.config.user_name.split_once(':') {
                Some((u, g)) => {
                    writeln!(unit, "User={u}")?;
                    writeln!(unit, "Group={g}")?;
                }
                None => writeln!(unit, "User={}", self.config.user_name)?,
            }
        }
        for (k, v) in &self.config.envs {
            writeln!(unit, "Environment=\"{k}={v}\"")?;
        }
        writeln!(unit, "Restart=always")?;
        writeln!(unit, "RestartSec=120")?;
        writeln!(unit, "EnvironmentFile=-/etc/sysconfig/{}", self.config.name)?;
        writeln!(unit)?;
        writeln!(unit, "[Install]")?;
        writeln!(unit, "WantedBy=multi-user.target")?;
        Ok(unit)
    }

    fn check_running(&self) -> Result<i32> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        let out = run_command("systemctl", &["status", &self.unit_name()])
            .map_err(|_| ServiceError::NotRunning)?;
        if !out.contains("Active: active") {
            return Err(ServiceError::NotRunning);
        }
        out.split("Main PID: ")
            .nth(1)
            .and_then(|rest| {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits.parse().ok()
            })
            .ok_or(ServiceError::NotRunning)
    }
}

impl Service for SystemdService {
    fn install(&self) -> Result<()> {
        let path = self.unit_path();
        if path.exists() {
            return Err(anyhow::anyhow!("Init already exists: {}", path.display()).into());
        }
        let unit = self.render_unit()?;
        std::fs::write(&path, unit)
            .map_err(|e| anyhow::anyhow!("failed to write unit {}: {e}", path.display()))?;
        run_command("systemctl", &["enable", &self.unit_name()])?;
        run_command("systemctl", &["daemon-reload"])?;
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        run_command("systemctl", &["disable", &self.unit_name()])?;
        std::fs::remove_file(self.unit_path())
            .map_err(|e| anyhow::anyhow!("failed to remove unit: {e}"))?;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        run_command("systemctl", &["daemon-reload"])?;
        run_command("systemctl", &["enable", &self.unit_name()])?;
        Ok(())
    }

    fn start(&self) -> Result<()> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        run_command("systemctl", &["start", &self.unit_name()])?;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        run_command("systemctl", &["stop", &self.unit_name()])?;
        Ok(())
    }

    fn restart(&self) -> Result<()> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        run_command("systemctl", &["restart", &self.unit_name()])?;
        Ok(())
    }

    fn run(&self) -> Result<()> {
        self.program.start(self)?;
        wait_for_shutdown_signal()?;
        self.program.stop(self).map_err(ServiceError::from)
    }

    fn status(&self) -> Result<String> {
        let pid = self.check_running()?;
        Ok(format!("running (pid: {pid})"))
    }

    fn pid(&self) -> Result<i32> {
        self.check_running()
    }

    fn logger(&self) -> EventLog {
        EventLog::for_program("systemd", self.config.name.clone())
    }

    fn label(&self) -> String {
        self.config.label()
    }
}
