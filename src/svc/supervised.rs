use crate::svc::event::EventLog;
use crate::svc::manager::ProcessManager;
use crate::svc::options::ConfigEntry;
use crate::svc::service::{Backend, Config, Program, Result, Service, ServiceError};
use std::sync::Arc;

/// The embedded supervisor as a backend: no host service manager involved,
/// the program runs as a supervised child of the calling process.
pub struct SupervisedBackend;

impl Backend for SupervisedBackend {
    fn name(&self) -> &'static str {
        "supervised-service"
    }

    /// Never auto-detected; chosen explicitly via `select(supervise=true)`
    /// or as the registry fallback.
    fn detect(&self) -> bool {
        false
    }

    fn interactive(&self) -> bool {
        false
    }

    fn build(&self, program: Arc<dyn Program>, config: Config) -> Result<Box<dyn Service>> {
        Ok(Box::new(SupervisedService::new(program, config)))
    }
}

/// Adapts one `Config` to a supervised `Process` registered in a private
/// `ProcessManager`, and dispatches the Service operations to it.
pub struct SupervisedService {
    program: Arc<dyn Program>,
    config: Config,
    manager: ProcessManager,
}

impl SupervisedService {
    pub fn new(program: Arc<dyn Program>, config: Config) -> Self {
        let s = Self {
            program,
            config,
            manager: ProcessManager::new(),
        };
        s.manager.create_process(s.parse_entry());
        s
    }

    /// Translate the caller's declaration into supervision policy. The child
    /// is always auto-(re)started and gets a generous retry budget; stderr is
    /// merged into stdout when no separate stderr path was given.
    fn parse_entry(&self) -> ConfigEntry {
        let stdout = self.config.option("stdout_logfile", "");
        let stderr = self.config.option("stderr_logfile", "");
        let redirect = stderr.is_empty();

        let mut entry = ConfigEntry::new(self.config.name.clone());
        entry.arguments = self.config.arguments.clone();
        entry.envs = self.config.envs.clone();
        let mut set = |k: &str, v: String| {
            entry.options.insert(k.to_string(), v);
        };
        set("command", self.config.executable.clone());
        set("stdout_logfile", stdout);
        set("stderr_logfile", stderr);
        set("user", self.config.user_name.clone());
        set("directory", self.config.working_directory.clone());
        set("redirect_stderr", redirect.to_string());
        set("autostart", "true".to_string());
        set("autorestart", "true".to_string());
        set("startretries", "10".to_string());
        entry
    }

    fn check_running(&self) -> Result<i32> {
        let p = self
            .manager
            .find(&self.config.name)
            .ok_or(ServiceError::NotInstalled)?;
        let mut pid = p.pid();
        if pid == 0 {
            p.attach().map_err(|_| ServiceError::NotRunning)?;
            pid = p.pid();
        }
        Ok(pid)
    }
}

impl Service for SupervisedService {
    fn install(&self) -> Result<()> {
        if let Some(p) = self.manager.find(&self.config.name) {
            p.start(false);
        }
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        if let Some(p) = self.manager.find(&self.config.name) {
            if p.pid() == 0 {
                let _ = p.attach();
            }
            p.stop(false);
        }
        Ok(())
    }

    fn update(&self) -> Result<()> {
        if let Some(p) = self.manager.find(&self.config.name) {
            p.stop(false);
            self.manager.remove(&self.config.name);
            let p = self.manager.create_process(self.parse_entry());
            p.start(false);
        }
        Ok(())
    }

    fn start(&self) -> Result<()> {
        let p = self
            .manager
            .find(&self.config.name)
            .ok_or(ServiceError::NotInstalled)?;
        if self.config.executable.is_empty() {
            return Err(anyhow::anyhow!("empty executable").into());
        }
        if p.attach().is_err() {
            p.start(false);
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let p = self
            .manager
            .find(&self.config.name)
            .ok_or(ServiceError::NotInstalled)?;
        p.stop(true);
        Ok(())
    }

    fn restart(&self) -> Result<()> {
        if let Some(p) = self.manager.find(&self.config.name) {
            p.stop(true);
            p.start(false);
        }
        Ok(())
    }

    fn run(&self) -> Result<()> {
        let p = self.manager.create_process(self.parse_entry());
        p.start(true);
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
        EventLog::for_program("service", self.config.name.clone())
    }

    fn label(&self) -> String {
        self.config.label()
    }
}
