use crate::svc::event::EventLog;
use crate::svc::supervised::SupervisedBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Errors every backend distinguishes by identity. Callers commonly treat
/// the two sentinels as "nothing to do".
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service is not installed")]
    NotInstalled,
    #[error("service is not running")]
    NotRunning,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn is_not_installed(&self) -> bool {
        matches!(self, ServiceError::NotInstalled)
    }

    pub fn is_not_running(&self) -> bool {
        matches!(self, ServiceError::NotRunning)
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Declaration of the program to be managed as a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Executable to manage; empty means the current executable.
    #[serde(default)]
    pub executable: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub working_directory: String,
    /// `user` or `user:group` to run as.
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
    /// Free-form backend options (e.g. `stdout_logfile`, `stderr_logfile`).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read service config {}: {e}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse service config {}: {e}", path.display()))?;
        anyhow::ensure!(!cfg.name.trim().is_empty(), "service config {}: name must not be empty", path.display());
        Ok(cfg)
    }

    pub fn option(&self, key: &str, def: &str) -> String {
        self.options.get(key).cloned().unwrap_or_else(|| def.to_string())
    }

    /// The executable to run: the configured one, or the current binary.
    pub fn exec_path(&self) -> anyhow::Result<String> {
        if !self.executable.is_empty() {
            return Ok(self.executable.clone());
        }
        let exe = std::env::current_exe()?;
        Ok(exe.display().to_string())
    }

    pub fn label(&self) -> String {
        if !self.display_name.is_empty() {
            self.display_name.clone()
        } else {
            self.name.clone()
        }
    }
}

/// Consumer hooks invoked around a `run` lifecycle.
pub trait Program: Send + Sync {
    fn start(&self, service: &dyn Service) -> anyhow::Result<()>;
    fn stop(&self, service: &dyn Service) -> anyhow::Result<()>;
}

/// Uniform contract satisfied by every backend: the embedded supervisor and
/// the native service managers are interchangeable at the call site.
pub trait Service: Send + Sync {
    /// Register the program with the host (or start supervising it).
    fn install(&self) -> Result<()>;
    fn uninstall(&self) -> Result<()>;
    /// Re-apply the current configuration.
    fn update(&self) -> Result<()>;
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn restart(&self) -> Result<()>;
    /// Foreground lifecycle: consumer start hook, park, consumer stop hook.
    fn run(&self) -> Result<()>;
    fn status(&self) -> Result<String>;
    fn pid(&self) -> Result<i32>;
    fn logger(&self) -> EventLog;
    /// Host-side log sink. Syslog/event-log integration is a collaborator
    /// concern; every backend logs through the shared event sink.
    fn system_logger(&self) -> EventLog {
        self.logger()
    }
    /// Display name, falling back to the service name.
    fn label(&self) -> String;
}

/// A way of managing services on this host.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;
    /// Probe well-known filesystem paths for this service manager.
    fn detect(&self) -> bool;
    fn interactive(&self) -> bool;
    fn build(&self, program: Arc<dyn Program>, config: Config) -> Result<Box<dyn Service>>;
}

/// Explicit, ordered backend selection. Supervision is an argument, not a
/// process-wide flag, and nothing registers itself during module init.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
    embedded: SupervisedBackend,
}

impl BackendRegistry {
    /// Registry with no native backends; `select` always yields the embedded
    /// supervisor.
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
            embedded: SupervisedBackend,
        }
    }

    /// The native backends for this platform, in detection order.
    pub fn native() -> Self {
        Self {
            backends: vec![
                Box::new(crate::svc::backends::systemd::SystemdBackend),
                Box::new(crate::svc::backends::procd::ProcdBackend),
            ],
            embedded: SupervisedBackend,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Pick the active backend. `supervise=true` forces the embedded
    /// supervisor; otherwise the first backend whose probe succeeds wins,
    /// with the embedded supervisor as the fallback.
    pub fn select(&self, supervise: bool) -> &dyn Backend {
        if supervise {
            return &self.embedded;
        }
        for b in &self.backends {
            if b.detect() {
                return b.as_ref();
            }
        }
        &self.embedded
    }

    pub fn new_service(
        &self,
        program: Arc<dyn Program>,
        config: Config,
        supervise: bool,
    ) -> Result<Box<dyn Service>> {
        self.select(supervise).build(program, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Program for Noop {
        fn start(&self, _service: &dyn Service) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop(&self, _service: &dyn Service) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sentinels_are_identity_matchable() {
        let e: ServiceError = ServiceError::NotRunning;
        assert!(e.is_not_running());
        assert!(!e.is_not_installed());
        let other: ServiceError = anyhow::anyhow!("boom").into();
        assert!(!other.is_not_running());
        assert!(!other.is_not_installed());
    }

    #[test]
    fn supervise_flag_forces_embedded_backend() {
        let reg = BackendRegistry::native();
        let b = reg.select(true);
        assert_eq!(b.name(), "supervised-service");
        assert!(!b.interactive());
    }

    #[test]
    fn empty_registry_falls_back_to_embedded() {
        let reg = BackendRegistry::empty();
        assert_eq!(reg.select(false).name(), "supervised-service");
        let svc = reg
            .new_service(
                Arc::new(Noop),
                Config {
                    name: "demo".into(),
                    executable: "/bin/sleep".into(),
                    arguments: vec!["600".into()],
                    ..Config::default()
                },
                false,
            )
            .unwrap();
        assert_eq!(svc.label(), "demo");
    }

    #[test]
    fn config_label_prefers_display_name() {
        let mut c = Config::new("raw");
        assert_eq!(c.label(), "raw");
        c.display_name = "Pretty Name".into();
        assert_eq!(c.label(), "Pretty Name");
    }

    #[test]
    fn exec_path_falls_back_to_current_exe() {
        let c = Config::new("x");
        let p = c.exec_path().unwrap();
        assert!(!p.is_empty());
        let mut c = c;
        c.executable = "/usr/bin/env".into();
        assert_eq!(c.exec_path().unwrap(), "/usr/bin/env");
    }

    #[test]
    fn config_loads_from_yaml() {
        let raw = r#"
name: agent
display_name: Demo Agent
executable: /usr/bin/agent
arguments: ["--verbose"]
working_directory: /var/lib/agent
user_name: "agent:agent"
envs:
  MODE: prod
options:
  stdout_logfile: /var/log/agent.out
"#;
        let cfg: Config = serde_yaml::from_str(raw).unwrap();
        assert_eq!(cfg.name, "agent");
        assert_eq!(cfg.arguments, vec!["--verbose"]);
        assert_eq!(cfg.option("stdout_logfile", ""), "/var/log/agent.out");
        assert_eq!(cfg.option("missing", "d"), "d");
        assert_eq!(cfg.envs.get("MODE").map(String::as_str), Some("prod"));
    }
}
