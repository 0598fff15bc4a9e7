use crate::svc::backends::{probe_pidfile, run_command, stdin_interactive, wait_for_shutdown_signal};
use crate::svc::event::EventLog;
use crate::svc::service::{Backend, Config, Program, Result, Service, ServiceError};
use std::fmt::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ProcdBackend;

impl Backend for ProcdBackend {
    fn name(&self) -> &'static str {
        "linux-procd"
    }

    fn detect(&self) -> bool {
        PathBuf::from("/sbin/procd").exists()
    }

    fn interactive(&self) -> bool {
        stdin_interactive()
    }

    fn build(&self, program: Arc<dyn Program>, config: Config) -> Result<Box<dyn Service>> {
        Ok(Box::new(ProcdService { program, config }))
    }
}

/// OpenWrt procd backend: an init.d script delegates to procd, which keeps
/// the conventional pidfile under /var/run.
pub struct ProcdService {
    program: Arc<dyn Program>,
    config: Config,
}

impl ProcdService {
    fn script_path(&self) -> PathBuf {
        PathBuf::from(format!("/etc/init.d/{}", self.config.name))
    }

    fn pidfile_path(&self) -> PathBuf {
        PathBuf::from(format!("/var/run/{}.pid", self.config.name))
    }

    fn is_installed(&self) -> bool {
        self.script_path().exists()
    }

    fn render_script(&self) -> anyhow::Result<String> {
        let cmd = self.config.exec_path()?;
        let args = shell_words::join(self.config.arguments.iter().map(String::as_str));

        let mut s = String::new();
        writeln!(s, "#!/bin/sh /etc/rc.common")?;
        writeln!(s)?;
        writeln!(s, "# {} {}", self.config.name, self.config.description)?;
        writeln!(s, "USE_PROCD=1")?;
        writeln!(s, "START=120")?;
        writeln!(s, "STOP=120")?;
        writeln!(s)?;
        writeln!(s, "start_service() {{")?;
        writeln!(s, "  procd_open_instance")?;
        if args.is_empty() {
            writeln!(s, "  procd_set_param command {cmd}")?;
        } else {
            writeln!(s, "  procd_set_param command {cmd} {args}")?;
        }
        writeln!(s)?;
        writeln!(s, "  procd_set_param respawn")?;
        writeln!(s, "  procd_set_param limits core=\"unlimited\"")?;
        writeln!(s, "  procd_set_param stdout 1")?;
        writeln!(s, "  procd_set_param stderr 1")?;
        writeln!(s, "  procd_set_param pidfile /var/run/{}.pid", self.config.name)?;
        if !self.config.working_directory.is_empty() {
            writeln!(s, "  procd_set_param dir {}", self.config.working_directory)?;
        }
        if !self.config.user_name.is_empty() {
            let user = self
                .config
                .user_name
                .split(':')
                .next()
                .unwrap_or(&self.config.user_name);
            writeln!(s, "  procd_set_param user {user}")?;
        }
        if !self.config.envs.is_empty() {
            writeln!(s, "  procd_set_param env \\")?;
            let rendered: Vec<String> = self
                .config
                .envs
                .iter()
                .map(|(k, v)| format!("  {k}=\"{v}\""))
                .collect();
            writeln!(s, "{}", rendered.join(" \\\n"))?;
        }
        writeln!(s, "  procd_close_instance")?;
        writeln!(s, "}}")?;
        Ok(s)
    }

    fn check_running(&self) -> Result<i32> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        probe_pidfile(&self.pidfile_path())
    }

    fn script_call(&self, op: &str) -> Result<()> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        let path = self.script_path();
        run_command(&path.display().to_string(), &[op])?;
        Ok(())
    }
}

impl Service for ProcdService {
    /// The procd variant replaces an existing script instead of refusing.
    fn install(&self) -> Result<()> {
        if self.is_installed() {
            let _ = self.uninstall();
        }
        let path = self.script_path();
        let script = self.render_script()?;
        std::fs::write(&path, script)
            .map_err(|e| anyhow::anyhow!("failed to write init script {}: {e}", path.display()))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| anyhow::anyhow!("failed to chmod init script: {e}"))?;
        let _ = run_command(&path.display().to_string(), &["enable"]);
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        if !self.is_installed() {
            return Err(ServiceError::NotInstalled);
        }
        let _ = self.stop();
        let path = self.script_path();
        let _ = run_command(&path.display().to_string(), &["disable"]);
        std::fs::remove_file(&path)
            .map_err(|e| anyhow::anyhow!("failed to remove init script: {e}"))?;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        if self.is_installed() {
            self.uninstall()?;
        }
        self.install()
    }

    fn start(&self) -> Result<()> {
        self.script_call("start")
    }

    fn stop(&self) -> Result<()> {
        self.script_call("stop")
    }

    fn restart(&self) -> Result<()> {
        self.script_call("restart")
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
        EventLog::for_program("procd", self.config.name.clone())
    }

    fn label(&self) -> String {
        self.config.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Program for Noop {
        fn start(&self, _s: &dyn Service) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop(&self, _s: &dyn Service) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn service(config: Config) -> ProcdService {
        ProcdService {
            program: Arc::new(Noop),
            config,
        }
    }

    #[test]
    fn script_carries_command_pidfile_and_env() {
        let mut c = Config::new("sensor");
        c.description = "edge sensor".into();
        c.executable = "/usr/bin/sensor".into();
        c.arguments = vec!["--poll".into(), "5s".into()];
        c.user_name = "sensor:sensor".into();
        c.working_directory = "/srv/sensor".into();
        c.envs.insert("REGION".into(), "eu".into());
        let script = service(c).render_script().unwrap();
        assert!(script.starts_with("#!/bin/sh /etc/rc.common"));
        assert!(script.contains("USE_PROCD=1"));
        assert!(script.contains("procd_set_param command /usr/bin/sensor --poll 5s"));
        assert!(script.contains("procd_set_param pidfile /var/run/sensor.pid"));
        assert!(script.contains("procd_set_param dir /srv/sensor"));
        assert!(script.contains("procd_set_param user sensor\n"));
        assert!(script.contains("REGION=\"eu\""));
        assert!(script.contains("procd_set_param respawn"));
    }

    #[test]
    fn control_calls_on_missing_script_are_not_installed() {
        let s = service(Config::new("definitely-not-installed-svc"));
        assert!(s.start().unwrap_err().is_not_installed());
        assert!(s.stop().unwrap_err().is_not_installed());
        assert!(s.uninstall().unwrap_err().is_not_installed());
        assert!(s.pid().unwrap_err().is_not_installed());
    }

    #[test]
    fn paths_follow_platform_conventions() {
        let s = service(Config::new("web"));
        assert_eq!(s.script_path(), PathBuf::from("/etc/init.d/web"));
        assert_eq!(s.pidfile_path(), PathBuf::from("/var/run/web.pid"));
    }
}
