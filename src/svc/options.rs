use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One supervised program's configuration: explicit fields plus a free-form
/// string option map carrying supervision policy (`command`, `directory`,
/// `autorestart`, `startsecs`, ...). Immutable after construction; unknown
/// or malformed option values fall back to the accessor's default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_dir: None,
            arguments: Vec::new(),
            envs: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn has_parameter(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn get_string(&self, key: &str, def: &str) -> String {
        match self.options.get(key) {
            Some(s) => s.clone(),
            None => def.to_string(),
        }
    }

    /// Tolerant bool: `true/false`, `1/0`, `yes/no`, case-insensitive.
    pub fn get_bool(&self, key: &str, def: bool) -> bool {
        let Some(v) = self.options.get(key) else {
            return def;
        };
        match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => def,
        }
    }

    pub fn get_int(&self, key: &str, def: i64) -> i64 {
        match self.options.get(key) {
            Some(v) => v.trim().parse().unwrap_or(def),
            None => def,
        }
    }

    /// Missing key yields an empty vec, not the separator-split of "".
    pub fn get_string_array(&self, key: &str, sep: &str) -> Vec<String> {
        match self.options.get(key) {
            Some(v) => v.split(sep).map(|s| s.to_string()).collect(),
            None => Vec::new(),
        }
    }

    /// Int with size suffix recognition: trailing `KB`/`MB`/`GB` multiply by
    /// 1024/1024^2/1024^3; no suffix means a raw int.
    pub fn get_bytes(&self, key: &str, def: i64) -> i64 {
        let Some(v) = self.options.get(key) else {
            return def;
        };
        let v = v.trim();
        let (num, factor) = if let Some(n) = v.strip_suffix("KB") {
            (n, 1024)
        } else if let Some(n) = v.strip_suffix("MB") {
            (n, 1024 * 1024)
        } else if let Some(n) = v.strip_suffix("GB") {
            (n, 1024 * 1024 * 1024)
        } else {
            (v, 1)
        };
        num.trim().parse::<i64>().map(|n| n * factor).unwrap_or(def)
    }

    /// Environment rendered as `KEY=VALUE` strings. Duplicates cannot occur
    /// because the source is a map; order follows the map.
    pub fn get_env(&self) -> Vec<String> {
        self.envs.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// `<directory>/<name>.pid`; the pidfile sits in the working directory.
    pub fn pidfile_path(&self) -> PathBuf {
        Path::new(&self.get_string("directory", "")).join(format!("{}.pid", self.name))
    }
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "configDir={}",
            self.config_dir.as_deref().unwrap_or_else(|| Path::new("")).display()
        )?;
        for (k, v) in &self.options {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

// -------- YAML program definition (grouped; strict) --------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramFile {
    #[serde(default)]
    program: Option<String>,
    process: ProcessSection,
    #[serde(default)]
    supervise: Option<SuperviseSection>,
    #[serde(default)]
    logs: Option<LogsSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcessSection {
    command: String,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    environment: Vec<EnvironmentVar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuperviseSection {
    #[serde(default)]
    autostart: Option<bool>,
    /// "true" | "false" | "unexpected"
    #[serde(default)]
    autorestart: Option<String>,
    #[serde(default)]
    startsecs: Option<i64>,
    #[serde(default)]
    startretries: Option<i64>,
    /// csv of expected exit codes, e.g. "0,2"
    #[serde(default)]
    exitcodes: Option<String>,
    #[serde(default)]
    stopsignal: Option<String>,
    #[serde(default)]
    stopwaitsecs: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogsSection {
    #[serde(default)]
    stdout: Option<PathBuf>,
    #[serde(default)]
    stderr: Option<PathBuf>,
    #[serde(default)]
    redirect_stderr: Option<bool>,
}

impl ProgramFile {
    fn into_entry(self, source_file: Option<&Path>) -> anyhow::Result<ConfigEntry> {
        let name = match self.program {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => {
                let sf = source_file.ok_or_else(|| {
                    anyhow::anyhow!("missing program name and no source file to derive it from")
                })?;
                let derived = sf
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                anyhow::ensure!(
                    !derived.trim().is_empty(),
                    "missing program name and could not derive from filename {}",
                    sf.display()
                );
                derived
            }
        };
        anyhow::ensure!(
            !self.process.command.trim().is_empty(),
            "program {name}: process.command must not be empty"
        );

        let mut entry = ConfigEntry::new(name);
        entry.config_dir = source_file.and_then(|p| p.parent()).map(|p| p.to_path_buf());
        entry.arguments = self.process.arguments;
        for ev in self.process.environment {
            entry.envs.insert(ev.name, ev.value);
        }

        let mut set = |k: &str, v: String| {
            entry.options.insert(k.to_string(), v);
        };
        set("command", self.process.command);
        if let Some(d) = self.process.directory {
            set("directory", d.display().to_string());
        }
        if let Some(u) = self.process.user {
            set("user", u);
        }
        if let Some(sv) = self.supervise {
            if let Some(v) = sv.autostart {
                set("autostart", v.to_string());
            }
            if let Some(v) = sv.autorestart {
                let t = v.trim().to_ascii_lowercase();
                anyhow::ensure!(
                    matches!(t.as_str(), "true" | "false" | "unexpected"),
                    "supervise.autorestart must be true|false|unexpected, got {v:?}"
                );
                set("autorestart", t);
            }
            if let Some(v) = sv.startsecs {
                set("startsecs", v.to_string());
            }
            if let Some(v) = sv.startretries {
                set("startretries", v.to_string());
            }
            if let Some(v) = sv.exitcodes {
                set("exitcodes", v);
            }
            if let Some(v) = sv.stopsignal {
                set("stopsignal", v);
            }
            if let Some(v) = sv.stopwaitsecs {
                set("stopwaitsecs", v.to_string());
            }
        }
        if let Some(logs) = self.logs {
            if let Some(p) = logs.stdout {
                set("stdout_logfile", p.display().to_string());
            }
            if let Some(p) = logs.stderr {
                set("stderr_logfile", p.display().to_string());
            }
            if let Some(v) = logs.redirect_stderr {
                set("redirect_stderr", v.to_string());
            }
        }
        Ok(entry)
    }
}

pub fn parse_program_yaml(raw: &str, source_file: Option<&Path>) -> anyhow::Result<ConfigEntry> {
    let file: ProgramFile = serde_yaml::from_str(raw).map_err(|e| match source_file {
        Some(p) => anyhow::anyhow!("failed to parse program definition {}: {e}", p.display()),
        None => anyhow::anyhow!("failed to parse program definition: {e}"),
    })?;
    file.into_entry(source_file)
}

pub fn load_program_file(path: &Path) -> anyhow::Result<ConfigEntry> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read program definition {}: {e}", path.display()))?;
    parse_program_yaml(&raw, Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ConfigEntry {
        let mut e = ConfigEntry::new("demo");
        e.options.insert("command".into(), "/bin/sleep".into());
        e.options.insert("startsecs".into(), "5".into());
        e.options.insert("autostart".into(), "FALSE".into());
        e.options.insert("exitcodes".into(), "0,2,7".into());
        e.options.insert("logsize".into(), "2MB".into());
        e.options.insert("cache".into(), "3KB".into());
        e.options.insert("junk".into(), "not-a-number".into());
        e.envs.insert("A".into(), "1".into());
        e.envs.insert("B".into(), "two".into());
        e
    }

    #[test]
    fn typed_getters_with_defaults() {
        let e = entry();
        assert_eq!(e.get_string("command", ""), "/bin/sleep");
        assert_eq!(e.get_string("missing", "fallback"), "fallback");
        assert_eq!(e.get_int("startsecs", 1), 5);
        assert_eq!(e.get_int("junk", 9), 9);
        assert!(!e.get_bool("autostart", true));
        assert!(e.get_bool("missing", true));
        assert!(e.get_bool("junk", true));
        assert_eq!(e.get_string_array("exitcodes", ","), vec!["0", "2", "7"]);
        assert!(e.get_string_array("missing", ",").is_empty());
        assert!(e.has_parameter("command"));
        assert!(!e.has_parameter("nope"));
    }

    #[test]
    fn byte_suffixes() {
        let e = entry();
        assert_eq!(e.get_bytes("logsize", 0), 2 * 1024 * 1024);
        assert_eq!(e.get_bytes("cache", 0), 3 * 1024);
        assert_eq!(e.get_bytes("startsecs", 0), 5);
        assert_eq!(e.get_bytes("junk", 42), 42);
        assert_eq!(e.get_bytes("missing", 7), 7);
    }

    #[test]
    fn env_rendering() {
        let e = entry();
        let env = e.get_env();
        assert!(env.contains(&"A=1".to_string()));
        assert!(env.contains(&"B=two".to_string()));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn pidfile_path_under_directory() {
        let mut e = entry();
        e.options.insert("directory".into(), "/tmp/work".into());
        assert_eq!(e.pidfile_path(), PathBuf::from("/tmp/work/demo.pid"));
    }

    #[test]
    fn yaml_program_definition() {
        let raw = r#"
program: web
process:
  command: /usr/bin/httpd
  arguments: ["-f", "httpd.conf"]
  directory: /srv/web
  user: www:www
  environment:
    - name: PORT
      value: "8080"
supervise:
  autorestart: unexpected
  startsecs: 2
  startretries: 5
  exitcodes: "0,2"
  stopsignal: TERM
  stopwaitsecs: 8
logs:
  stdout: /var/log/web.out
  redirect_stderr: true
"#;
        let e = parse_program_yaml(raw, None).unwrap();
        assert_eq!(e.name, "web");
        assert_eq!(e.arguments, vec!["-f", "httpd.conf"]);
        assert_eq!(e.get_string("command", ""), "/usr/bin/httpd");
        assert_eq!(e.get_string("user", ""), "www:www");
        assert_eq!(e.get_int("startretries", 3), 5);
        assert_eq!(e.get_int("stopwaitsecs", 10), 8);
        assert!(e.get_bool("redirect_stderr", false));
        assert_eq!(e.envs.get("PORT").map(String::as_str), Some("8080"));
    }

    #[test]
    fn yaml_name_derived_from_filename() {
        let raw = "process:\n  command: /bin/true\n";
        let e = parse_program_yaml(raw, Some(Path::new("/etc/svc/worker.yml"))).unwrap();
        assert_eq!(e.name, "worker");
    }

    #[test]
    fn yaml_rejects_unknown_fields_and_bad_autorestart() {
        assert!(parse_program_yaml("process:\n  command: x\n  bogus: 1\n", None).is_err());
        let raw = "program: p\nprocess:\n  command: x\nsupervise:\n  autorestart: sometimes\n";
        assert!(parse_program_yaml(raw, None).is_err());
    }
}
