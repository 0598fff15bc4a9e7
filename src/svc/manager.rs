use crate::svc::event::EventLog;
use crate::svc::options::ConfigEntry;
use crate::svc::process::Process;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe registry of named processes. One mutex covers the map; no
/// other lock nests inside it (lock order: manager, then process).
pub struct ProcessManager {
    procs: Mutex<HashMap<String, Arc<Process>>>,
    log: EventLog,
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            procs: Mutex::new(HashMap::new()),
            log: EventLog::new("manager"),
        }
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, Arc<Process>>> {
        self.procs.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a process for `config.name`. Idempotent: an existing entry is
    /// returned unchanged, never replaced.
    pub fn create_process(&self, config: ConfigEntry) -> Arc<Process> {
        let mut procs = self.guard();
        let name = config.name.clone();
        let proc = procs
            .entry(name.clone())
            .or_insert_with(|| Process::new(config))
            .clone();
        drop(procs);
        self.log.info(format!("create process: {name}"));
        proc
    }

    /// Unconditional insert/overwrite.
    pub fn add(&self, name: impl Into<String>, proc: Arc<Process>) {
        let name = name.into();
        self.guard().insert(name.clone(), proc);
        self.log.info(format!("add process: {name}"));
    }

    /// Delete and return the removed entry. Removal does not stop the child;
    /// callers stop it first if they want termination.
    pub fn remove(&self, name: &str) -> Option<Arc<Process>> {
        let removed = self.guard().remove(name);
        self.log.info(format!("remove process: {name}"));
        removed
    }

    /// Exact-name lookup; on a miss, `"group:program"` addressing retries
    /// with the part after the colon.
    pub fn find(&self, name: &str) -> Option<Arc<Process>> {
        let procs = self.guard();
        if let Some(p) = procs.get(name) {
            return Some(p.clone());
        }
        name.split_once(':')
            .and_then(|(_, short)| procs.get(short).cloned())
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Snapshot the registered processes, release the lock, then invoke `f`
    /// on each, so `f` may call back into the manager without deadlock.
    pub fn for_each_process(&self, mut f: impl FnMut(&Arc<Process>)) {
        let snapshot: Vec<Arc<Process>> = self.guard().values().cloned().collect();
        for proc in &snapshot {
            f(proc);
        }
    }

    pub fn start_auto_start_programs(&self) {
        self.for_each_process(|p| {
            if p.auto_start() {
                p.start(false);
            }
        });
    }

    pub fn stop_all_processes(&self) {
        self.for_each_process(|p| p.stop(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(name: &str) -> ConfigEntry {
        ConfigEntry::new(name).with_option("command", "/bin/true")
    }

    #[test]
    fn create_is_idempotent_on_name() {
        let pm = ProcessManager::new();
        let a = pm.create_process(cfg("svc"));
        let b = pm.create_process(cfg("svc").with_option("command", "/bin/false"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pm.len(), 1);
        assert_eq!(b.config().get_string("command", ""), "/bin/true");
    }

    #[test]
    fn find_supports_group_addressing() {
        let pm = ProcessManager::new();
        pm.create_process(cfg("web"));
        assert!(pm.find("web").is_some());
        assert!(pm.find("frontend:web").is_some());
        assert!(pm.find("frontend:api").is_none());
        assert!(pm.find("api").is_none());
        let direct = pm.find("web").unwrap();
        let grouped = pm.find("anything:web").unwrap();
        assert!(Arc::ptr_eq(&direct, &grouped));
    }

    #[test]
    fn remove_returns_entry_and_clear_empties() {
        let pm = ProcessManager::new();
        pm.create_process(cfg("a"));
        pm.create_process(cfg("b"));
        let removed = pm.remove("a");
        assert!(removed.is_some());
        assert_eq!(removed.unwrap().name(), "a");
        assert!(pm.remove("a").is_none());
        pm.clear();
        assert!(pm.is_empty());
    }

    #[test]
    fn add_overwrites_existing_entry() {
        let pm = ProcessManager::new();
        let first = pm.create_process(cfg("svc"));
        let replacement = Process::new(cfg("svc").with_option("command", "/bin/sleep"));
        pm.add("svc", replacement.clone());
        let found = pm.find("svc").unwrap();
        assert!(Arc::ptr_eq(&found, &replacement));
        assert!(!Arc::ptr_eq(&found, &first));
    }

    #[test]
    fn for_each_snapshot_allows_reentrant_manager_calls() {
        let pm = ProcessManager::new();
        pm.create_process(cfg("a"));
        pm.create_process(cfg("b"));
        let mut seen = Vec::new();
        pm.for_each_process(|p| {
            // Callback touches the manager again; must not deadlock.
            assert!(pm.find(p.name()).is_some());
            seen.push(p.name().to_string());
        });
        seen.sort();
        assert_eq!(seen, vec!["a", "b"]);
    }
}
