use chrono::Local;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

const EVENT_RING_MAX: usize = 2000;

static EVENTS: OnceLock<Mutex<VecDeque<EventEntry>>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct EventEntry {
    pub ts: String,
    pub component: String,
    pub program: Option<String>,
    pub message: String,
}

fn ring() -> &'static Mutex<VecDeque<EventEntry>> {
    EVENTS.get_or_init(|| Mutex::new(VecDeque::new()))
}

/// Emit one supervision event: printed to stderr so operators see it live,
/// and kept in a bounded in-memory ring for later inspection.
pub fn emit(component: &str, program: Option<&str>, msg: impl AsRef<str>) {
    let ts = Local::now().format("%Y-%m-%d_%H:%M:%S%.3f").to_string();
    match program {
        Some(p) => eprintln!("{ts} [{component}] program={p} {}", msg.as_ref()),
        None => eprintln!("{ts} [{component}] {}", msg.as_ref()),
    }
    let entry = EventEntry {
        ts,
        component: component.to_string(),
        program: program.map(|s| s.to_string()),
        message: msg.as_ref().to_string(),
    };
    let mut q = ring().lock().unwrap_or_else(|p| p.into_inner());
    q.push_back(entry);
    while q.len() > EVENT_RING_MAX {
        q.pop_front();
    }
}

/// Snapshot of the most recent `n` events, oldest first.
pub fn recent(n: usize) -> Vec<EventEntry> {
    let q = ring().lock().unwrap_or_else(|p| p.into_inner());
    q.iter().rev().take(n).rev().cloned().collect()
}

/// Component-scoped handle over the event sink. This is what the Service
/// contract hands out as its logger.
#[derive(Debug, Clone)]
pub struct EventLog {
    component: String,
    program: Option<String>,
}

impl EventLog {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            program: None,
        }
    }

    pub fn for_program(component: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            program: Some(program.into()),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        emit(&self.component, self.program.as_deref(), msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        emit(&self.component, self.program.as_deref(), format!("warn {}", msg.as_ref()));
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        emit(&self.component, self.program.as_deref(), format!("error {}", msg.as_ref()));
    }
}
