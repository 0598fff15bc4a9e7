use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();
static TRACKER: OnceLock<TaskTracker> = OnceLock::new();

/// Runtime hosting all supervision tasks (restart loops, stop watchdogs).
///
/// The public API is synchronous, so the crate owns its runtime instead of
/// borrowing the caller's. Built on first use.
pub(crate) fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("svc-supervisor")
            .build()
            .expect("build supervision runtime")
    })
}

pub(crate) fn tasks() -> &'static TaskTracker {
    TRACKER.get_or_init(TaskTracker::new)
}

/// Counts supervision tasks (async and blocking alike) so the crate can
/// report how much background work it has in flight.
#[derive(Debug, Clone, Default)]
pub struct TaskTracker {
    active: Arc<AtomicUsize>,
    spawned_total: Arc<AtomicUsize>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of tasks that are alive (running or pending).
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Total number of tasks ever spawned via this tracker.
    pub fn total_spawned(&self) -> usize {
        self.spawned_total.load(Ordering::SeqCst)
    }

    fn guard(&self) -> TaskGuard {
        self.spawned_total.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            counter: Arc::clone(&self.active),
        }
    }

    /// Spawn a task on the supervision runtime. The RAII guard decrements
    /// `active_count()` when the task ends, whether it completed, panicked,
    /// or was cancelled.
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.guard();
        runtime().spawn(async move {
            let _guard = guard;
            fut.await
        })
    }

    /// Spawn onto the supervision runtime's blocking pool.
    pub fn spawn_blocking<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.guard();
        runtime().spawn_blocking(move || {
            let _guard = guard;
            f()
        })
    }
}

#[derive(Debug)]
struct TaskGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_task_lifetimes() {
        let tracker = TaskTracker::new();
        let before = tracker.total_spawned();
        let h = tracker.spawn(async { 7 });
        let b = tracker.spawn_blocking(|| 8);
        assert_eq!(runtime().block_on(h).unwrap(), 7);
        assert_eq!(runtime().block_on(b).unwrap(), 8);
        assert_eq!(tracker.total_spawned(), before + 2);
        // Guards drop as tasks finish.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while tracker.active_count() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(tracker.active_count(), 0);
    }
}
