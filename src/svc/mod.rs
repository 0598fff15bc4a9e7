pub mod asyncutil;
pub mod backends;
pub mod event;
pub mod manager;
pub mod options;
pub mod process;
pub mod service;
pub mod signals;
pub mod supervised;

pub use event::{EventEntry, EventLog};
pub use manager::ProcessManager;
pub use options::ConfigEntry;
pub use process::{Process, ProcessState};
pub use service::{Backend, BackendRegistry, Config, Program, Service, ServiceError};
pub use supervised::{SupervisedBackend, SupervisedService};
