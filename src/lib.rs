//! Install programs as first-class services of the host's native service
//! manager (systemd, OpenWrt procd), or run them under an embedded
//! supervisor with restart/backoff policy, pidfile re-attachment, and
//! graceful-stop escalation. Both paths expose the same [`svc::Service`]
//! contract, selected through an explicit [`svc::BackendRegistry`].

pub mod svc;

pub use svc::{
    Backend, BackendRegistry, Config, ConfigEntry, Process, ProcessManager, ProcessState, Program,
    Service, ServiceError,
};
