pub mod gate;
pub mod scheduler;

pub use gate::{AdmissionGate, GateGuard};
pub use scheduler::{MaintenanceScheduler, SchedulerHandle};
