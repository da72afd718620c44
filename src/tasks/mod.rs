//! Background Tasks Module
//!
//! Contains background tasks that run periodically during node operation.
//!
//! # Tasks
//! - Maintenance: adaptive TTL evaluation and pending-forward sweeps

mod maintenance;

pub use maintenance::spawn_maintenance_task;
