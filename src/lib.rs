//! kubetask - declarative containerized task definitions launched as
//! Kubernetes Jobs
//!
//! This library loads task definitions (built-in constants and YAML files in
//! a scan directory), validates them at load time, keeps them in a registry,
//! and launches trigger-driven runs by rendering Job manifests.

pub mod config;
pub mod definitions;
pub mod error;
pub mod kubernetes;
pub mod loader;
pub mod registry;
pub mod scheduler;
pub mod task;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use registry::TaskRegistry;
pub use scheduler::TaskScheduler;
pub use task::{TaskDescriptor, Trigger, VolumeBinding, VolumeSource};
