//! Task definition model
//!
//! A task definition is a declarative description of one containerized unit
//! of work: what image to run, with which command, in which namespace, with
//! which volumes, and what causes it to produce a run.

pub mod descriptor;
pub mod trigger;
pub mod volume;

pub use descriptor::{TaskDescriptor, TaskDescriptorBuilder};
pub use trigger::Trigger;
pub use volume::{VolumeBinding, VolumeSource};
