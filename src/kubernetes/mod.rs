//! Kubernetes integration
//!
//! Rendering task descriptors into Job manifests and submitting them to the
//! cluster. Everything past `kubectl apply` (scheduling onto nodes, volume
//! mounting, retries of failed pods) belongs to the cluster, not to us.

pub mod launcher;
pub mod manifest;

pub use launcher::{DryRunLauncher, KubectlLauncher, LaunchReceipt, Launcher};
pub use manifest::ManifestGenerator;
