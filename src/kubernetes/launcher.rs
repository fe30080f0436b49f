//! Job submission
//!
//! The launcher is the seam between trigger evaluation and the cluster:
//! given a task descriptor it starts exactly one run. `KubectlLauncher`
//! pipes the rendered manifest to `kubectl apply`; `DryRunLauncher` only
//! logs it, for clusterless runs and tests.

use crate::error::{AppError, Result};
use crate::kubernetes::manifest::ManifestGenerator;
use crate::task::TaskDescriptor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Record of one submitted run
#[derive(Debug, Clone)]
pub struct LaunchReceipt {
    pub task_identifier: String,
    pub job_name: String,
    pub submitted_at: DateTime<Utc>,
}

/// Something that can start one run of a task
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, descriptor: &TaskDescriptor) -> Result<LaunchReceipt>;
}

/// Launcher that submits Job manifests through `kubectl apply -f -`
pub struct KubectlLauncher {
    kubectl_bin: String,
}

impl KubectlLauncher {
    pub fn new(kubectl_bin: impl Into<String>) -> Self {
        Self {
            kubectl_bin: kubectl_bin.into(),
        }
    }

    /// Apply a manifest by piping it to kubectl's stdin
    async fn apply_yaml(&self, yaml: &str) -> Result<()> {
        let mut cmd = Command::new(&self.kubectl_bin);
        cmd.args(["apply", "-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            AppError::KubernetesError(format!("Failed to spawn kubectl apply: {}", e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(yaml.as_bytes()).await.map_err(|e| {
                AppError::KubernetesError(format!("Failed to write manifest to kubectl: {}", e))
            })?;
            stdin.shutdown().await.map_err(|e| {
                AppError::KubernetesError(format!("Failed to close kubectl stdin: {}", e))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            AppError::KubernetesError(format!("Failed to wait for kubectl apply: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::KubernetesError(format!(
                "kubectl apply failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Launcher for KubectlLauncher {
    async fn launch(&self, descriptor: &TaskDescriptor) -> Result<LaunchReceipt> {
        let job_name = ManifestGenerator::generate_job_name(&descriptor.identifier);
        let yaml = ManifestGenerator::generate_named_job_yaml(descriptor, &job_name)?;

        match self.apply_yaml(&yaml).await {
            Ok(()) => {
                info!(
                    "🚀 Job submitted: {} (task: {}, namespace: {})",
                    job_name, descriptor.identifier, descriptor.target_namespace
                );
                Ok(LaunchReceipt {
                    task_identifier: descriptor.identifier.clone(),
                    job_name,
                    submitted_at: Utc::now(),
                })
            }
            Err(e) => {
                error!("❌ Failed to submit job for task {}: {}", descriptor.identifier, e);
                Err(e)
            }
        }
    }
}

/// Launcher that renders and logs the manifest without touching a cluster
#[derive(Default)]
pub struct DryRunLauncher;

impl DryRunLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for DryRunLauncher {
    async fn launch(&self, descriptor: &TaskDescriptor) -> Result<LaunchReceipt> {
        let job_name = ManifestGenerator::generate_job_name(&descriptor.identifier);
        let yaml = ManifestGenerator::generate_named_job_yaml(descriptor, &job_name)?;

        info!(
            "🧪 Dry run: would submit job {} for task {}",
            job_name, descriptor.identifier
        );
        debug!("Rendered manifest:\n{}", yaml);

        Ok(LaunchReceipt {
            task_identifier: descriptor.identifier.clone(),
            job_name,
            submitted_at: Utc::now(),
        })
    }
}
