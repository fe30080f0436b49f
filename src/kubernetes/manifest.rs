//! Kubernetes Job manifest generation
//!
//! Renders one task descriptor into a batch/v1 Job manifest with the
//! descriptor's volumes and mounts wired through. Read-only bindings are
//! marked readOnly on both the claim reference and the container mount.

use crate::error::{AppError, Result};
use crate::task::{TaskDescriptor, VolumeBinding, VolumeSource};
use tracing::debug;
use uuid::Uuid;

/// Manifest generator for task runs
pub struct ManifestGenerator;

impl ManifestGenerator {
    /// Generate a Kubernetes Job manifest for one run of the task, with a
    /// freshly generated job name.
    pub fn generate_job_yaml(descriptor: &TaskDescriptor) -> Result<String> {
        let job_name = Self::generate_job_name(&descriptor.identifier);
        Self::generate_named_job_yaml(descriptor, &job_name)
    }

    /// Generate a Job manifest under a caller-chosen job name
    pub fn generate_named_job_yaml(descriptor: &TaskDescriptor, job_name: &str) -> Result<String> {
        debug!("🏗️ Generating Job manifest for task: {}", descriptor.identifier);

        let command = Self::build_command(&descriptor.command)?;
        let volume_mounts = Self::build_volume_mounts(&descriptor.volume_bindings);
        let volumes = Self::build_volumes(&descriptor.volume_bindings);

        let yaml = format!(
            r#"apiVersion: batch/v1
kind: Job
metadata:
  name: {job_name}
  namespace: {namespace}
  labels:
    app: kubetask
    task: {task_label}
  annotations:
    kubetask.io/task-identifier: "{identifier}"
    kubetask.io/owner: "{owner}"
spec:
  ttlSecondsAfterFinished: 300
  backoffLimit: 1
  template:
    metadata:
      labels:
        app: kubetask
        task: {task_label}
    spec:
      restartPolicy: Never
      containers:
      - name: task
        image: {image}
        command: {command}
        {volume_mounts}
      {volumes}
"#,
            job_name = job_name,
            namespace = descriptor.target_namespace,
            task_label = Self::sanitize_label(&descriptor.identifier),
            identifier = Self::escape_yaml_string(&descriptor.identifier),
            owner = Self::escape_yaml_string(&descriptor.owner),
            image = descriptor.container_image,
            command = command,
            volume_mounts = volume_mounts,
            volumes = volumes,
        );

        Self::validate_yaml_syntax(&yaml)?;

        debug!("✅ Generated Job manifest ({} bytes)", yaml.len());
        Ok(yaml)
    }

    /// Generate a valid Kubernetes job name: sanitized identifier plus a
    /// unique suffix so repeated runs never collide.
    pub fn generate_job_name(identifier: &str) -> String {
        let sanitized = identifier
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .take(48)
            .collect::<String>()
            .trim_matches('-')
            .to_string();

        let uuid_suffix = Uuid::new_v4().to_string()[..8].to_string();
        format!("task-{}-{}", sanitized, uuid_suffix)
    }

    /// Sanitize string for use as a Kubernetes label value
    fn sanitize_label(input: &str) -> String {
        input
            .chars()
            .take(63) // Kubernetes label value limit
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' })
            .collect::<String>()
            .trim_matches('-')
            .to_string()
    }

    /// Build the command array for the container
    fn build_command(command: &[String]) -> Result<String> {
        if command.is_empty() {
            return Err(AppError::ValidationError(
                "Task requires a non-empty command".to_string(),
            ));
        }

        let quoted: Vec<String> = command
            .iter()
            .map(|arg| format!("\"{}\"", Self::escape_yaml_string(arg)))
            .collect();

        Ok(format!("[{}]", quoted.join(", ")))
    }

    /// Build the container volumeMounts section
    fn build_volume_mounts(bindings: &[VolumeBinding]) -> String {
        if bindings.is_empty() {
            return String::new();
        }

        let mut mounts = String::from("volumeMounts:\n");
        for binding in bindings {
            mounts.push_str(&format!(
                "        - name: {}\n          mountPath: {}\n          readOnly: {}\n",
                binding.volume_name, binding.mount_path, binding.read_only
            ));
        }

        mounts.trim_end().to_string()
    }

    /// Build the pod-level volumes section
    fn build_volumes(bindings: &[VolumeBinding]) -> String {
        if bindings.is_empty() {
            return String::new();
        }

        let mut volumes = String::from("volumes:\n");
        for binding in bindings {
            match &binding.source {
                VolumeSource::PersistentClaim { claim_name } => {
                    volumes.push_str(&format!(
                        "      - name: {}\n        persistentVolumeClaim:\n          claimName: {}\n          readOnly: {}\n",
                        binding.volume_name, claim_name, binding.read_only
                    ));
                }
                VolumeSource::HostPath { path } => {
                    volumes.push_str(&format!(
                        "      - name: {}\n        hostPath:\n          path: {}\n          type: Directory\n",
                        binding.volume_name, path
                    ));
                }
                VolumeSource::EmptyDir => {
                    volumes.push_str(&format!(
                        "      - name: {}\n        emptyDir: {{}}\n",
                        binding.volume_name
                    ));
                }
            }
        }

        volumes.trim_end().to_string()
    }

    /// Escape a string for embedding in a double-quoted YAML scalar
    fn escape_yaml_string(input: &str) -> String {
        input.replace('\\', "\\\\").replace('"', "\\\"")
    }

    /// Validate generated YAML syntax before handing it to the cluster
    pub fn validate_yaml_syntax(yaml: &str) -> Result<()> {
        serde_yaml::from_str::<serde_yaml::Value>(yaml).map_err(|e| {
            AppError::KubernetesError(format!("Generated manifest is not valid YAML: {}", e))
        })?;
        Ok(())
    }
}
