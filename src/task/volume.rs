use serde::{Deserialize, Serialize};

/// Where the data behind a volume binding comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeSource {
    /// A PersistentVolumeClaim already provisioned in the target namespace.
    PersistentClaim { claim_name: String },
    /// A directory on the node running the pod.
    HostPath { path: String },
    /// Scratch space that lives and dies with the pod.
    EmptyDir,
}

/// Association between a storage volume and a path inside the container.
///
/// The mount_path must be the exact path any external process writes into
/// the volume, or the task will see stale or empty data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBinding {
    pub volume_name: String,
    pub source: VolumeSource,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeBinding {
    /// Validate a single binding
    pub fn validate(&self) -> Result<(), String> {
        if self.volume_name.trim().is_empty() {
            return Err("Volume binding requires a volume_name".to_string());
        }

        if !self.mount_path.starts_with('/') {
            return Err(format!(
                "Volume '{}' mount_path must be absolute, got '{}'",
                self.volume_name, self.mount_path
            ));
        }

        match &self.source {
            VolumeSource::PersistentClaim { claim_name } if claim_name.trim().is_empty() => {
                Err(format!(
                    "Volume '{}' persistent_claim requires a claim_name",
                    self.volume_name
                ))
            }
            VolumeSource::HostPath { path } if !path.starts_with('/') => Err(format!(
                "Volume '{}' host_path must be absolute, got '{}'",
                self.volume_name, path
            )),
            _ => Ok(()),
        }
    }
}
