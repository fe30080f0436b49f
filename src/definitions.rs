//! Built-in task definitions
//!
//! Definitions assembled from literal constants and registered at startup,
//! alongside whatever the definitions directory contributes.

use crate::error::Result;
use crate::task::{TaskDescriptor, Trigger, VolumeBinding, VolumeSource};
use chrono::{TimeZone, Utc};

/// Mount path of the shared dags volume inside the task container.
///
/// A git-sync sidecar writes into the same volume at this exact path; the
/// command below and the volume binding both derive from this constant so
/// the two can never drift apart.
pub const DAGS_MOUNT_PATH: &str = "/opt/airflow/dags";

const DAGS_VOLUME_NAME: &str = "dags-volume";
const DAGS_CLAIM_NAME: &str = "airflow-dags-pvc";
const TASK_IMAGE: &str = "myacr.azurecr.io/airflow-dag:latest";
const TASK_NAMESPACE: &str = "airflow";
const TASK_OWNER: &str = "airflow";

/// Path of the entry-point script, inside the mounted volume
pub fn entry_script() -> String {
    format!("{}/project_1/dag_1.py", DAGS_MOUNT_PATH)
}

/// The git-sync example task: runs a script out of a shared volume that an
/// external git-sync process keeps populated. No trigger — it only runs when
/// explicitly invoked.
pub fn git_sync_example() -> Result<TaskDescriptor> {
    TaskDescriptor::builder("example_pod_with_git_sync")
        .owner(TASK_OWNER)
        .scheduled_start(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
        .trigger(Trigger::None)
        .image(TASK_IMAGE)
        .command(["python".to_string(), entry_script()])
        .namespace(TASK_NAMESPACE)
        .volume_binding(VolumeBinding {
            volume_name: DAGS_VOLUME_NAME.to_string(),
            source: VolumeSource::PersistentClaim {
                claim_name: DAGS_CLAIM_NAME.to_string(),
            },
            mount_path: DAGS_MOUNT_PATH.to_string(),
            read_only: true,
        })
        .build()
}

/// All built-in definitions, in registration order
pub fn builtin_tasks() -> Result<Vec<TaskDescriptor>> {
    Ok(vec![git_sync_example()?])
}
