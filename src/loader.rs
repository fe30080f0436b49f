//! Definition loading
//!
//! YAML files in the definitions directory are the scan path: every
//! `.yaml`/`.yml` file holds one task definition. The scan runs once at
//! startup and again on every rescan tick; malformed files are reported and
//! skipped so one bad definition cannot take the others down.

use crate::error::{AppError, Result};
use crate::registry::TaskRegistry;
use crate::task::TaskDescriptor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load a single definition file
pub fn load_definition(path: &Path) -> Result<TaskDescriptor> {
    let contents = std::fs::read_to_string(path)?;
    TaskDescriptor::from_yaml(&contents).map_err(|e| AppError::DefinitionError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Collect the definition files under `dir`, sorted for deterministic
/// loading order.
fn definition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if path.is_file() && is_yaml {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Scan the definitions directory and parse every definition in it.
///
/// Returns the descriptors that loaded cleanly; parse and validation
/// failures are logged per-file and skipped.
pub fn scan_definitions(dir: &Path) -> Result<Vec<TaskDescriptor>> {
    if !dir.exists() {
        debug!("🔍 Definitions directory does not exist: {}", dir.display());
        return Ok(Vec::new());
    }

    let mut descriptors = Vec::new();

    for path in definition_files(dir)? {
        match load_definition(&path) {
            Ok(descriptor) => {
                debug!(
                    "📄 Loaded definition '{}' from {}",
                    descriptor.identifier,
                    path.display()
                );
                descriptors.push(descriptor);
            }
            Err(e) => {
                warn!("⚠️ Skipping malformed definition: {}", e);
            }
        }
    }

    Ok(descriptors)
}

/// Scan `dir` and bring the registry in line with it: new definitions are
/// registered, changed ones replaced, and definitions whose files are gone
/// are dropped. `pinned` identifiers (built-ins) are never dropped, and a
/// scanned file can never overwrite them.
///
/// Identifiers are unique across the registry. A second file carrying an
/// already-loaded identifier is treated like a malformed file: warned about
/// and skipped. Returns the number of definitions actually applied.
pub async fn sync_definitions(
    dir: &Path,
    registry: &TaskRegistry,
    pinned: &[String],
) -> Result<usize> {
    let descriptors = scan_definitions(dir)?;

    let mut scanned: Vec<String> = Vec::new();
    for descriptor in descriptors {
        if pinned.contains(&descriptor.identifier) {
            warn!(
                "⚠️ Skipping definition '{}': identifier is reserved by a built-in task",
                descriptor.identifier
            );
            continue;
        }
        if scanned.contains(&descriptor.identifier) {
            warn!(
                "⚠️ Skipping definition '{}': identifier already loaded by an earlier file",
                descriptor.identifier
            );
            continue;
        }

        scanned.push(descriptor.identifier.clone());
        registry.replace(descriptor).await;
    }

    registry.retain_scanned(&scanned, pinned).await;

    let count = scanned.len();
    info!(
        "🔍 Definition scan complete: {} definition(s) in {}",
        count,
        dir.display()
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Trigger;
    use uuid::Uuid;

    fn temp_definitions_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kubetask-loader-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const GOOD_DEFINITION: &str = r#"
identifier: good-task
owner: tests
container_image: alpine:3.20
command: ["true"]
trigger:
  type: interval
  every_seconds: 60
"#;

    #[test]
    fn test_scan_skips_malformed_files() {
        let dir = temp_definitions_dir();
        std::fs::write(dir.join("good.yaml"), GOOD_DEFINITION).unwrap();
        std::fs::write(dir.join("bad.yaml"), "identifier: [not a string").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a definition").unwrap();

        let descriptors = scan_definitions(&dir).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].identifier, "good-task");
        assert_eq!(descriptors[0].trigger, Trigger::Interval { every_seconds: 60 });

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_scan_of_missing_directory_is_empty() {
        let dir = std::env::temp_dir().join(format!("kubetask-missing-{}", Uuid::new_v4()));
        assert!(scan_definitions(&dir).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_adds_and_removes() {
        let dir = temp_definitions_dir();
        let registry = TaskRegistry::new();

        std::fs::write(dir.join("good.yaml"), GOOD_DEFINITION).unwrap();
        sync_definitions(&dir, &registry, &[]).await.unwrap();
        assert!(registry.get("good-task").await.is_some());

        // File removed from the scan path -> definition is dropped
        std::fs::remove_file(dir.join("good.yaml")).unwrap();
        sync_definitions(&dir, &registry, &[]).await.unwrap();
        assert!(registry.get("good-task").await.is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_sync_skips_files_reusing_an_identifier() {
        let dir = temp_definitions_dir();
        let registry = TaskRegistry::new();

        let definition = |owner: &str| {
            format!(
                "identifier: same-task\nowner: {}\ncontainer_image: alpine:3.20\ncommand: [\"true\"]\n",
                owner
            )
        };
        std::fs::write(dir.join("a.yaml"), definition("alice")).unwrap();
        std::fs::write(dir.join("b.yaml"), definition("bob")).unwrap();

        // Only the first file in scan order is applied; the later one is
        // skipped, not silently collapsed onto it.
        let count = sync_definitions(&dir, &registry, &[]).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.get("same-task").await.unwrap().owner, "alice");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_sync_never_overwrites_pinned_builtins() {
        let dir = temp_definitions_dir();
        let registry = TaskRegistry::new();

        let builtin = TaskDescriptor::builder("builtin-task")
            .owner("tests")
            .image("alpine:3.20")
            .command(["true"])
            .build()
            .unwrap();
        registry.register(builtin).await.unwrap();

        std::fs::write(
            dir.join("impostor.yaml"),
            "identifier: builtin-task\nowner: tests\ncontainer_image: other:latest\ncommand: [\"true\"]\n",
        )
        .unwrap();

        let count = sync_definitions(&dir, &registry, &["builtin-task".to_string()])
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(
            registry.get("builtin-task").await.unwrap().container_image,
            "alpine:3.20"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_sync_preserves_pinned_builtins() {
        let dir = temp_definitions_dir();
        let registry = TaskRegistry::new();

        let builtin = TaskDescriptor::builder("builtin-task")
            .owner("tests")
            .image("alpine:3.20")
            .command(["true"])
            .build()
            .unwrap();
        registry.register(builtin).await.unwrap();

        sync_definitions(&dir, &registry, &["builtin-task".to_string()])
            .await
            .unwrap();
        assert!(registry.get("builtin-task").await.is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
