//! Task registry
//!
//! The discovery surface of the loader: every definition that parses and
//! validates ends up here, keyed by its identifier, visible to the scheduler.

use crate::error::{AppError, Result};
use crate::task::TaskDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<String, TaskDescriptor>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task. Identifiers are unique within the registry.
    pub async fn register(&self, descriptor: TaskDescriptor) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&descriptor.identifier) {
            return Err(AppError::DuplicateTask(descriptor.identifier));
        }

        info!(
            "📋 Registered task: {} (owner: {}, namespace: {})",
            descriptor.identifier, descriptor.owner, descriptor.target_namespace
        );
        tasks.insert(descriptor.identifier.clone(), descriptor);
        Ok(())
    }

    /// Register or overwrite, used when a rescan picks up a changed file.
    pub async fn replace(&self, descriptor: TaskDescriptor) {
        let mut tasks = self.tasks.write().await;
        if tasks.insert(descriptor.identifier.clone(), descriptor.clone()).is_some() {
            debug!("♻️ Replaced task definition: {}", descriptor.identifier);
        } else {
            info!(
                "📋 Registered task: {} (owner: {}, namespace: {})",
                descriptor.identifier, descriptor.owner, descriptor.target_namespace
            );
        }
    }

    /// Remove a task definition, e.g. when its file left the scan path.
    pub async fn remove(&self, identifier: &str) -> Result<TaskDescriptor> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(identifier).ok_or_else(|| {
            AppError::NotFound(format!("Task not registered: {}", identifier))
        })
    }

    pub async fn get(&self, identifier: &str) -> Option<TaskDescriptor> {
        self.tasks.read().await.get(identifier).cloned()
    }

    pub async fn list(&self) -> Vec<TaskDescriptor> {
        let mut tasks: Vec<_> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        tasks
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Drop every registered task whose identifier is not in `keep`, except
    /// the ones in `pinned` (built-in definitions that never come from the
    /// scan path).
    pub async fn retain_scanned(&self, keep: &[String], pinned: &[String]) {
        let mut tasks = self.tasks.write().await;
        tasks.retain(|identifier, _| {
            let stays =
                keep.iter().any(|k| k == identifier) || pinned.iter().any(|p| p == identifier);
            if !stays {
                info!("🗑️ Task definition removed from scan path: {}", identifier);
            }
            stays
        });
    }
}
