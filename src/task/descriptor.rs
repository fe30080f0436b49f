use crate::error::{AppError, Result};
use crate::task::{Trigger, VolumeBinding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_scheduled_start() -> DateTime<Utc> {
    Utc::now()
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Declarative description of one containerized task, registered with the
/// registry under its identifier. Immutable once built; a rescan that wants
/// to change a task replaces the whole descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub identifier: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default = "default_scheduled_start")]
    pub scheduled_start: DateTime<Utc>,
    #[serde(default)]
    pub trigger: Trigger,
    pub container_image: String,
    pub command: Vec<String>,
    #[serde(default = "default_namespace")]
    pub target_namespace: String,
    #[serde(default)]
    pub volume_bindings: Vec<VolumeBinding>,
}

impl TaskDescriptor {
    pub fn builder(identifier: impl Into<String>) -> TaskDescriptorBuilder {
        TaskDescriptorBuilder::new(identifier)
    }

    /// Parse a YAML definition and fail fast on anything malformed.
    pub fn from_yaml(yaml_content: &str) -> Result<Self> {
        let descriptor: Self = serde_yaml::from_str(yaml_content)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Validate the descriptor as a whole
    pub fn validate(&self) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Task identifier cannot be empty".to_string(),
            ));
        }

        if self.container_image.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Task '{}' requires a container_image",
                self.identifier
            )));
        }

        if self.container_image.contains(char::is_whitespace) {
            return Err(AppError::ValidationError(format!(
                "Task '{}' container_image '{}' is not a valid image reference",
                self.identifier, self.container_image
            )));
        }

        if self.command.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Task '{}' must have at least one command element",
                self.identifier
            )));
        }

        if self.command.iter().any(|arg| arg.is_empty()) {
            return Err(AppError::ValidationError(format!(
                "Task '{}' command contains an empty element",
                self.identifier
            )));
        }

        if self.target_namespace.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Task '{}' requires a target_namespace",
                self.identifier
            )));
        }

        self.trigger.validate().map_err(AppError::ValidationError)?;

        let mut seen_names = HashSet::new();
        for binding in &self.volume_bindings {
            binding.validate().map_err(AppError::ValidationError)?;
            if !seen_names.insert(binding.volume_name.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Task '{}' declares volume '{}' more than once",
                    self.identifier, binding.volume_name
                )));
            }
        }

        Ok(())
    }
}

/// Builder with named fields, validated at construction time.
///
/// This replaces the ambient "current definition under construction" context
/// some orchestrators use: everything a definition needs is set explicitly
/// and checked in `build`.
#[derive(Debug, Clone, Default)]
pub struct TaskDescriptorBuilder {
    identifier: String,
    owner: String,
    scheduled_start: Option<DateTime<Utc>>,
    trigger: Trigger,
    container_image: String,
    command: Vec<String>,
    target_namespace: String,
    volume_bindings: Vec<VolumeBinding>,
}

impl TaskDescriptorBuilder {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            target_namespace: default_namespace(),
            ..Default::default()
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn scheduled_start(mut self, start: DateTime<Utc>) -> Self {
        self.scheduled_start = Some(start);
        self
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.container_image = image.into();
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.target_namespace = namespace.into();
        self
    }

    pub fn volume_binding(mut self, binding: VolumeBinding) -> Self {
        self.volume_bindings.push(binding);
        self
    }

    /// Assemble and validate the descriptor
    pub fn build(self) -> Result<TaskDescriptor> {
        let descriptor = TaskDescriptor {
            identifier: self.identifier,
            owner: self.owner,
            scheduled_start: self.scheduled_start.unwrap_or_else(Utc::now),
            trigger: self.trigger,
            container_image: self.container_image,
            command: self.command,
            target_namespace: self.target_namespace,
            volume_bindings: self.volume_bindings,
        };

        descriptor.validate()?;

        Ok(descriptor)
    }
}
