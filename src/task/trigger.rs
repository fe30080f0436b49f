use serde::{Deserialize, Serialize};

/// What causes a task definition to produce a run.
///
/// `Manual` and `None` tasks only run on an explicit external invocation;
/// the scheduler must never auto-trigger them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Started by an operator through the API.
    Manual,
    /// Fires every `every_seconds` seconds.
    Interval { every_seconds: u64 },
    /// Fires on a cron expression.
    Cron { expression: String },
    /// No trigger at all. The definition is visible to the orchestrator but
    /// runs only when something outside it asks.
    None,
}

impl Default for Trigger {
    fn default() -> Self {
        Trigger::None
    }
}

/// Upper bound on interval periods (366 days). Values past this serve no
/// scheduling purpose and would overflow the occurrence arithmetic.
pub const MAX_INTERVAL_SECONDS: u64 = 366 * 24 * 60 * 60;

impl Trigger {
    /// Whether the scheduler is allowed to start runs for this trigger on
    /// its own.
    pub fn is_automatic(&self) -> bool {
        matches!(self, Trigger::Interval { .. } | Trigger::Cron { .. })
    }

    /// Validate trigger parameters
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Trigger::Interval { every_seconds } if *every_seconds == 0 => {
                Err("Interval trigger requires every_seconds > 0".to_string())
            }
            Trigger::Interval { every_seconds } if *every_seconds > MAX_INTERVAL_SECONDS => {
                Err(format!(
                    "Interval trigger every_seconds must be at most {}",
                    MAX_INTERVAL_SECONDS
                ))
            }
            Trigger::Cron { expression } if expression.trim().is_empty() => {
                Err("Cron trigger requires a non-empty expression".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_yaml_parsing() {
        let trigger: Trigger = serde_yaml::from_str("type: none").unwrap();
        assert_eq!(trigger, Trigger::None);

        let trigger: Trigger = serde_yaml::from_str(
            "type: cron\nexpression: \"0 0 * * *\"",
        )
        .unwrap();
        assert_eq!(
            trigger,
            Trigger::Cron {
                expression: "0 0 * * *".to_string()
            }
        );

        let trigger: Trigger =
            serde_yaml::from_str("type: interval\nevery_seconds: 300").unwrap();
        assert_eq!(trigger, Trigger::Interval { every_seconds: 300 });
    }

    #[test]
    fn test_only_interval_and_cron_are_automatic() {
        assert!(Trigger::Interval { every_seconds: 60 }.is_automatic());
        assert!(Trigger::Cron {
            expression: "0 * * * *".to_string()
        }
        .is_automatic());
        assert!(!Trigger::Manual.is_automatic());
        assert!(!Trigger::None.is_automatic());
    }

    #[test]
    fn test_trigger_validation() {
        assert!(Trigger::Interval { every_seconds: 0 }.validate().is_err());
        assert!(Trigger::Interval { every_seconds: u64::MAX }.validate().is_err());
        assert!(Trigger::Interval {
            every_seconds: MAX_INTERVAL_SECONDS + 1
        }
        .validate()
        .is_err());
        assert!(Trigger::Interval {
            every_seconds: MAX_INTERVAL_SECONDS
        }
        .validate()
        .is_ok());
        assert!(Trigger::Cron {
            expression: "  ".to_string()
        }
        .validate()
        .is_err());
        assert!(Trigger::None.validate().is_ok());
        assert!(Trigger::Manual.validate().is_ok());
    }
}
