use crate::error::ConfigError;
use crate::host::FileId;
use serde::{Deserialize, Serialize};

/// Knobs of the runtime main loop. Every field has a default, so an empty
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Milliseconds the host is asked to sleep after each frame.
    pub idle_sleep_ms: u32,
    /// File id of the persisted pet state blob.
    pub state_file: FileId,
    /// File id of the persisted blackboard key table.
    pub key_file: FileId,
    /// Number of pets spawned at startup.
    pub initial_pets: u32,
    pub persist_keys: bool,
    pub persist_state: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 5,
            state_file: 1337,
            key_file: 7,
            initial_pets: 1,
            persist_keys: true,
            persist_state: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod test;
