//! Machine configuration.

use super::error::BuildError;
use serde::{Deserialize, Serialize};

/// Tunables of a `StateMachine`. Every field has a default, so a partial
/// JSON document is a valid configuration.
///
/// ```rust
/// use stackmind::machine::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{ "history_limit": 16 }"#).unwrap();
/// assert_eq!(config.history_limit, 16);
/// assert_eq!(config.latent_sweep_interval, 30);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Ticks between sweeps of stale latent cancellers; 0 disables them.
    pub latent_sweep_interval: u64,

    /// Maximum number of transitions kept in the history.
    pub history_limit: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            latent_sweep_interval: 30,
            history_limit: 256,
        }
    }
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        serde_json::from_str(json).map_err(|e| BuildError::InvalidConfig(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        serde_json::to_string_pretty(self).map_err(|e| BuildError::InvalidConfig(e.to_string()))
    }

    /// Whether the machine-wide sweep runs on `tick`.
    pub fn sweeps_on(&self, tick: u64) -> bool {
        self.latent_sweep_interval > 0 && tick % self.latent_sweep_interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(MachineConfig::from_json("{}").unwrap(), MachineConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = MachineConfig::from_json(r#"{ "history": 3 }"#);
        assert!(matches!(result, Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn zero_interval_disables_sweeps() {
        let config = MachineConfig {
            latent_sweep_interval: 0,
            ..MachineConfig::default()
        };
        assert!(!config.sweeps_on(30));
        assert!(MachineConfig::default().sweeps_on(60));
        assert!(!MachineConfig::default().sweeps_on(61));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = MachineConfig {
            latent_sweep_interval: 5,
            history_limit: 8,
        };
        let json = config.to_json().unwrap();
        assert_eq!(MachineConfig::from_json(&json).unwrap(), config);
    }
}
