use serde::{Deserialize, Serialize};

/// Content-injected configuration for one map instance.
///
/// Every field is supplied by the hosting content layer; there is no
/// `Default` impl because cell size and vision ranges are game data, not
/// engine constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Side length of one grid cell, in world units. Must be positive.
    pub cell_size: f32,
    /// Instance-level default vision range. `None` means "use the system
    /// fallback".
    pub vision_range: Option<f32>,
    /// System-wide fallback vision range, used when neither a per-player
    /// override nor the instance default is set.
    pub fallback_vision_range: f32,
}

/// Errors from validating injected configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cell_size must be positive, got {0}")]
    NonPositiveCellSize(f32),
    #[error("vision range must be positive, got {0}")]
    NonPositiveVisionRange(f32),
}

impl MapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size > 0.0) {
            return Err(ConfigError::NonPositiveCellSize(self.cell_size));
        }
        if !(self.fallback_vision_range > 0.0) {
            return Err(ConfigError::NonPositiveVisionRange(
                self.fallback_vision_range,
            ));
        }
        if let Some(range) = self.vision_range {
            if !(range > 0.0) {
                return Err(ConfigError::NonPositiveVisionRange(range));
            }
        }
        Ok(())
    }

    /// Vision range effective for a player with the given per-player
    /// override: override, else instance default, else system fallback.
    pub fn effective_vision_range(&self, player_override: Option<f32>) -> f32 {
        player_override
            .or(self.vision_range)
            .unwrap_or(self.fallback_vision_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MapConfig {
        MapConfig {
            cell_size: 100.0,
            vision_range: Some(128.0),
            fallback_vision_range: 64.0,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn zero_cell_size_rejected() {
        let cfg = MapConfig {
            cell_size: 0.0,
            ..config()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveCellSize(_))
        ));
    }

    #[test]
    fn nan_cell_size_rejected() {
        let cfg = MapConfig {
            cell_size: f32::NAN,
            ..config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn vision_fallback_chain() {
        let cfg = config();
        assert_eq!(cfg.effective_vision_range(Some(32.0)), 32.0);
        assert_eq!(cfg.effective_vision_range(None), 128.0);

        let no_instance_default = MapConfig {
            vision_range: None,
            ..cfg
        };
        assert_eq!(no_instance_default.effective_vision_range(None), 64.0);
    }
}
