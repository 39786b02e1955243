use thiserror::Error;

// ========================================
// Constants

/// A structure to contain configuration settings that vary between debug and release builds
pub struct Global {}

/// Debug
#[cfg(debug_assertions)]
impl Global {
    /// Slow down the automatic drop by this factor
    pub const DROP_SPEED_FACTOR: f64 = 2.0;

    /// Dump the matrix to the log after every line clear
    pub const LOG_BOARD: bool = true;
}

/// Release
#[cfg(not(debug_assertions))]
impl Global {
    pub const DROP_SPEED_FACTOR: f64 = 1.0;
    pub const LOG_BOARD: bool = false;
}

/// Common
impl Global {
    /// Width of the matrix in blocks
    pub const MATRIX_WIDTH: u32 = 10;

    /// Height of the matrix in blocks
    pub const MATRIX_HEIGHT: u32 = 20;

    /// Rows of spawn buffer above the matrix
    pub const BUFFER_DEPTH: u32 = 4;

    /// Number of preview slots in the bag area
    pub const PREVIEW_COUNT: u32 = 3;

    /// Size of each cell in render units
    pub const BLOCK_SIZE: f32 = 16.0;

    /// Seconds a grounded piece may still be moved before it locks
    pub const LOCKDOWN_DELAY: f64 = 0.5;

    /// Lines needed per level, scaled by the level reached
    pub const LINE_GOAL_INCREMENT: u32 = 5;

    /// Maximum level we allow
    pub const MAX_LEVEL: u32 = 20;

    /// Bag seed used when none is supplied
    pub const SEED: u64 = 0x5eed;
}

// ========================================
// Board configuration

/// Opaque board configuration, inserted as a resource before the board is built
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub matrix_width: u32,
    pub matrix_height: u32,
    pub buffer_depth: u32,
    pub preview_count: u32,
    pub cell_size: f32,
    pub lockdown_delay: f64,
    pub drop_speed_factor: f64,
    pub line_goal_increment: u32,
    pub max_level: u32,
    pub seed: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            matrix_width: Global::MATRIX_WIDTH,
            matrix_height: Global::MATRIX_HEIGHT,
            buffer_depth: Global::BUFFER_DEPTH,
            preview_count: Global::PREVIEW_COUNT,
            cell_size: Global::BLOCK_SIZE,
            lockdown_delay: Global::LOCKDOWN_DELAY,
            drop_speed_factor: Global::DROP_SPEED_FACTOR,
            line_goal_increment: Global::LINE_GOAL_INCREMENT,
            max_level: Global::MAX_LEVEL,
            seed: Global::SEED,
        }
    }
}

/// Reasons a board configuration cannot be used
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("matrix must be at least 4x4, got {width}x{height}")]
    MatrixTooSmall { width: u32, height: u32 },

    #[error("buffer depth {0} cannot hold a spawning piece (need at least 2)")]
    BufferTooShallow(u32),

    #[error("at least one preview slot is required")]
    NoPreviewSlots,

    #[error("lockdown delay must be finite and non-negative, got {0}")]
    InvalidLockdownDelay(f64),

    #[error("drop speed factor must be finite and positive, got {0}")]
    InvalidDropSpeedFactor(f64),

    #[error("max level must be at least 1")]
    InvalidMaxLevel,

    #[error("could not parse {name}={value:?}")]
    InvalidEnvValue { name: &'static str, value: String },
}

impl BoardConfig {
    /// Environment variable overriding the bag seed
    pub const SEED_VAR: &'static str = "ROTRIS_SEED";

    /// Environment variable overriding the lockdown delay (seconds)
    pub const LOCKDOWN_VAR: &'static str = "ROTRIS_LOCKDOWN_DELAY";

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix_width < 4 || self.matrix_height < 4 {
            return Err(ConfigError::MatrixTooSmall {
                width: self.matrix_width,
                height: self.matrix_height,
            });
        }
        if self.buffer_depth < 2 {
            return Err(ConfigError::BufferTooShallow(self.buffer_depth));
        }
        if self.preview_count == 0 {
            return Err(ConfigError::NoPreviewSlots);
        }
        if !self.lockdown_delay.is_finite() || self.lockdown_delay < 0.0 {
            return Err(ConfigError::InvalidLockdownDelay(self.lockdown_delay));
        }
        if !self.drop_speed_factor.is_finite() || self.drop_speed_factor <= 0.0 {
            return Err(ConfigError::InvalidDropSpeedFactor(self.drop_speed_factor));
        }
        if self.max_level == 0 {
            return Err(ConfigError::InvalidMaxLevel);
        }
        Ok(())
    }

    /// Apply overrides from a variable lookup, then validate
    ///
    /// The lookup is injected so the binary can pass `std::env::var` and tests can pass a map.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(Self::SEED_VAR) {
            self.seed = value.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                name: Self::SEED_VAR,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(Self::LOCKDOWN_VAR) {
            self.lockdown_delay = value.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                name: Self::LOCKDOWN_VAR,
                value: value.clone(),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Defaults overridden from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        BoardConfig::default().with_overrides(|name| std::env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(BoardConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_tiny_matrix() {
        let config = BoardConfig {
            matrix_width: 3,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::MatrixTooSmall { width: 3, height: 20 })
        );
    }

    #[test]
    fn rejects_shallow_buffer_and_bad_delays() {
        let shallow = BoardConfig {
            buffer_depth: 1,
            ..Default::default()
        };
        assert_eq!(shallow.validate(), Err(ConfigError::BufferTooShallow(1)));

        let negative = BoardConfig {
            lockdown_delay: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidLockdownDelay(_))
        ));

        let stopped = BoardConfig {
            drop_speed_factor: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            stopped.validate(),
            Err(ConfigError::InvalidDropSpeedFactor(_))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let vars: HashMap<&str, &str> = [("ROTRIS_SEED", "42"), ("ROTRIS_LOCKDOWN_DELAY", "0.25")]
            .into_iter()
            .collect();
        let config = BoardConfig::default()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.lockdown_delay, 0.25);
    }

    #[test]
    fn bad_override_is_reported() {
        let err = BoardConfig::default()
            .with_overrides(|name| (name == "ROTRIS_SEED").then(|| "abc".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnvValue {
                name: "ROTRIS_SEED",
                value: "abc".to_string()
            }
        );
        assert_eq!(err.to_string(), "could not parse ROTRIS_SEED=\"abc\"");
    }
}
