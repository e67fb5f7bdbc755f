use serde::Deserialize;
use std::path::Path;

/// Engine tuning parameters. Fixed at construction; a running control loop
/// is never reconfigured mid-flight.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Target time between consecutive buses (seconds, default: 300)
    #[serde(default = "ControlConfig::default_target_headway")]
    pub target_headway: f64,
    /// Gaps below this count as bunching (seconds, default: 120)
    #[serde(default = "ControlConfig::default_bunching_threshold")]
    pub bunching_threshold: f64,
    /// Upper bound on any single holding decision (seconds, default: 180)
    #[serde(default = "ControlConfig::default_max_holding_time")]
    pub max_holding_time: f64,
    /// Objective weight on passenger wait incurred by holding (default: 1.0)
    #[serde(default = "ControlConfig::default_passenger_weight")]
    pub passenger_weight: f64,
    /// Objective weight on schedule adherence (default: 0.5)
    #[serde(default = "ControlConfig::default_schedule_weight")]
    pub schedule_weight: f64,
    /// Objective weight on residual headway deviation (default: 2.0)
    #[serde(default = "ControlConfig::default_bunching_penalty")]
    pub bunching_penalty: f64,
    /// Base service frequency in buses per hour (default: 10).
    /// Half of this is the floor the fleet sizer never goes below.
    #[serde(default = "ControlConfig::default_base_frequency")]
    pub base_frequency: u32,
    /// Passengers per bus (default: 50)
    #[serde(default = "ControlConfig::default_bus_capacity")]
    pub bus_capacity: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            target_headway: Self::default_target_headway(),
            bunching_threshold: Self::default_bunching_threshold(),
            max_holding_time: Self::default_max_holding_time(),
            passenger_weight: Self::default_passenger_weight(),
            schedule_weight: Self::default_schedule_weight(),
            bunching_penalty: Self::default_bunching_penalty(),
            base_frequency: Self::default_base_frequency(),
            bus_capacity: Self::default_bus_capacity(),
        }
    }
}

impl ControlConfig {
    fn default_target_headway() -> f64 {
        300.0
    }
    fn default_bunching_threshold() -> f64 {
        120.0
    }
    fn default_max_holding_time() -> f64 {
        180.0
    }
    fn default_passenger_weight() -> f64 {
        1.0
    }
    fn default_schedule_weight() -> f64 {
        0.5
    }
    fn default_bunching_penalty() -> f64 {
        2.0
    }
    fn default_base_frequency() -> u32 {
        10
    }
    fn default_bus_capacity() -> u32 {
        50
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_headway > 0.0) {
            return Err(ConfigError::Invalid("target_headway must be positive".into()));
        }
        if !(self.bunching_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "bunching_threshold must be positive".into(),
            ));
        }
        if !(self.max_holding_time >= 0.0) {
            return Err(ConfigError::Invalid(
                "max_holding_time must not be negative".into(),
            ));
        }
        for (name, weight) in [
            ("passenger_weight", self.passenger_weight),
            ("schedule_weight", self.schedule_weight),
            ("bunching_penalty", self.bunching_penalty),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative finite number"
                )));
            }
        }
        if self.base_frequency == 0 {
            return Err(ConfigError::Invalid("base_frequency must be at least 1".into()));
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::Invalid("bus_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Cadence of the periodic driver.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Seconds between optimization cycles (default: 30)
    #[serde(default = "DriverConfig::default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Seconds between fleet-sizing passes (default: 900)
    #[serde(default = "DriverConfig::default_dispatch_interval_secs")]
    pub dispatch_interval_secs: u64,
    /// Rolling optimization horizon in minutes (default: 30).
    /// Carried through to cycle diagnostics; the LP itself is single-shot.
    #[serde(default = "DriverConfig::default_horizon_minutes")]
    pub horizon_minutes: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: Self::default_cycle_interval_secs(),
            dispatch_interval_secs: Self::default_dispatch_interval_secs(),
            horizon_minutes: Self::default_horizon_minutes(),
        }
    }
}

impl DriverConfig {
    fn default_cycle_interval_secs() -> u64 {
        30
    }
    fn default_dispatch_interval_secs() -> u64 {
        900
    }
    fn default_horizon_minutes() -> u32 {
        30
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cycle_interval_secs must be at least 1".into(),
            ));
        }
        if self.dispatch_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()?;
        self.driver.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.target_headway, 300.0);
        assert_eq!(config.control.bunching_threshold, 120.0);
        assert_eq!(config.control.max_holding_time, 180.0);
        assert_eq!(config.driver.cycle_interval_secs, 30);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "control:\n  target_headway: 240.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.control.target_headway, 240.0);
        assert_eq!(config.control.bunching_threshold, 120.0);
        assert_eq!(config.driver.dispatch_interval_secs, 900);
    }

    #[test]
    fn rejects_non_positive_headway_target() {
        let config = Config {
            control: ControlConfig {
                target_headway: 0.0,
                ..ControlConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_negative_weight() {
        let config = Config {
            control: ControlConfig {
                schedule_weight: -0.5,
                ..ControlConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_nan_weight() {
        let config = Config {
            control: ControlConfig {
                bunching_penalty: f64::NAN,
                ..ControlConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = Config {
            control: ControlConfig {
                bus_capacity: 0,
                ..ControlConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_cycle_interval() {
        let config = Config {
            driver: DriverConfig {
                cycle_interval_secs: 0,
                ..DriverConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn error_display_invalid() {
        let err = ConfigError::Invalid("bus_capacity must be at least 1".into());
        assert_eq!(err.to_string(), "Invalid config: bus_capacity must be at least 1");
    }
}
