//! Configuration loading and typed config structures for the simulation.
//!
//! The canonical configuration lives in `fallsim-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure, and provides a loader that reads the file. All
//! fields carry built-in defaults, so partial files and a missing file
//! both work.

use std::path::Path;

use fallsim_agents::PopulationParams;
use fallsim_types::Wellbeing;
use fallsim_world::NetworkOptions;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed).
    #[serde(default)]
    pub world: WorldConfig,

    /// Run-length and retry settings.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Cohort generation parameters.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Network topology parameters.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Capacity balancer settings.
    #[serde(default)]
    pub balancer: BalancerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
        }
    }
}

fn default_world_name() -> String {
    "fallsim".to_string()
}

const fn default_seed() -> u64 {
    42
}

/// Run-length and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of ticks to run.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Transaction retry budget for conflict-capable backends.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

const fn default_max_ticks() -> u64 {
    365
}

const fn default_retry_attempts() -> u32 {
    5
}

/// Cohort generation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Number of patients.
    #[serde(default = "default_population_size")]
    pub size: u32,

    /// One carer per this many patients.
    #[serde(default = "default_carer_divisor")]
    pub carer_divisor: u32,

    /// Starting support pool of each carer.
    #[serde(default = "default_carer_resources")]
    pub carer_resources: f64,

    /// Whether carers top up failing payments.
    #[serde(default = "default_carer_support")]
    pub carer_support: bool,

    /// Mean starting mobility.
    #[serde(default = "default_mean_mobility")]
    pub mean_mobility: f64,

    /// Mean starting mood.
    #[serde(default = "default_mean_mood")]
    pub mean_mood: f64,

    /// Mean starting resources.
    #[serde(default = "default_mean_resources")]
    pub mean_resources: f64,

    /// Mean inclination vector (social, fall, medical, inactive).
    #[serde(default = "default_mean_inclination")]
    pub mean_inclination: [f64; 4],
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            carer_divisor: default_carer_divisor(),
            carer_resources: default_carer_resources(),
            carer_support: default_carer_support(),
            mean_mobility: default_mean_mobility(),
            mean_mood: default_mean_mood(),
            mean_resources: default_mean_resources(),
            mean_inclination: default_mean_inclination(),
        }
    }
}

impl PopulationConfig {
    /// Convert to the generation parameters used by `fallsim-agents`.
    pub const fn params(&self) -> PopulationParams {
        PopulationParams {
            size: self.size,
            carer_divisor: self.carer_divisor,
            carer_resources: self.carer_resources,
            mean_mobility: self.mean_mobility,
            mean_mood: self.mean_mood,
            mean_resources: self.mean_resources,
            mean_inclination: self.mean_inclination,
        }
    }
}

const fn default_population_size() -> u32 {
    100
}

const fn default_carer_divisor() -> u32 {
    4
}

const fn default_carer_resources() -> f64 {
    20.0
}

const fn default_carer_support() -> bool {
    true
}

const fn default_mean_mobility() -> f64 {
    0.8
}

const fn default_mean_mood() -> f64 {
    0.9
}

const fn default_mean_resources() -> f64 {
    1.0
}

const fn default_mean_inclination() -> [f64; 4] {
    [2.0, 0.0, 1.0, 2.0]
}

/// Network topology parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkConfig {
    /// Capacity of the referral-gated intervention programme.
    #[serde(default = "default_intervention_capacity")]
    pub intervention_capacity: u32,

    /// Whether the open-access intervention node exists.
    #[serde(default)]
    pub open_intervention: bool,

    /// Capacity of the open-access intervention node.
    #[serde(default)]
    pub open_intervention_capacity: u32,

    /// Wellbeing states admitted to the open-access node.
    #[serde(default = "default_open_intervention_allowed")]
    pub open_intervention_allowed: Vec<Wellbeing>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            intervention_capacity: default_intervention_capacity(),
            open_intervention: false,
            open_intervention_capacity: 0,
            open_intervention_allowed: default_open_intervention_allowed(),
        }
    }
}

impl NetworkConfig {
    /// Convert to the bootstrap options used by `fallsim-world`.
    pub fn options(&self) -> NetworkOptions {
        NetworkOptions {
            intervention_capacity: self.intervention_capacity,
            open_intervention: self.open_intervention,
            open_intervention_capacity: self.open_intervention_capacity,
            open_intervention_allowed: self.open_intervention_allowed.clone(),
        }
    }
}

const fn default_intervention_capacity() -> u32 {
    2
}

fn default_open_intervention_allowed() -> Vec<Wellbeing> {
    vec![Wellbeing::Healthy, Wellbeing::AtRisk, Wellbeing::Fallen]
}

/// Capacity balancer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BalancerConfig {
    /// Whether the balancer runs at all.
    #[serde(default = "default_balancer_enabled")]
    pub enabled: bool,

    /// Whether capacity shifts between the two intervention nodes instead
    /// of growing and shrinking the primary alone.
    #[serde(default)]
    pub dynamic: bool,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            enabled: default_balancer_enabled(),
            dynamic: false,
        }
    }
}

const fn default_balancer_enabled() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (`trace`, `debug`, `info`, `warn`, `error`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.simulation.max_ticks, 365);
        assert_eq!(config.population.size, 100);
        assert_eq!(config.network.intervention_capacity, 2);
        assert!(!config.network.open_intervention);
    }

    #[test]
    fn partial_yaml_overrides_selected_fields() {
        let yaml = r"
world:
  seed: 7
network:
  open_intervention: true
  open_intervention_capacity: 4
  open_intervention_allowed: [AtRisk, Fallen]
balancer:
  dynamic: true
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.seed, 7);
        assert!(config.network.open_intervention);
        assert_eq!(config.network.open_intervention_capacity, 4);
        assert_eq!(
            config.network.open_intervention_allowed,
            vec![Wellbeing::AtRisk, Wellbeing::Fallen]
        );
        assert!(config.balancer.dynamic);
        // Untouched sections keep their defaults.
        assert_eq!(config.population.carer_divisor, 4);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = SimulationConfig::parse("world: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn population_params_carry_means() {
        let config = SimulationConfig::default();
        let params = config.population.params();
        assert!((params.mean_mobility - 0.8).abs() < f64::EPSILON);
        assert_eq!(params.size, 100);
    }
}
