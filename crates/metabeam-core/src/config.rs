//! # Configuration System
//!
//! YAML configuration for the simulator:
//!
//! - Physical constants (carrier frequency, propagation speed)
//! - Observation sweep (theta range and the two principal-plane cuts)
//! - Analysis thresholds (sidelobe threshold, dB floor)
//! - Request limits
//! - Ordered computation backends
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `METABEAM_CONFIG` environment variable
//! 2. `./metabeam.yaml` (current directory)
//! 3. `~/.config/metabeam/config.yaml` (user config)
//! 4. `/etc/metabeam/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! physics:
//!   carrier_frequency_hz: 10.0e9
//!
//! backends:
//!   - kind: command
//!     program: "octave-bridge"
//!     timeout_ms: 60000
//!   - kind: native
//!
//! logging:
//!   level: "info"
//!   format: "json"
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::types::SimError;

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e.to_string())
    }
}

/// Physical constants of the simulated surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Operating carrier frequency in Hz
    pub carrier_frequency_hz: f64,
    /// Free-space propagation speed in m/s
    pub speed_of_light_m_s: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            carrier_frequency_hz: 10.0e9,
            speed_of_light_m_s: 3.0e8,
        }
    }
}

impl PhysicsConfig {
    /// Wavelength in metres.
    pub fn wavelength(&self) -> f64 {
        self.speed_of_light_m_s / self.carrier_frequency_hz
    }

    /// Free-space wave-number k0 = 2π / λ.
    pub fn wavenumber(&self) -> f64 {
        2.0 * PI / self.wavelength()
    }

    /// Element pitch: half a wavelength on both axes.
    pub fn element_pitch(&self) -> f64 {
        self.wavelength() / 2.0
    }
}

/// Angular observation sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// First theta sample in degrees
    pub theta_min_deg: i32,
    /// Last theta sample in degrees (inclusive)
    pub theta_max_deg: i32,
    /// Theta step in degrees
    pub theta_step_deg: u32,
    /// Azimuth cuts in degrees: E-plane first, H-plane second
    pub phi_cuts_deg: Vec<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            theta_min_deg: -80,
            theta_max_deg: 80,
            theta_step_deg: 1,
            phi_cuts_deg: vec![0.0, 90.0],
        }
    }
}

impl SweepConfig {
    /// Ordered theta samples in degrees.
    pub fn theta_range(&self) -> Vec<i32> {
        let step = self.theta_step_deg.max(1) as usize;
        (self.theta_min_deg..=self.theta_max_deg)
            .step_by(step)
            .collect()
    }
}

/// Thresholds used by the metrics stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples must lie strictly more than this far below the peak to count
    /// as sidelobe
    pub sidelobe_threshold_db: f64,
    /// Added to magnitudes before taking log10
    pub db_floor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sidelobe_threshold_db: 3.0,
            db_floor: 1e-10,
        }
    }
}

/// Bounds applied to incoming requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted N_bits
    pub max_bits: u32,
    /// Largest accepted Nx / Ny
    pub max_elements_per_axis: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_bits: 8,
            max_elements_per_axis: 256,
        }
    }
}

/// One computation strategy in the backend chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process engine
    Native,
    /// External program speaking the JSON request/result protocol on stdio
    Command {
        /// Program to execute
        program: String,
        /// Extra arguments
        #[serde(default)]
        args: Vec<String>,
        /// Wall-clock limit for one request
        #[serde(default = "default_command_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_command_timeout_ms() -> u64 {
    60_000
}

/// Complete simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Configuration version
    pub version: String,
    /// Physical constants
    pub physics: PhysicsConfig,
    /// Observation sweep
    pub sweep: SweepConfig,
    /// Metric thresholds
    pub analysis: AnalysisConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// Ordered computation strategies
    pub backends: Vec<BackendConfig>,
    /// Logging configuration
    pub logging: LogConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            physics: PhysicsConfig::default(),
            sweep: SweepConfig::default(),
            analysis: AnalysisConfig::default(),
            limits: LimitsConfig::default(),
            backends: vec![BackendConfig::Native],
            logging: LogConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("METABEAM_CONFIG") {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            return Self::load_from(&path);
        }

        for path in &Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./metabeam.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "metabeam") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/metabeam/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::ValidationError(msg.to_string())) };

        if !(self.physics.carrier_frequency_hz > 0.0) {
            return invalid("carrier_frequency_hz must be positive");
        }
        if !(self.physics.speed_of_light_m_s > 0.0) {
            return invalid("speed_of_light_m_s must be positive");
        }
        if self.sweep.theta_step_deg == 0 {
            return invalid("theta_step_deg must be > 0");
        }
        if self.sweep.theta_min_deg > self.sweep.theta_max_deg {
            return invalid("theta_min_deg must not exceed theta_max_deg");
        }
        if self.sweep.phi_cuts_deg.len() != 2 {
            return invalid("phi_cuts_deg must list exactly two cuts (E-plane, H-plane)");
        }
        if !(self.analysis.sidelobe_threshold_db >= 0.0) {
            return invalid("sidelobe_threshold_db must be >= 0");
        }
        if !(self.analysis.db_floor > 0.0) {
            return invalid("db_floor must be positive");
        }
        if self.limits.max_bits == 0 || self.limits.max_bits > 16 {
            return invalid("max_bits must be 1-16");
        }
        if self.limits.max_elements_per_axis == 0 {
            return invalid("max_elements_per_axis must be > 0");
        }
        if self.backends.is_empty() {
            return invalid("at least one backend is required");
        }
        for backend in &self.backends {
            if let BackendConfig::Command { program, .. } = backend {
                if program.trim().is_empty() {
                    return invalid("command backend needs a program");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogFormat, LogLevel};

    #[test]
    fn test_default_config_valid() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.backends, vec![BackendConfig::Native]);
    }

    #[test]
    fn test_physics_derivations() {
        let p = PhysicsConfig::default();
        assert!((p.wavelength() - 0.03).abs() < 1e-15);
        assert!((p.element_pitch() - 0.015).abs() < 1e-15);
        assert!((p.wavenumber() - 2.0 * PI / 0.03).abs() < 1e-9);
    }

    #[test]
    fn test_default_theta_range() {
        let range = SweepConfig::default().theta_range();
        assert_eq!(range.len(), 161);
        assert_eq!(range.first(), Some(&-80));
        assert_eq!(range.last(), Some(&80));
        assert_eq!(range[80], 0);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
physics:
  carrier_frequency_hz: 28.0e9
backends:
  - kind: command
    program: "octave-bridge"
    args: ["--quiet"]
  - kind: native
logging:
  level: "debug"
  format: "json"
"#;
        let cfg = SimConfig::parse(yaml).unwrap();
        assert_eq!(cfg.physics.carrier_frequency_hz, 28.0e9);
        assert_eq!(cfg.physics.speed_of_light_m_s, 3.0e8);
        assert_eq!(cfg.sweep, SweepConfig::default());
        assert_eq!(
            cfg.backends[0],
            BackendConfig::Command {
                program: "octave-bridge".to_string(),
                args: vec!["--quiet".to_string()],
                timeout_ms: 60_000,
            }
        );
        assert_eq!(cfg.backends[1], BackendConfig::Native);
        assert_eq!(cfg.logging.level, LogLevel::Debug);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let cfg = SimConfig::default();
        let yaml = cfg.to_yaml().unwrap();
        assert_eq!(SimConfig::parse(&yaml).unwrap(), cfg);
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = SimConfig::default();
        cfg.sweep.phi_cuts_deg = vec![0.0];
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.sweep.theta_step_deg = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.backends.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.analysis.db_floor = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimConfig::default();
        cfg.physics.carrier_frequency_hz = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}
