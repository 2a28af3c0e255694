// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};
use crate::simulator::{MachineSpecs, SimulationScenario};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// Per-machine control loop settings
    pub simulation: SimulationConfig,

    /// Decision engine thresholds
    pub decision: DecisionConfig,

    /// Built-in scoring model settings
    pub models: ModelConfig,

    /// Machines simulated by the headless runner
    pub machines: Vec<MachineConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Millwright".to_string(),
            log_level: "info".to_string(),
            simulation: SimulationConfig::default(),
            decision: DecisionConfig::default(),
            models: ModelConfig::default(),
            machines: vec![
                MachineConfig::new("press-01", SimulationScenario::Normal),
                MachineConfig::new("lathe-02", SimulationScenario::HighLoad),
                MachineConfig::new("pump-03", SimulationScenario::Unbalanced),
            ],
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Reject values the control loops cannot run with
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.decision.validate()?;
        ensure_finite("models.anomaly_threshold", self.models.anomaly_threshold)?;
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("millwright"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall-clock period between ticks
    pub tick_interval_ms: u64,

    /// Simulated seconds advanced per tick
    pub time_step_secs: f64,

    /// Fixed RPM setpoint
    pub target_rpm: f64,

    /// Initial load setpoint (%)
    pub default_target_load: f64,

    pub min_target_load: f64,
    pub max_target_load: f64,

    /// Setpoint change applied per optimizer verdict (percentage points)
    pub load_step: f64,

    /// Minimum time between optimizer invocations per machine
    pub optimization_cooldown_ms: u64,

    /// Rolling history length
    pub history_capacity: usize,

    /// Samples required before next-state prediction runs
    pub prediction_window: usize,

    /// Upper bound on a single model call inside a tick
    pub model_timeout_ms: u64,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_finite("simulation.time_step_secs", self.time_step_secs)?;
        ensure_finite("simulation.target_rpm", self.target_rpm)?;
        ensure_finite("simulation.default_target_load", self.default_target_load)?;
        ensure_finite("simulation.min_target_load", self.min_target_load)?;
        ensure_finite("simulation.max_target_load", self.max_target_load)?;
        ensure_finite("simulation.load_step", self.load_step)?;

        if self.tick_interval_ms == 0 {
            return Err(Error::Config("simulation.tick_interval_ms must be > 0".into()));
        }
        if self.history_capacity == 0 {
            return Err(Error::Config("simulation.history_capacity must be > 0".into()));
        }
        if self.min_target_load > self.max_target_load {
            return Err(Error::Config(format!(
                "simulation.min_target_load ({}) exceeds max_target_load ({})",
                self.min_target_load, self.max_target_load
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn optimization_cooldown(&self) -> Duration {
        Duration::from_millis(self.optimization_cooldown_ms)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            time_step_secs: 0.1,
            target_rpm: 2800.0,
            default_target_load: 75.0,
            min_target_load: 10.0,
            max_target_load: 95.0,
            load_step: 5.0,
            optimization_cooldown_ms: 2000,
            history_capacity: 24,
            prediction_window: 10,
            model_timeout_ms: 1000,
        }
    }
}

/// Decision engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Reconstruction error above which a sample is anomalous
    pub anomaly_threshold: f64,

    /// mm/s
    pub high_vibration: f64,

    /// °C
    pub high_temperature: f64,

    /// °C
    pub critical_temperature: f64,

    /// Vibration ceiling used by the time-to-failure extrapolation (mm/s)
    pub failure_vibration: f64,

    /// Smallest predicted per-cycle vibration increase treated as a real trend
    pub min_trend: f64,

    /// Period of the engine's fleet-wide analysis sweep
    pub analysis_interval_ms: u64,

    /// Upper bound on each model call during `analyze`
    pub model_timeout_ms: u64,
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_finite("decision.anomaly_threshold", self.anomaly_threshold)?;
        ensure_finite("decision.high_vibration", self.high_vibration)?;
        ensure_finite("decision.high_temperature", self.high_temperature)?;
        ensure_finite("decision.critical_temperature", self.critical_temperature)?;
        ensure_finite("decision.failure_vibration", self.failure_vibration)?;
        ensure_finite("decision.min_trend", self.min_trend)?;

        if self.analysis_interval_ms == 0 {
            return Err(Error::Config("decision.analysis_interval_ms must be > 0".into()));
        }
        if self.anomaly_threshold <= 0.0 {
            return Err(Error::Config("decision.anomaly_threshold must be > 0".into()));
        }
        Ok(())
    }

    pub fn analysis_interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 0.0814,
            high_vibration: 1.0,
            high_temperature: 75.0,
            critical_temperature: 85.0,
            failure_vibration: 2.0,
            min_trend: 0.01,
            analysis_interval_ms: 5000,
            model_timeout_ms: 2000,
        }
    }
}

/// Settings for the built-in baseline models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Reconstruction error threshold reported by the anomaly detector
    pub anomaly_threshold: f64,

    /// Forecast horizon reported with each load forecast
    pub forecast_horizon_secs: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 0.0814,
            forecast_horizon_secs: 3600,
        }
    }
}

fn ensure_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be a finite number, got {}", field, value)))
    }
}

/// One simulated machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    pub id: String,

    #[serde(default)]
    pub scenario: SimulationScenario,

    #[serde(default)]
    pub specs: MachineSpecs,
}

impl MachineConfig {
    pub fn new(id: &str, scenario: SimulationScenario) -> Self {
        Self {
            id: id.to_string(),
            scenario,
            specs: MachineSpecs::default(),
        }
    }
}
