//! Scoring models - anomaly, next-state, load forecast and load optimization
//!
//! The simulation and decision layers only see the [`ScoringModels`] trait.
//! Every call goes through [`guarded`], which bounds it with a timeout and
//! maps failures and panics onto [`crate::Error`].

mod baseline;
pub mod scaling;

pub use baseline::BaselineModels;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model-facing feature record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    pub rpm: f64,
    pub load_percent: f64,
    pub load_kw: f64,
    /// A
    pub current: f64,
    /// N·m
    pub torque: f64,
    /// mm/s
    pub vibration: f64,
    /// °C
    pub temperature: f64,
}

impl SensorData {
    pub fn anomaly_input(&self) -> AnomalyInput {
        AnomalyInput {
            vibration: self.vibration,
            current: self.current,
            temperature: self.temperature,
        }
    }

    pub fn optimization_input(&self) -> OptimizationInput {
        OptimizationInput {
            vibration: self.vibration,
            temperature: self.temperature,
            load_percent: self.load_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyInput {
    pub vibration: f64,
    pub current: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationInput {
    pub vibration: f64,
    pub temperature: f64,
    pub load_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    pub reconstruction_error: f64,
    pub threshold: f64,
}

/// Predicted next-step vibration and temperature, in raw units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub vibration: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadForecast {
    /// kW
    pub predicted_load: f64,
    pub timestamp: DateTime<Utc>,
}

/// Optimizer verdict, ordered to match the Q-value layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadAction {
    DecreaseLoad,
    HoldLoad,
    IncreaseLoad,
}

impl LoadAction {
    pub const ORDER: [LoadAction; 3] = [LoadAction::DecreaseLoad, LoadAction::HoldLoad, LoadAction::IncreaseLoad];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadAction::DecreaseLoad => "decrease_load",
            LoadAction::HoldLoad => "hold_load",
            LoadAction::IncreaseLoad => "increase_load",
        }
    }
}

impl fmt::Display for LoadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationAction {
    pub action: LoadAction,
    pub q_values: [f64; 3],
    /// Always within [0, 1]
    pub confidence: f64,
}

impl OptimizationAction {
    /// Greedy action over `[decrease, hold, increase]`.
    ///
    /// Confidence is `|max q| / sum |q|`, clamped to [0, 1]. Degenerate inputs
    /// (all zero, or any non-finite value) fall back to hold with zero confidence.
    pub fn from_q_values(q_values: [f64; 3]) -> Self {
        if q_values.iter().any(|q| !q.is_finite()) {
            return Self {
                action: LoadAction::HoldLoad,
                q_values,
                confidence: 0.0,
            };
        }

        let mut best = 1;
        for (i, q) in q_values.iter().enumerate() {
            if *q > q_values[best] {
                best = i;
            }
        }

        let total: f64 = q_values.iter().map(|q| q.abs()).sum();
        let confidence = if total > 0.0 {
            (q_values[best].abs() / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            action: LoadAction::ORDER[best],
            q_values,
            confidence,
        }
    }
}

/// The four scoring models, treated as opaque async calls
#[async_trait]
pub trait ScoringModels: Send + Sync {
    /// Reconstruction-error anomaly check on {vibration, current, temperature}
    async fn detect_anomaly(&self, input: AnomalyInput) -> anyhow::Result<AnomalyResult>;

    /// Next-state prediction from up to the last 10 feature records
    async fn predict_next_state(&self, sequence: &[SensorData]) -> anyhow::Result<PredictionResult>;

    /// Next load value from up to the last 24 kW samples
    async fn forecast_load(&self, history: &[f64]) -> anyhow::Result<LoadForecast>;

    /// Load setpoint recommendation
    async fn optimize_load(&self, input: OptimizationInput) -> anyhow::Result<OptimizationAction>;
}

/// Model identifiers used in errors and logs
pub mod names {
    pub const ANOMALY: &str = "anomaly_detection";
    pub const PREDICTION: &str = "state_prediction";
    pub const FORECAST: &str = "load_forecast";
    pub const OPTIMIZATION: &str = "load_optimization";
}

/// Run one model call with a timeout. A panicking adapter is reported as a
/// failure of that model.
pub async fn guarded<T, F>(model: &'static str, timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(Error::ModelFailure {
            model,
            message: format!("{:#}", e),
        }),
        Ok(Err(panic)) => Err(Error::ModelFailure {
            model,
            message: format!("panicked: {}", panic_message(panic.as_ref())),
        }),
        Err(_) => Err(Error::ModelTimeout { model, timeout }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
