// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Built-in deterministic models
//!
//! Closed-form stand-ins for trained inference sessions. They honour the same
//! input contracts (fixed feature ranges, left-padded windows, sanitized inputs)
//! so the rest of the system behaves the same against either.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use super::scaling::{self, pad_window};
use super::{
    AnomalyInput, AnomalyResult, LoadForecast, OptimizationAction, OptimizationInput,
    PredictionResult, ScoringModels, SensorData,
};
use crate::config::ModelConfig;

pub const PREDICTION_WINDOW: usize = 10;
pub const FORECAST_WINDOW: usize = 24;

/// Scaled current at full load and rated speed
const FULL_LOAD_CURRENT: f64 = 1.27;

// Holt smoothing factors for the load forecast
const LEVEL_ALPHA: f64 = 0.5;
const TREND_BETA: f64 = 0.3;

pub struct BaselineModels {
    anomaly_threshold: f64,
    forecast_horizon: ChronoDuration,
}

impl BaselineModels {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            anomaly_threshold: config.anomaly_threshold,
            forecast_horizon: ChronoDuration::seconds(config.forecast_horizon_secs),
        }
    }

    /// Healthy-profile reconstruction of a scaled [vibration, current, temperature] triple
    fn reconstruct(current: f64) -> [f64; 3] {
        let load = (current / FULL_LOAD_CURRENT).clamp(0.0, 1.0);
        [
            (0.2 + 0.7 * load).clamp(0.0, 1.0),
            current,
            (0.05 + 0.51 * load).clamp(0.0, 1.0),
        ]
    }
}

impl Default for BaselineModels {
    fn default() -> Self {
        Self::new(&ModelConfig::default())
    }
}

#[async_trait]
impl ScoringModels for BaselineModels {
    async fn detect_anomaly(&self, input: AnomalyInput) -> anyhow::Result<AnomalyResult> {
        let scaled = [
            scaling::VIBRATION.scale_clamped(input.vibration),
            scaling::CURRENT.scale_clamped(input.current),
            scaling::TEMPERATURE.scale_clamped(input.temperature),
        ];
        let reconstruction = Self::reconstruct(scaled[1]);

        let mse = scaled
            .iter()
            .zip(reconstruction.iter())
            .map(|(x, r)| (x - r).powi(2))
            .sum::<f64>()
            / 3.0;

        Ok(AnomalyResult {
            is_anomaly: mse > self.anomaly_threshold,
            reconstruction_error: mse,
            threshold: self.anomaly_threshold,
        })
    }

    async fn predict_next_state(&self, sequence: &[SensorData]) -> anyhow::Result<PredictionResult> {
        let window = pad_window(sequence, PREDICTION_WINDOW, SensorData::default());
        let first = &window[0];
        let last = &window[PREDICTION_WINDOW - 1];

        let load_first = scaling::LOAD_PERCENT.scale_clamped(first.load_percent);
        let load_last = scaling::LOAD_PERCENT.scale_clamped(last.load_percent);
        let rpm = scaling::RPM.scale_clamped(last.rpm);

        let load_trend = (load_last - load_first) / (PREDICTION_WINDOW - 1) as f64;
        let next_load = (load_last + load_trend).clamp(0.0, 1.0);

        let vibration = (0.2 + 0.7 * next_load + 0.05 * rpm).clamp(0.0, 1.0);
        let temperature = (0.05 + 0.48 * next_load * (rpm * rpm + 0.2)).clamp(0.0, 1.0);

        Ok(PredictionResult {
            vibration: scaling::VIBRATION.inverse(vibration),
            temperature: scaling::TEMPERATURE.inverse(temperature),
        })
    }

    async fn forecast_load(&self, history: &[f64]) -> anyhow::Result<LoadForecast> {
        let window = pad_window(history, FORECAST_WINDOW, 0.0);
        let mut scaled = window.iter().map(|kw| scaling::LOAD_KW.scale_clamped(*kw));

        let mut level = scaled.next().unwrap_or(0.0);
        let mut trend = 0.0;
        for value in scaled {
            let previous = level;
            level = LEVEL_ALPHA * value + (1.0 - LEVEL_ALPHA) * (level + trend);
            trend = TREND_BETA * (level - previous) + (1.0 - TREND_BETA) * trend;
        }

        let predicted = (level + trend).clamp(0.0, 1.0);
        Ok(LoadForecast {
            predicted_load: scaling::LOAD_KW.inverse(predicted),
            timestamp: Utc::now() + self.forecast_horizon,
        })
    }

    async fn optimize_load(&self, input: OptimizationInput) -> anyhow::Result<OptimizationAction> {
        let vibration = scaling::VIBRATION.scale_clamped(input.vibration);
        let temperature = scaling::TEMPERATURE.scale_clamped(input.temperature);
        let load = scaling::LOAD_PERCENT.scale_clamped(input.load_percent);

        // Scaled 0.75 vibration is 7.5 mm/s, scaled 0.6 temperature is 80 °C
        let stress = (vibration - 0.75).max(0.0) + (temperature - 0.6).max(0.0);

        let decrease = 2.0 * stress + (load - 0.9).max(0.0);
        let hold = (0.3 - (load - 0.7).abs() * 0.5).max(0.0);
        let increase = ((0.5 - load).max(0.0) - stress).max(0.0);

        Ok(OptimizationAction::from_q_values([decrease, hold, increase]))
    }
}
