// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Decision engine - synthesizes the four model outputs into a health
//! assessment and a single recommended action
//!
//! [`DecisionEngine::analyze`] runs all models concurrently and is
//! all-or-nothing: if any model fails or times out, no result is produced.
//! [`DecisionEngine::assess`] is the pure rule evaluation over outputs that
//! have already been obtained.

mod report;

pub use report::generate_report;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DecisionConfig;
use crate::error::Result;
use crate::models::scaling::finite_or_zero;
use crate::models::{
    guarded, names, AnomalyInput, AnomalyResult, LoadAction, LoadForecast, OptimizationAction,
    OptimizationInput, PredictionResult, ScoringModels, SensorData,
};

/// Coarse health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended operator action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    None,
    Monitor,
    ScheduleMaintenance,
    EmergencyStop,
    OptimizeLoad,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::None => "none",
            ActionType::Monitor => "monitor",
            ActionType::ScheduleMaintenance => "schedule_maintenance",
            ActionType::EmergencyStop => "emergency_stop",
            ActionType::OptimizeLoad => "optimize_load",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time sensor values fed to `analyze`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub rpm: f64,
    /// mm/s
    pub vibration: f64,
    /// °C
    pub temperature: f64,
    /// A
    pub current: f64,
    pub load: f64,
    pub timestamp: DateTime<Utc>,
}

impl SensorSnapshot {
    /// Snapshot of the most recent simulated sample
    pub fn from_sensor_data(data: &SensorData, timestamp: DateTime<Utc>) -> Self {
        Self {
            rpm: data.rpm,
            vibration: data.vibration,
            temperature: data.temperature,
            current: data.current,
            load: data.load_percent,
            timestamp,
        }
    }

    fn sanitized(&self) -> Self {
        Self {
            rpm: finite_or_zero(self.rpm),
            vibration: finite_or_zero(self.vibration),
            temperature: finite_or_zero(self.temperature),
            current: finite_or_zero(self.current),
            load: finite_or_zero(self.load),
            timestamp: self.timestamp,
        }
    }

    /// One-record prediction input; power and torque are not part of a snapshot
    fn as_sensor_data(&self) -> SensorData {
        SensorData {
            rpm: self.rpm,
            load_percent: self.load,
            load_kw: 0.0,
            current: self.current,
            torque: 0.0,
            vibration: self.vibration,
            temperature: self.temperature,
        }
    }
}

/// Raw outputs of the four models for one analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutputs {
    pub anomaly: AnomalyResult,
    pub prediction: PredictionResult,
    pub forecast: LoadForecast,
    pub optimization: OptimizationAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEngineResult {
    pub timestamp: DateTime<Utc>,
    pub machine_id: String,

    pub anomaly_detection: AnomalyResult,
    pub state_prediction: PredictionResult,
    pub load_forecast: LoadForecast,
    pub load_optimization: OptimizationAction,

    pub health_score: u8,
    pub alert_level: AlertLevel,
    pub primary_issue: Option<String>,

    pub recommended_action: ActionType,
    /// 1-5, 5 is most urgent
    pub action_priority: u8,
    pub action_reason: String,
    pub action_details: Vec<String>,

    /// Hours; `None` while healthy or when the trend is not worsening
    pub estimated_time_to_failure: Option<f64>,
    pub maintenance_confidence: f64,

    pub risk_score: u8,
    pub performance_score: u8,
    pub efficiency_score: u8,
}

/// Result of the model-free check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCheck {
    pub is_healthy: bool,
    pub critical_issues: Vec<String>,
}

struct Recommendation {
    action: ActionType,
    priority: u8,
    reason: &'static str,
    details: Vec<String>,
}

pub struct DecisionEngine {
    models: Arc<dyn ScoringModels>,
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(models: Arc<dyn ScoringModels>, config: DecisionConfig) -> Self {
        Self { models, config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Run every model once, concurrently, then apply the scoring rules
    pub async fn analyze(
        &self,
        machine_id: &str,
        snapshot: &SensorSnapshot,
        load_history: &[f64],
        target_load: f64,
    ) -> Result<DecisionEngineResult> {
        let sensor = snapshot.sanitized();
        let load_history: Vec<f64> = load_history.iter().map(|kw| finite_or_zero(*kw)).collect();
        let sequence = [sensor.as_sensor_data()];
        let timeout = self.config.model_timeout();

        let (anomaly, prediction, forecast, optimization) = tokio::try_join!(
            guarded(
                names::ANOMALY,
                timeout,
                self.models.detect_anomaly(AnomalyInput {
                    vibration: sensor.vibration,
                    current: sensor.current,
                    temperature: sensor.temperature,
                }),
            ),
            guarded(names::PREDICTION, timeout, self.models.predict_next_state(&sequence)),
            guarded(names::FORECAST, timeout, self.models.forecast_load(&load_history)),
            guarded(
                names::OPTIMIZATION,
                timeout,
                self.models.optimize_load(OptimizationInput {
                    vibration: sensor.vibration,
                    temperature: sensor.temperature,
                    load_percent: sensor.load,
                }),
            ),
        )?;

        let result = self.assess(
            machine_id,
            &sensor,
            target_load,
            ModelOutputs {
                anomaly,
                prediction,
                forecast,
                optimization,
            },
        );
        debug!(
            "Analysis for {}: health={} risk={} alert={} action={}",
            machine_id, result.health_score, result.risk_score, result.alert_level, result.recommended_action
        );
        Ok(result)
    }

    /// Apply the scoring rules to model outputs that are already available
    pub fn assess(
        &self,
        machine_id: &str,
        sensor: &SensorSnapshot,
        target_load: f64,
        outputs: ModelOutputs,
    ) -> DecisionEngineResult {
        let sensor = sensor.sanitized();
        let ModelOutputs {
            anomaly,
            prediction,
            forecast,
            optimization,
        } = outputs;

        let health_score = self.health_score(&sensor, &anomaly, &prediction);
        let alert_level = self.alert_level(&sensor, &anomaly, health_score);
        let primary_issue = self.primary_issue(&sensor, &anomaly, &prediction);
        let risk_score = self.risk_score(&sensor, &anomaly, &prediction);
        let performance_score = performance_score(&sensor, target_load);
        let efficiency_score = efficiency_score(&sensor, &optimization);
        let recommendation = self.recommend(alert_level, &anomaly, &sensor, &optimization, risk_score);
        let (estimated_time_to_failure, maintenance_confidence) =
            self.time_to_failure(&anomaly, &sensor, &prediction);

        DecisionEngineResult {
            timestamp: Utc::now(),
            machine_id: machine_id.to_string(),
            anomaly_detection: anomaly,
            state_prediction: prediction,
            load_forecast: forecast,
            load_optimization: optimization,
            health_score,
            alert_level,
            primary_issue,
            recommended_action: recommendation.action,
            action_priority: recommendation.priority,
            action_reason: recommendation.reason.to_string(),
            action_details: recommendation.details,
            estimated_time_to_failure,
            maintenance_confidence,
            risk_score,
            performance_score,
            efficiency_score,
        }
    }

    /// Threshold check that needs no model output
    pub fn quick_check(&self, sensor: &SensorSnapshot) -> QuickCheck {
        let sensor = sensor.sanitized();
        let mut critical_issues = Vec::new();

        if sensor.vibration > self.config.high_vibration * 1.5 {
            critical_issues.push("CRITICAL: Excessive vibration".to_string());
        }
        if sensor.temperature > self.config.critical_temperature {
            critical_issues.push("CRITICAL: Temperature too high".to_string());
        }

        QuickCheck {
            is_healthy: critical_issues.is_empty(),
            critical_issues,
        }
    }

    /// Plain-text maintenance report for a result produced by this engine
    pub fn generate_report(&self, result: &DecisionEngineResult) -> String {
        generate_report(result, self.config.anomaly_threshold)
    }

    fn anomaly_ratio(&self, anomaly: &AnomalyResult) -> f64 {
        finite_or_zero(anomaly.reconstruction_error).max(0.0) / self.config.anomaly_threshold
    }

    fn health_score(&self, sensor: &SensorSnapshot, anomaly: &AnomalyResult, prediction: &PredictionResult) -> u8 {
        let cfg = &self.config;
        let mut score = 100.0;

        if anomaly.is_anomaly {
            score -= (self.anomaly_ratio(anomaly) * 30.0).min(40.0);
        }
        if sensor.vibration > cfg.high_vibration {
            score -= (sensor.vibration - cfg.high_vibration) * 20.0;
        }
        if sensor.temperature > cfg.high_temperature {
            score -= (sensor.temperature - cfg.high_temperature) * 2.0;
        }
        if vibration_rising(sensor, prediction, 1.1) {
            score -= 10.0;
        }
        if prediction.temperature > sensor.temperature * 1.05 {
            score -= 5.0;
        }

        to_score(score)
    }

    /// Any single critical signal is enough; critical wins over warning
    fn alert_level(&self, sensor: &SensorSnapshot, anomaly: &AnomalyResult, health_score: u8) -> AlertLevel {
        let cfg = &self.config;
        let error = finite_or_zero(anomaly.reconstruction_error);

        if (anomaly.is_anomaly && error >= cfg.anomaly_threshold * 2.0)
            || sensor.vibration > cfg.high_vibration * 1.5
            || sensor.temperature > cfg.critical_temperature
            || health_score < 50
        {
            return AlertLevel::Critical;
        }

        if anomaly.is_anomaly
            || sensor.vibration > cfg.high_vibration
            || sensor.temperature > cfg.high_temperature
            || health_score < 75
        {
            return AlertLevel::Warning;
        }

        AlertLevel::Normal
    }

    /// Highest-weight issue; on equal weight the earlier check wins
    fn primary_issue(&self, sensor: &SensorSnapshot, anomaly: &AnomalyResult, prediction: &PredictionResult) -> Option<String> {
        let cfg = &self.config;
        let mut issues: Vec<(f64, String)> = Vec::new();

        if anomaly.is_anomaly {
            issues.push((
                self.anomaly_ratio(anomaly) * 10.0,
                format!("Anomaly detected (error: {:.4})", anomaly.reconstruction_error),
            ));
        }

        if sensor.vibration > cfg.high_vibration * 1.5 {
            issues.push((9.0, format!("Critical vibration ({:.3} mm/s)", sensor.vibration)));
        } else if sensor.vibration > cfg.high_vibration {
            issues.push((7.0, format!("High vibration ({:.3} mm/s)", sensor.vibration)));
        }

        if sensor.temperature > cfg.critical_temperature {
            issues.push((9.0, format!("Critical temperature ({:.1}°C)", sensor.temperature)));
        } else if sensor.temperature > cfg.high_temperature {
            issues.push((6.0, format!("High temperature ({:.1}°C)", sensor.temperature)));
        }

        if vibration_rising(sensor, prediction, 1.2) {
            issues.push((5.0, "Vibration trending upward - possible bearing wear".to_string()));
        }

        let mut best: Option<(f64, String)> = None;
        for (weight, message) in issues {
            match &best {
                Some((top, _)) if weight <= *top => {}
                _ => best = Some((weight, message)),
            }
        }
        best.map(|(_, message)| message)
    }

    fn risk_score(&self, sensor: &SensorSnapshot, anomaly: &AnomalyResult, prediction: &PredictionResult) -> u8 {
        let mut risk = 0.0;

        if anomaly.is_anomaly {
            risk += (self.anomaly_ratio(anomaly) * 40.0).min(40.0);
        }
        risk += (sensor.vibration / 2.0 * 30.0).clamp(0.0, 30.0);
        risk += ((sensor.temperature - 60.0) / 40.0 * 20.0).clamp(0.0, 20.0);
        if vibration_rising(sensor, prediction, 1.1) {
            risk += 10.0;
        }

        to_score(risk)
    }

    /// First matching rule wins, most severe first
    fn recommend(
        &self,
        alert_level: AlertLevel,
        anomaly: &AnomalyResult,
        sensor: &SensorSnapshot,
        optimization: &OptimizationAction,
        risk_score: u8,
    ) -> Recommendation {
        let cfg = &self.config;

        if alert_level == AlertLevel::Critical
            && (sensor.vibration > cfg.high_vibration * 2.0
                || sensor.temperature > cfg.critical_temperature + 5.0)
        {
            return Recommendation {
                action: ActionType::EmergencyStop,
                priority: 5,
                reason: "Critical safety threshold exceeded",
                details: vec![
                    "Immediate shutdown required".to_string(),
                    "Contact maintenance team".to_string(),
                    "Inspect for mechanical damage".to_string(),
                    "Do not restart until cleared".to_string(),
                ],
            };
        }

        if alert_level == AlertLevel::Critical || risk_score > 80 {
            let mut details = vec!["Schedule immediate maintenance inspection".to_string()];
            if anomaly.is_anomaly {
                details.push("Anomaly detected - check bearings and alignment".to_string());
            }
            if sensor.vibration > cfg.high_vibration {
                details.push(format!(
                    "High vibration ({:.3}) - inspect mechanical components",
                    sensor.vibration
                ));
            }
            if sensor.temperature > cfg.high_temperature {
                details.push(format!(
                    "High temperature ({:.1}°C) - check cooling system",
                    sensor.temperature
                ));
            }
            return Recommendation {
                action: ActionType::ScheduleMaintenance,
                priority: 4,
                reason: "Multiple fault indicators detected",
                details,
            };
        }

        if alert_level == AlertLevel::Warning || risk_score > 50 {
            let mut details = vec![
                "Increase monitoring frequency".to_string(),
                "Review maintenance schedule".to_string(),
            ];
            if anomaly.is_anomaly {
                details.push("Anomaly detected - trend analysis recommended".to_string());
            }
            return Recommendation {
                action: ActionType::Monitor,
                priority: 3,
                reason: "Early warning indicators present",
                details,
            };
        }

        if optimization.action != LoadAction::HoldLoad && optimization.confidence > 0.7 {
            let direction = if optimization.action == LoadAction::IncreaseLoad {
                "Increase"
            } else {
                "Decrease"
            };
            return Recommendation {
                action: ActionType::OptimizeLoad,
                priority: 2,
                reason: "Load optimization opportunity detected",
                details: vec![
                    format!("{} load for optimal efficiency", direction),
                    format!("Current load: {:.1}%", sensor.load),
                    format!("Confidence: {:.1}%", optimization.confidence * 100.0),
                ],
            };
        }

        Recommendation {
            action: ActionType::None,
            priority: 1,
            reason: "All systems operating normally",
            details: vec![
                "Continue normal operations".to_string(),
                "Maintain regular monitoring schedule".to_string(),
            ],
        }
    }

    /// Linear extrapolation of the predicted vibration increase up to the
    /// failure ceiling, one prediction cycle per second
    fn time_to_failure(
        &self,
        anomaly: &AnomalyResult,
        sensor: &SensorSnapshot,
        prediction: &PredictionResult,
    ) -> (Option<f64>, f64) {
        let cfg = &self.config;

        if !anomaly.is_anomaly && sensor.vibration <= cfg.high_vibration {
            return (None, 0.0);
        }

        let increase = finite_or_zero(prediction.vibration) - sensor.vibration;
        if increase <= 0.0 {
            return (None, 0.3);
        }

        let margin = cfg.failure_vibration - sensor.vibration;
        let hours = margin / increase / 3600.0;

        let mut confidence: f64 = 0.5;
        if anomaly.is_anomaly {
            confidence += 0.2;
        }
        if increase > cfg.min_trend {
            confidence += 0.2;
        }

        (Some(hours.max(0.0)), confidence.min(0.95))
    }
}

fn vibration_rising(sensor: &SensorSnapshot, prediction: &PredictionResult, factor: f64) -> bool {
    prediction.vibration > sensor.vibration * factor
}

/// Penalized by relative deviation from the target load
fn performance_score(sensor: &SensorSnapshot, target_load: f64) -> u8 {
    let mut score = 100.0;
    if target_load.is_finite() && target_load > 0.0 {
        score -= (sensor.load - target_load).abs() / target_load * 30.0;
    }
    to_score(score)
}

fn efficiency_score(sensor: &SensorSnapshot, optimization: &OptimizationAction) -> u8 {
    let mut score = 100.0;

    match optimization.action {
        LoadAction::DecreaseLoad => score -= 15.0,
        LoadAction::IncreaseLoad => score -= 10.0,
        LoadAction::HoldLoad => {}
    }

    // Rough draw expected for the current load
    let expected_current = sensor.load * 0.3;
    if sensor.current > expected_current * 1.2 {
        score -= 20.0;
    }

    to_score(score)
}

fn to_score(value: f64) -> u8 {
    finite_or_zero(value).round().clamp(0.0, 100.0) as u8
}

/// Plausible kW history around `current_load` for callers that have none
pub fn synthetic_load_history<R: Rng + ?Sized>(current_load: f64, len: usize, rng: &mut R) -> Vec<f64> {
    let current_load = finite_or_zero(current_load);
    (0..len)
        .map(|i| {
            let variation = (rng.gen::<f64>() - 0.5) * current_load * 0.15;
            let trend = (i as f64 * 0.2).sin() * current_load * 0.1;
            let load = (current_load + variation + trend).max(0.0);
            (load * 100.0).round() / 100.0
        })
        .collect()
}
