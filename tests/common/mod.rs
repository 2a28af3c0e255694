//! Shared fakes for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use millwright::models::{
    AnomalyInput, AnomalyResult, LoadAction, LoadForecast, OptimizationAction, OptimizationInput,
    PredictionResult, ScoringModels, SensorData,
};
use millwright::simulator::SimulationResult;

/// Which model a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Anomaly,
    Prediction,
    Forecast,
    Optimization,
}

/// Scripted model adapter with call counters
pub struct FakeModels {
    pub anomaly: Mutex<AnomalyResult>,
    pub prediction: Mutex<PredictionResult>,
    pub forecast_kw: Mutex<f64>,
    pub optimization: Mutex<OptimizationAction>,
    failing: Mutex<Vec<Model>>,
    panicking: Mutex<Vec<Model>>,
    slow: Mutex<Option<(Model, Duration)>>,

    pub anomaly_calls: AtomicUsize,
    pub prediction_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
    pub optimization_calls: AtomicUsize,
    pub last_window_len: AtomicUsize,
}

impl FakeModels {
    pub fn new() -> Self {
        Self {
            anomaly: Mutex::new(AnomalyResult {
                is_anomaly: false,
                reconstruction_error: 0.01,
                threshold: 0.0814,
            }),
            prediction: Mutex::new(PredictionResult {
                vibration: 0.3,
                temperature: 40.0,
            }),
            forecast_kw: Mutex::new(5.0),
            optimization: Mutex::new(OptimizationAction::from_q_values([0.1, 0.8, 0.1])),
            failing: Mutex::new(Vec::new()),
            panicking: Mutex::new(Vec::new()),
            slow: Mutex::new(None),
            anomaly_calls: AtomicUsize::new(0),
            prediction_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
            optimization_calls: AtomicUsize::new(0),
            last_window_len: AtomicUsize::new(0),
        }
    }

    pub fn with_action(self, action: LoadAction) -> Self {
        let q_values = match action {
            LoadAction::DecreaseLoad => [0.9, 0.05, 0.05],
            LoadAction::HoldLoad => [0.05, 0.9, 0.05],
            LoadAction::IncreaseLoad => [0.05, 0.05, 0.9],
        };
        *self.optimization.lock() = OptimizationAction::from_q_values(q_values);
        self
    }

    pub fn with_anomaly(self, is_anomaly: bool, reconstruction_error: f64) -> Self {
        *self.anomaly.lock() = AnomalyResult {
            is_anomaly,
            reconstruction_error,
            threshold: 0.0814,
        };
        self
    }

    pub fn with_prediction(self, vibration: f64, temperature: f64) -> Self {
        *self.prediction.lock() = PredictionResult { vibration, temperature };
        self
    }

    pub fn failing(self, model: Model) -> Self {
        self.failing.lock().push(model);
        self
    }

    /// The adapter crashes instead of returning an error
    pub fn panicking(self, model: Model) -> Self {
        self.panicking.lock().push(model);
        self
    }

    pub fn slow(self, model: Model, delay: Duration) -> Self {
        *self.slow.lock() = Some((model, delay));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn behave(&self, model: Model) -> anyhow::Result<()> {
        let delay = match *self.slow.lock() {
            Some((slow, delay)) if slow == model => Some(delay),
            _ => None,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.lock().contains(&model) {
            let scores: Vec<f64> = Vec::new();
            let _first = scores[0];
        }
        if self.failing.lock().contains(&model) {
            anyhow::bail!("{:?} session unavailable", model);
        }
        Ok(())
    }
}

#[async_trait]
impl ScoringModels for FakeModels {
    async fn detect_anomaly(&self, _input: AnomalyInput) -> anyhow::Result<AnomalyResult> {
        self.anomaly_calls.fetch_add(1, Ordering::SeqCst);
        self.behave(Model::Anomaly).await?;
        Ok(*self.anomaly.lock())
    }

    async fn predict_next_state(&self, sequence: &[SensorData]) -> anyhow::Result<PredictionResult> {
        self.prediction_calls.fetch_add(1, Ordering::SeqCst);
        self.last_window_len.store(sequence.len(), Ordering::SeqCst);
        self.behave(Model::Prediction).await?;
        Ok(*self.prediction.lock())
    }

    async fn forecast_load(&self, _history: &[f64]) -> anyhow::Result<LoadForecast> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        self.behave(Model::Forecast).await?;
        Ok(LoadForecast {
            predicted_load: *self.forecast_kw.lock(),
            timestamp: Utc::now(),
        })
    }

    async fn optimize_load(&self, _input: OptimizationInput) -> anyhow::Result<OptimizationAction> {
        self.optimization_calls.fetch_add(1, Ordering::SeqCst);
        self.behave(Model::Optimization).await?;
        Ok(*self.optimization.lock())
    }
}

/// Listener that keeps every result it receives
pub fn recorder() -> (
    impl Fn(&SimulationResult) + Send + Sync + 'static,
    Arc<Mutex<Vec<SimulationResult>>>,
) {
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    (move |result: &SimulationResult| sink.lock().push(result.clone()), results)
}
