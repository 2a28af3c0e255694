// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Simulation manager - one independent control loop per machine

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::sensor::History;
use super::{MachineSpecs, MachineState, PhysicsEngine, SimulationScenario};
use crate::config::SimulationConfig;
use crate::core::{PeriodicTask, Scheduler};
use crate::decision::SensorSnapshot;
use crate::error::{Error, Result};
use crate::models::{
    guarded, names, AnomalyResult, LoadAction, OptimizationAction, PredictionResult, ScoringModels,
    SensorData,
};

/// Published once per tick. Model fields are `None` when the model was not
/// due this tick or its call failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub machine_id: String,
    pub state: MachineState,
    pub anomaly: Option<AnomalyResult>,
    pub optimization: Option<OptimizationAction>,
    pub prediction: Option<PredictionResult>,
    pub target_load: f64,
}

/// Callback receiving every tick's result
pub type Listener = Arc<dyn Fn(&SimulationResult) + Send + Sync>;

/// Copies of a machine's rolling buffers, oldest first
#[derive(Debug, Clone)]
pub struct MachineHistory {
    pub samples: Vec<SensorData>,
    pub load_kw: Vec<f64>,
}

/// Everything owned by one machine's slot
struct MachineSim {
    engine: PhysicsEngine,
    history: History<SensorData>,
    load_history: History<f64>,
    target_load: f64,
    last_optimization: Option<Instant>,
}

impl MachineSim {
    fn new(engine: PhysicsEngine, config: &SimulationConfig) -> Self {
        Self {
            engine,
            history: History::new(config.history_capacity),
            load_history: History::new(config.history_capacity),
            target_load: config.default_target_load,
            last_optimization: None,
        }
    }

    async fn step(&mut self, id: &str, config: &SimulationConfig, models: &dyn ScoringModels) -> SimulationResult {
        let state = self.engine.update(config.time_step_secs, config.target_rpm, self.target_load);
        let sample = SensorData::from_state(&state);

        self.history.push(sample);
        self.load_history.push(sample.load_kw);

        let timeout = config.model_timeout();

        let anomaly = observe(
            id,
            guarded(names::ANOMALY, timeout, models.detect_anomaly(sample.anomaly_input())).await,
        );

        let optimization = if self.optimization_due(config) {
            self.last_optimization = Some(Instant::now());
            let verdict = observe(
                id,
                guarded(names::OPTIMIZATION, timeout, models.optimize_load(sample.optimization_input())).await,
            );
            if let Some(verdict) = &verdict {
                self.apply_optimization(id, verdict, config);
            }
            verdict
        } else {
            None
        };

        let prediction = if self.history.len() >= config.prediction_window {
            let window = self.history.tail(config.prediction_window);
            observe(
                id,
                guarded(names::PREDICTION, timeout, models.predict_next_state(&window)).await,
            )
        } else {
            None
        };

        SimulationResult {
            machine_id: id.to_string(),
            state,
            anomaly,
            optimization,
            prediction,
            target_load: self.target_load,
        }
    }

    fn optimization_due(&self, config: &SimulationConfig) -> bool {
        match self.last_optimization {
            Some(last) => last.elapsed() > config.optimization_cooldown(),
            None => true,
        }
    }

    fn apply_optimization(&mut self, id: &str, verdict: &OptimizationAction, config: &SimulationConfig) {
        let requested = match verdict.action {
            LoadAction::DecreaseLoad => self.target_load - config.load_step,
            LoadAction::IncreaseLoad => self.target_load + config.load_step,
            LoadAction::HoldLoad => self.target_load,
        };
        let next = requested.clamp(config.min_target_load, config.max_target_load);

        if next != self.target_load {
            info!("[optimizer] {} load for {}: {:.0}% -> {:.0}%", verdict.action, id, self.target_load, next);
        }
        self.target_load = next;
    }
}

/// Log a model failure and drop it; the tick carries on without that output
fn observe<T>(id: &str, outcome: Result<T>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Model inference failed for {}: {}", id, e);
            None
        }
    }
}

/// The scheduled loop body for one machine
struct MachineLoop {
    id: String,
    machine: Arc<Mutex<MachineSim>>,
    models: Arc<dyn ScoringModels>,
    config: SimulationConfig,
    listener: Listener,
}

#[async_trait]
impl PeriodicTask for MachineLoop {
    async fn tick(&mut self) {
        let result = {
            let mut sim = self.machine.lock().await;
            sim.step(&self.id, &self.config, self.models.as_ref()).await
        };

        let listener = &self.listener;
        if catch_unwind(AssertUnwindSafe(|| listener(&result))).is_err() {
            error!("Listener for {} panicked; simulation continues", self.id);
        }
    }
}

/// Registry of simulated machines and their control loops
pub struct SimulationManager {
    config: SimulationConfig,
    models: Arc<dyn ScoringModels>,
    machines: RwLock<HashMap<String, Arc<Mutex<MachineSim>>>>,
    scheduler: Scheduler,
}

impl SimulationManager {
    pub fn new(config: SimulationConfig, models: Arc<dyn ScoringModels>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            models,
            machines: RwLock::new(HashMap::new()),
            scheduler: Scheduler::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Register a machine with fresh state. Returns false if the id already exists.
    pub fn register_machine(&self, id: &str, specs: MachineSpecs) -> bool {
        self.register_engine(id, PhysicsEngine::new(specs))
    }

    /// Register a machine driven by a caller-built engine (e.g. seeded)
    pub fn register_engine(&self, id: &str, engine: PhysicsEngine) -> bool {
        let mut machines = self.machines.write();
        if machines.contains_key(id) {
            info!("Machine {} already registered", id);
            return false;
        }
        machines.insert(id.to_string(), Arc::new(Mutex::new(MachineSim::new(engine, &self.config))));
        info!("Registered machine {}", id);
        true
    }

    /// Stop and forget a machine. Registering it again starts from a clean state.
    pub fn unregister_machine(&self, id: &str) -> bool {
        let mut machines = self.machines.write();
        self.scheduler.remove_task(id);
        let removed = machines.remove(id).is_some();
        drop(machines);
        if removed {
            info!("Unregistered machine {}", id);
        }
        removed
    }

    /// Start the periodic loop for `id`. Starting a running machine is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_simulation<F>(&self, id: &str, on_update: F) -> Result<()>
    where
        F: Fn(&SimulationResult) + Send + Sync + 'static,
    {
        // Held until the task is scheduled so an unregister cannot slip in between
        let machines = self.machines.read();
        let machine = machines.get(id).cloned().ok_or_else(|| {
            error!("Machine {} not found in registry", id);
            Error::NotRegistered(id.to_string())
        })?;

        let task = MachineLoop {
            id: id.to_string(),
            machine,
            models: self.models.clone(),
            config: self.config.clone(),
            listener: Arc::new(on_update),
        };

        let started = self.scheduler.add_task(id, self.config.tick_interval(), task);
        drop(machines);

        if started {
            info!("Started simulation for {} every {:?}", id, self.config.tick_interval());
        } else {
            debug!("Simulation for {} already running", id);
        }
        Ok(())
    }

    /// Cancel the loop for `id`; a tick already in progress still completes
    pub fn stop_simulation(&self, id: &str) {
        if self.scheduler.remove_task(id) {
            info!("Stopped simulation for {}", id);
        }
    }

    /// Returns false if `id` is not registered
    pub async fn set_scenario(&self, id: &str, scenario: SimulationScenario) -> bool {
        let Some(machine) = self.machine(id) else {
            return false;
        };
        machine.lock().await.engine.set_scenario(scenario);
        info!("Scenario for {} set to {}", id, scenario);
        true
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.machines.read().contains_key(id)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.scheduler.is_running(id)
    }

    pub fn machine_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.machines.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn state(&self, id: &str) -> Option<MachineState> {
        let machine = self.machine(id)?;
        let sim = machine.lock().await;
        Some(sim.engine.state())
    }

    pub async fn scenario(&self, id: &str) -> Option<SimulationScenario> {
        let machine = self.machine(id)?;
        let sim = machine.lock().await;
        Some(sim.engine.scenario())
    }

    pub async fn target_load(&self, id: &str) -> Option<f64> {
        let machine = self.machine(id)?;
        let sim = machine.lock().await;
        Some(sim.target_load)
    }

    pub async fn history(&self, id: &str) -> Option<MachineHistory> {
        let machine = self.machine(id)?;
        let sim = machine.lock().await;
        Some(MachineHistory {
            samples: sim.history.to_vec(),
            load_kw: sim.load_history.to_vec(),
        })
    }

    /// Latest sample as a decision-engine input; `None` before the first tick
    pub async fn latest_snapshot(&self, id: &str) -> Option<SensorSnapshot> {
        let machine = self.machine(id)?;
        let sim = machine.lock().await;
        let sample = sim.history.latest()?;
        Some(SensorSnapshot::from_sensor_data(sample, sim.engine.state().timestamp))
    }

    /// Stop every loop and wait for in-flight ticks
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        info!("Simulation manager stopped");
    }

    fn machine(&self, id: &str) -> Option<Arc<Mutex<MachineSim>>> {
        self.machines.read().get(id).cloned()
    }
}
