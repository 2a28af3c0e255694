// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Main engine - wires the simulated fleet, the decision engine and the event bus

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{EventBus, PeriodicTask, Scheduler};
use crate::config::Config;
use crate::decision::{ActionType, AlertLevel, DecisionEngine, DecisionEngineResult, SensorSnapshot};
use crate::error::Result;
use crate::models::ScoringModels;
use crate::simulator::SimulationManager;

const EVENT_BUS_CAPACITY: usize = 1024;
const SWEEP_TASK: &str = "decision-sweep";

/// Main Millwright engine
pub struct Engine {
    pub config: Arc<Config>,
    simulation: Arc<SimulationManager>,
    decision: Arc<DecisionEngine>,
    event_bus: Arc<EventBus>,
    scheduler: Scheduler,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(config: Config, models: Arc<dyn ScoringModels>) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let simulation = Arc::new(SimulationManager::new(config.simulation.clone(), models.clone())?);
        let decision = Arc::new(DecisionEngine::new(models, config.decision.clone()));

        Ok(Self {
            config,
            simulation,
            decision,
            event_bus: Arc::new(EventBus::new(EVENT_BUS_CAPACITY)),
            scheduler: Scheduler::new(),
            start_time: None,
        })
    }

    /// Register the configured fleet, start every control loop and the
    /// periodic decision sweep. Calling it on a running engine does nothing.
    pub async fn start(&mut self) -> Result<()> {
        if self.start_time.is_some() {
            return Ok(());
        }
        info!("Starting {} engine...", self.config.app_name);

        for machine in &self.config.machines {
            self.simulation.register_machine(&machine.id, machine.specs);
            self.simulation.set_scenario(&machine.id, machine.scenario).await;

            let bus = self.event_bus.clone();
            self.simulation
                .start_simulation(&machine.id, move |update| bus.publish_update(update.clone()))?;
        }

        let sweep = AnalysisSweep {
            simulation: self.simulation.clone(),
            decision: self.decision.clone(),
            bus: self.event_bus.clone(),
        };
        self.scheduler
            .add_task(SWEEP_TASK, self.config.decision.analysis_interval(), sweep);

        self.start_time = Some(Instant::now());
        info!(
            "{} engine started with {} machine(s)",
            self.config.app_name,
            self.config.machines.len()
        );
        Ok(())
    }

    pub async fn stop(&mut self) {
        info!("Stopping {} engine...", self.config.app_name);
        self.scheduler.shutdown().await;
        self.simulation.shutdown().await;
        self.start_time = None;
        info!("{} engine stopped", self.config.app_name);
    }

    pub fn simulation(&self) -> &Arc<SimulationManager> {
        &self.simulation
    }

    pub fn decision(&self) -> &Arc<DecisionEngine> {
        &self.decision
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

/// Periodic assessment of every registered machine from its latest sample
struct AnalysisSweep {
    simulation: Arc<SimulationManager>,
    decision: Arc<DecisionEngine>,
    bus: Arc<EventBus>,
}

impl AnalysisSweep {
    async fn assess(&self, id: &str) {
        let Some(snapshot) = self.simulation.latest_snapshot(id).await else {
            debug!("No samples for {} yet", id);
            return;
        };
        let load_history = self
            .simulation
            .history(id)
            .await
            .map(|history| history.load_kw)
            .unwrap_or_default();
        let target_load = self
            .simulation
            .target_load(id)
            .await
            .unwrap_or(self.simulation.config().default_target_load);

        let outcome = self
            .decision
            .analyze(id, &snapshot, &load_history, target_load)
            .await;
        self.report(id, &snapshot, outcome);
    }

    /// Publish one assessment outcome. Threshold alerts are raised only when
    /// the models produced no result.
    fn report(&self, id: &str, snapshot: &SensorSnapshot, outcome: Result<DecisionEngineResult>) {
        match outcome {
            Ok(result) => {
                if result.alert_level != AlertLevel::Normal {
                    let message = result.primary_issue.as_deref().unwrap_or(&result.action_reason);
                    self.bus.publish_alert(id, result.alert_level, message);
                }
                if result.recommended_action == ActionType::EmergencyStop {
                    warn!("{}: {} - {}", id, result.recommended_action, result.action_reason);
                }
                self.bus.publish_assessment(result);
            }
            Err(e) => {
                warn!("Assessment failed for {}: {}", id, e);
                self.bus.publish_error(id, &e.to_string());

                let check = self.decision.quick_check(snapshot);
                for issue in &check.critical_issues {
                    self.bus.publish_alert(id, AlertLevel::Critical, issue);
                }
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for AnalysisSweep {
    async fn tick(&mut self) {
        let ids = self.simulation.machine_ids();
        join_all(ids.iter().map(|id| self.assess(id))).await;
    }
}
