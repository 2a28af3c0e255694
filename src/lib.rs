// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Millwright - simulated industrial machines with predictive maintenance
//!
//! Each registered machine runs its own control loop: physics advances one
//! step, the derived sensor sample is scored by the models, and the load
//! optimizer nudges the machine's target load. A decision engine turns a
//! snapshot plus the model outputs into a health assessment and a single
//! recommended action.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Millwright Engine                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────────┐   │
//! │  │  Physics   │ → │ Simulation  │ → │    Decision    │   │
//! │  │  Engine    │   │  Manager    │   │    Engine      │   │
//! │  └────────────┘   └─────────────┘   └────────────────┘   │
//! │         ↓                ↓                  ↓            │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │              Scoring Models / Event Bus            │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod decision;
pub mod error;
pub mod models;
pub mod simulator;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, EventBus};
pub use decision::{DecisionEngine, DecisionEngineResult, SensorSnapshot};
pub use error::{Error, Result};
pub use models::{BaselineModels, ScoringModels};
pub use simulator::{PhysicsEngine, SimulationManager, SimulationResult, SimulationScenario};

/// Millwright version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Millwright name
pub const NAME: &str = "Millwright";
