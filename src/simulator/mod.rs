//! Simulator module - machine physics, derived sensor streams and control loops

mod physics;
mod sensor;
mod manager;

pub use physics::{MachineSpecs, MachineState, PhysicsEngine, ScenarioProfile, SimulationScenario, AMBIENT_TEMP};
pub use sensor::SUPPLY_VOLTAGE;
pub use manager::{Listener, MachineHistory, SimulationManager, SimulationResult};
