//! Core engine module - scheduling, pub/sub and the composition root

mod engine;
mod scheduler;
mod event_bus;

pub use engine::Engine;
pub use scheduler::{PeriodicTask, Scheduler};
pub use event_bus::{Event, EventBus, EventPayload, EventType};
