// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Event bus for inter-component communication

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::decision::{AlertLevel, DecisionEngineResult};
use crate::simulator::SimulationResult;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    Update,
    Assessment,
    Alert,
    Error,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize)]
pub enum EventPayload {
    Update(SimulationResult),
    Assessment(Box<DecisionEngineResult>),
    Alert {
        machine_id: String,
        level: AlertLevel,
        message: String,
    },
    Error {
        machine_id: String,
        message: String,
    },
}

/// Central event bus for pub/sub communication
///
/// Sends never block; slow subscribers observe `RecvError::Lagged`.
pub struct EventBus {
    update_tx: broadcast::Sender<SimulationResult>,
    assessment_tx: broadcast::Sender<DecisionEngineResult>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (update_tx, _) = broadcast::channel(capacity);
        let (assessment_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            update_tx,
            assessment_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_update(&self, update: SimulationResult) {
        let _ = self.update_tx.send(update.clone());
        self.publish_event(EventType::Update, EventPayload::Update(update));
    }

    pub fn publish_assessment(&self, assessment: DecisionEngineResult) {
        let _ = self.assessment_tx.send(assessment.clone());
        self.publish_event(EventType::Assessment, EventPayload::Assessment(Box::new(assessment)));
    }

    pub fn publish_alert(&self, machine_id: &str, level: AlertLevel, message: &str) {
        self.publish_event(
            EventType::Alert,
            EventPayload::Alert {
                machine_id: machine_id.to_string(),
                level,
                message: message.to_string(),
            },
        );
    }

    pub fn publish_error(&self, machine_id: &str, message: &str) {
        self.publish_event(
            EventType::Error,
            EventPayload::Error {
                machine_id: machine_id.to_string(),
                message: message.to_string(),
            },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            timestamp: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<SimulationResult> {
        self.update_tx.subscribe()
    }

    pub fn subscribe_assessments(&self) -> broadcast::Receiver<DecisionEngineResult> {
        self.assessment_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}
