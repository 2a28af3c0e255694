// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor derivation and rolling history

use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::models::scaling::{self, finite_or_zero};
use crate::models::SensorData;
use super::MachineState;

/// Supply voltage assumed when estimating current from power
pub const SUPPLY_VOLTAGE: f64 = 220.0;

impl SensorData {
    /// Estimate the model feature record from physical state.
    ///
    /// Current comes from `P = V*I`, torque from `P = T*w`. Both are clamped to
    /// the models' input ranges; torque is zero while the shaft is stopped.
    pub fn from_state(state: &MachineState) -> Self {
        let power_w = finite_or_zero(state.power) * 1000.0;
        let current = scaling::CURRENT.clamp(power_w / SUPPLY_VOLTAGE);

        let angular_velocity = finite_or_zero(state.rpm) * 2.0 * PI / 60.0;
        let torque = if angular_velocity > 0.0 {
            scaling::TORQUE.clamp(power_w / angular_velocity)
        } else {
            0.0
        };

        Self {
            rpm: finite_or_zero(state.rpm),
            load_percent: finite_or_zero(state.load),
            load_kw: finite_or_zero(state.power),
            current,
            torque,
            vibration: finite_or_zero(state.vibration),
            temperature: finite_or_zero(state.temperature),
        }
    }
}

/// Bounded FIFO; pushing past capacity evicts the oldest entry
#[derive(Debug, Clone)]
pub(crate) struct History<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        if self.capacity > 0 {
            self.buffer.push_back(value);
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }

    /// Most recent `len` entries, oldest first
    pub fn tail(&self, len: usize) -> Vec<T> {
        let skip = self.buffer.len().saturating_sub(len);
        self.buffer.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state(rpm: f64, power: f64) -> MachineState {
        MachineState {
            rpm,
            temperature: 60.0,
            vibration: 6.0,
            power,
            load: 75.0,
            efficiency: 95.0,
            noise: 80.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_current_and_torque_estimates() {
        let data = SensorData::from_state(&state(3000.0, 2.2));
        assert!((data.current - 10.0).abs() < 1e-9);
        let expected_torque = 2200.0 / (3000.0 * 2.0 * PI / 60.0);
        assert!((data.torque - expected_torque).abs() < 1e-9);
    }

    #[test]
    fn test_estimates_clamped_to_model_ranges() {
        let data = SensorData::from_state(&state(10.0, 22.0));
        assert_eq!(data.current, 50.0);
        assert_eq!(data.torque, 50.0);
    }

    #[test]
    fn test_stopped_shaft_has_no_torque() {
        let data = SensorData::from_state(&state(0.0, 5.0));
        assert_eq!(data.torque, 0.0);
        assert!(data.torque.is_finite());
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = History::new(24);
        for i in 0..100 {
            history.push(i);
            assert!(history.len() <= 24);
        }
        assert_eq!(history.len(), 24);
        assert_eq!(history.to_vec().first(), Some(&76));
        assert_eq!(history.latest(), Some(&99));
        assert_eq!(history.tail(3), vec![97, 98, 99]);
    }
}
