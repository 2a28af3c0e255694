// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Min-max scaling and window preparation shared by all models

/// Fixed feature range used to map raw units onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn scale(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * (self.max - self.min) + self.min
    }

    /// Sanitize, clamp into range, then scale
    pub fn scale_clamped(&self, value: f64) -> f64 {
        self.scale(finite_or_zero(value).clamp(self.min, self.max))
    }

    pub fn clamp(&self, value: f64) -> f64 {
        finite_or_zero(value).clamp(self.min, self.max)
    }
}

pub const RPM: FeatureRange = FeatureRange::new(0.0, 3000.0);
pub const LOAD_PERCENT: FeatureRange = FeatureRange::new(0.0, 100.0);
pub const LOAD_KW: FeatureRange = FeatureRange::new(0.0, 15.0);
pub const CURRENT: FeatureRange = FeatureRange::new(0.0, 50.0);
pub const TORQUE: FeatureRange = FeatureRange::new(0.0, 50.0);
pub const VIBRATION: FeatureRange = FeatureRange::new(0.0, 10.0);
pub const TEMPERATURE: FeatureRange = FeatureRange::new(20.0, 120.0);

/// NaN and infinities become zero
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Last `len` items, left-padded by repeating the first item.
///
/// `fallback` is used only when `items` is empty.
pub fn pad_window<T: Clone>(items: &[T], len: usize, fallback: T) -> Vec<T> {
    if items.len() >= len {
        return items[items.len() - len..].to_vec();
    }

    let first = items.first().cloned().unwrap_or(fallback);
    let mut window = Vec::with_capacity(len);
    window.resize(len - items.len(), first);
    window.extend_from_slice(items);
    window
}
