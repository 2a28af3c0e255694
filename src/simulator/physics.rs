// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! First-order machine physics with scenario-driven fault injection

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Ambient temperature in °C
pub const AMBIENT_TEMP: f64 = 25.0;

/// Max RPM change per second under nominal inertia
const RPM_SLEW_RATE: f64 = 200.0;

/// Steady-state temperature the heat model aims for at full load
const NOMINAL_STEADY_TEMP: f64 = 85.0;

/// Efficiency starts dropping above this temperature
const EFFICIENCY_TEMP_KNEE: f64 = 80.0;

/// Fault-injection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationScenario {
    #[default]
    Normal,
    HighLoad,
    Overheating,
    Unbalanced,
    /// High friction: the machine cannot reach its RPM setpoint
    RunningBehind,
}

impl SimulationScenario {
    pub const ALL: [SimulationScenario; 5] = [
        SimulationScenario::Normal,
        SimulationScenario::HighLoad,
        SimulationScenario::Overheating,
        SimulationScenario::Unbalanced,
        SimulationScenario::RunningBehind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationScenario::Normal => "NORMAL",
            SimulationScenario::HighLoad => "HIGH_LOAD",
            SimulationScenario::Overheating => "OVERHEATING",
            SimulationScenario::Unbalanced => "UNBALANCED",
            SimulationScenario::RunningBehind => "RUNNING_BEHIND",
        }
    }

    /// Coefficients applied by `PhysicsEngine::update`
    pub fn profile(&self) -> ScenarioProfile {
        let base = ScenarioProfile::NOMINAL;
        match self {
            SimulationScenario::Normal => base,
            SimulationScenario::HighLoad => ScenarioProfile {
                load_scale: 1.5,
                heating_multiplier: 1.2,
                ..base
            },
            SimulationScenario::Overheating => ScenarioProfile {
                heating_multiplier: 3.0,
                temperature_cap: 200.0,
                ..base
            },
            SimulationScenario::Unbalanced => ScenarioProfile {
                vibration_multiplier: 4.0,
                rpm_ripple: 50.0,
                ..base
            },
            SimulationScenario::RunningBehind => ScenarioProfile {
                rpm_scale: 0.85,
                load_scale: 1.2,
                efficiency_multiplier: 0.75,
                heating_multiplier: 1.4,
                vibration_multiplier: 1.5,
                acceleration_modifier: 0.5,
                ..base
            },
        }
    }
}

impl fmt::Display for SimulationScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SimulationScenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| format!("unknown scenario '{}'", s))
    }
}

/// Scenario coefficients. `update` only ever reads these, never the scenario itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioProfile {
    pub rpm_scale: f64,
    /// Amplitude of the sinusoidal RPM disturbance
    pub rpm_ripple: f64,
    pub load_scale: f64,
    pub vibration_multiplier: f64,
    pub heating_multiplier: f64,
    pub efficiency_multiplier: f64,
    pub acceleration_modifier: f64,
    pub temperature_cap: f64,
}

impl ScenarioProfile {
    pub const NOMINAL: ScenarioProfile = ScenarioProfile {
        rpm_scale: 1.0,
        rpm_ripple: 0.0,
        load_scale: 1.0,
        vibration_multiplier: 1.0,
        heating_multiplier: 1.0,
        efficiency_multiplier: 1.0,
        acceleration_modifier: 1.0,
        temperature_cap: 120.0,
    };

    fn target_rpm(&self, target_rpm: f64, sim_time: f64) -> f64 {
        target_rpm * self.rpm_scale + (sim_time * 10.0).sin() * self.rpm_ripple
    }

    fn target_load(&self, target_load: f64) -> f64 {
        (target_load * self.load_scale).min(100.0)
    }
}

/// Rated machine characteristics, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSpecs {
    pub max_rpm: f64,
    pub max_temp: f64,
    /// kW
    pub max_power: f64,
    pub base_vibration: f64,
    /// Fraction of the ambient gap dissipated per second
    pub cooling_rate: f64,
    pub heating_factor: f64,
}

impl Default for MachineSpecs {
    fn default() -> Self {
        Self {
            max_rpm: 3000.0,
            max_temp: 120.0,
            max_power: 15.0,
            base_vibration: 0.5,
            cooling_rate: 0.1,
            heating_factor: 0.05,
        }
    }
}

/// Physical state of one machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    pub rpm: f64,
    /// °C
    pub temperature: f64,
    /// mm/s
    pub vibration: f64,
    /// kW
    pub power: f64,
    /// %
    pub load: f64,
    /// %
    pub efficiency: f64,
    /// dB
    pub noise: f64,
    pub timestamp: DateTime<Utc>,
}

impl MachineState {
    fn idle() -> Self {
        Self {
            rpm: 0.0,
            temperature: AMBIENT_TEMP,
            vibration: 0.0,
            power: 0.0,
            load: 0.0,
            efficiency: 100.0,
            noise: 40.0,
            timestamp: Utc::now(),
        }
    }
}

/// Owns and advances one machine's state
pub struct PhysicsEngine {
    specs: MachineSpecs,
    state: MachineState,
    scenario: SimulationScenario,
    rng: StdRng,
    sim_time: f64,
}

impl PhysicsEngine {
    pub fn new(specs: MachineSpecs) -> Self {
        Self::with_rng(specs, StdRng::from_entropy())
    }

    /// Reproducible jitter stream
    pub fn with_seed(specs: MachineSpecs, seed: u64) -> Self {
        Self::with_rng(specs, StdRng::seed_from_u64(seed))
    }

    fn with_rng(specs: MachineSpecs, rng: StdRng) -> Self {
        Self {
            specs,
            state: MachineState::idle(),
            scenario: SimulationScenario::Normal,
            rng,
            sim_time: 0.0,
        }
    }

    pub fn set_scenario(&mut self, scenario: SimulationScenario) {
        self.scenario = scenario;
    }

    pub fn scenario(&self) -> SimulationScenario {
        self.scenario
    }

    pub fn specs(&self) -> &MachineSpecs {
        &self.specs
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Advance by `dt_secs` toward the given setpoints and return the new state.
    ///
    /// Non-finite or negative inputs are treated as zero; every output is clamped.
    pub fn update(&mut self, dt_secs: f64, target_rpm: f64, target_load: f64) -> MachineState {
        let dt = finite_non_negative(dt_secs);
        let target_rpm = finite_non_negative(target_rpm);
        let target_load = finite_non_negative(target_load);

        let profile = self.scenario.profile();
        self.sim_time += dt;

        let effective_rpm = profile.target_rpm(target_rpm, self.sim_time);
        let effective_load = profile.target_load(target_load);

        self.integrate_rpm(dt, effective_rpm, &profile);

        let load_jitter = self.jitter(2.0);
        self.state.load = (effective_load + load_jitter).clamp(0.0, 100.0);

        self.integrate_temperature(dt, &profile);

        let load_fraction = self.state.load / 100.0;
        let rpm_fraction = self.rpm_fraction();

        // Intercept and slope follow the vibration profile the models were fit on.
        let vibration = (2.0 + load_fraction * 7.0 + rpm_fraction * 0.5) * profile.vibration_multiplier;
        let vibration_jitter = self.jitter(0.1);
        self.state.vibration = (vibration + vibration_jitter).max(0.0);

        let ideal_power = self.specs.max_power * load_fraction * rpm_fraction;
        let drawn = (ideal_power / profile.efficiency_multiplier).min(self.specs.max_power * 1.5);
        let power_jitter = self.jitter(0.2);
        self.state.power = (drawn + power_jitter).max(0.0);

        let mut efficiency = 95.0 * profile.efficiency_multiplier;
        if self.state.temperature > EFFICIENCY_TEMP_KNEE {
            efficiency -= (self.state.temperature - EFFICIENCY_TEMP_KNEE) * 0.5;
        }
        self.state.efficiency = efficiency.clamp(0.0, 100.0);

        self.state.noise = 60.0 + rpm_fraction * 30.0 + self.state.vibration * 10.0;
        self.state.timestamp = Utc::now();

        self.state
    }

    fn integrate_rpm(&mut self, dt: f64, target: f64, profile: &ScenarioProfile) {
        let diff = target - self.state.rpm;
        let max_change = RPM_SLEW_RATE * dt * profile.acceleration_modifier;
        let change = diff.signum() * diff.abs().min(max_change);

        let rpm_jitter = self.jitter(5.0);
        self.state.rpm = (self.state.rpm + change + rpm_jitter).max(0.0);
    }

    /// Newton cooling against a load- and speed-dependent heat input
    fn integrate_temperature(&mut self, dt: f64, profile: &ScenarioProfile) {
        let load_fraction = self.state.load / 100.0;
        let rpm_fraction = self.rpm_fraction();

        let steady_state = NOMINAL_STEADY_TEMP * profile.heating_multiplier;
        let max_dissipation = (steady_state - AMBIENT_TEMP) * self.specs.cooling_rate * 0.8;

        let generated = max_dissipation * load_fraction * (rpm_fraction * rpm_fraction + 0.2) * dt;
        let dissipated = (self.state.temperature - AMBIENT_TEMP) * self.specs.cooling_rate * dt;

        let next = self.state.temperature + generated - dissipated;
        self.state.temperature = if next.is_finite() {
            next.clamp(AMBIENT_TEMP, profile.temperature_cap)
        } else {
            AMBIENT_TEMP
        };
    }

    fn rpm_fraction(&self) -> f64 {
        if self.specs.max_rpm > 0.0 {
            self.state.rpm / self.specs.max_rpm
        } else {
            0.0
        }
    }

    /// Uniform noise in `[-span/2, span/2)`
    fn jitter(&mut self, span: f64) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * span
    }
}

fn finite_non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
