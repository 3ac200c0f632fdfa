//! Motor aggregate: one rotor, one stator, and the rotation state that
//! drives them.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GeometryError;
use crate::field;
use crate::geometry::{Rotor, Slot, Stator};
use crate::sim::{FrameSnapshot, Simulation};

/// Rotation angle wraps after two full turns.
// TODO: move to a single-turn wrap once trace consumers stop depending on
// the 4π period of `theta`.
pub const THETA_PERIOD: f64 = 2.0 * TAU;

/// Geometry and drive parameters for a `Motor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorParams {
    pub rotor_diameter: f64,
    /// Radial clearance added to the rotor diameter to get the stator diameter.
    pub air_gap: f64,
    pub rotor_poles: usize,
    /// Fraction of each magnet pitch left empty.
    pub magnet_gap: f64,
    /// The stator carries `3 × stator_poles` slots.
    pub stator_poles: usize,
    /// Fraction of each slot pitch left empty.
    pub stator_gap: f64,
    /// Revolutions per second.
    pub target_frequency: f64,
    /// Frames for the first-order frequency lag; `<= 0` snaps to target.
    pub acceleration_time: f64,
    /// Gain applied to the per-phase EMF readout.
    pub wave_scale: f64,
}

impl Default for MotorParams {
    fn default() -> Self {
        Self {
            rotor_diameter: 150.0,
            air_gap: 5.0,
            rotor_poles: 16,
            magnet_gap: 0.0,
            stator_poles: 4,
            stator_gap: 0.0,
            target_frequency: 0.0,
            acceleration_time: 1.0,
            wave_scale: 0.2,
        }
    }
}

impl MotorParams {
    pub fn stator_diameter(&self) -> f64 {
        self.rotor_diameter + self.air_gap
    }
}

/// Stator winding phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    U,
    V,
    W,
}

impl Phase {
    /// Slots are wound U, V, W, U, V, W, ...
    pub fn of_slot(index: usize) -> Self {
        match index % 3 {
            0 => Phase::U,
            1 => Phase::V,
            _ => Phase::W,
        }
    }
}

/// Per-phase back-EMF readout, each clamped to `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseVoltages {
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

#[derive(Debug, Clone)]
pub struct Motor {
    rotor: Rotor,
    stator: Stator,
    theta: f64,
    frequency: f64,
    target_frequency: f64,
    acceleration_time: f64,
    wave_scale: f64,
}

impl Motor {
    /// Builds rotor and stator from `params` and samples the field once so
    /// the first `advance` starts from a settled force history.
    pub fn new(params: &MotorParams) -> Self {
        let mut motor = Self {
            rotor: Rotor::build(
                params.rotor_diameter / 2.0,
                params.rotor_poles,
                params.magnet_gap,
            ),
            stator: Stator::build(
                params.stator_diameter(),
                params.stator_poles,
                params.stator_gap,
            ),
            theta: 0.0,
            frequency: 0.0,
            target_frequency: params.target_frequency,
            acceleration_time: params.acceleration_time,
            wave_scale: params.wave_scale,
        };
        motor.compute_fields();
        motor
    }

    /// One discrete time step at `frames_per_second`.
    pub fn advance(&mut self, frames_per_second: f64) {
        self.rotor.rotate_to(self.theta);
        self.compute_fields();

        if self.acceleration_time > 0.0 {
            self.frequency += (self.target_frequency - self.frequency) / self.acceleration_time;
        } else {
            self.frequency = self.target_frequency;
        }

        if frames_per_second > 0.0 {
            self.theta = (self.theta + TAU * self.frequency / frames_per_second)
                .rem_euclid(THETA_PERIOD);
        }
    }

    /// Resamples the field at the current rotor pose and updates back-EMF.
    pub fn compute_fields(&mut self) {
        field::compute_fields(&self.rotor, &mut self.stator);
    }

    /// Replaces the stator with freshly allocated, zeroed slots.
    pub fn rebuild_stator(&mut self, diameter: f64, poles: usize, gap: f64) {
        self.stator = Stator::build(diameter, poles, gap);
    }

    /// Moves the existing slots to new diameter/gap, keeping EMF history.
    ///
    /// `poles` must match the current stator; otherwise nothing changes.
    pub fn reshape_stator(
        &mut self,
        diameter: f64,
        poles: usize,
        gap: f64,
    ) -> Result<(), GeometryError> {
        self.stator.reshape(diameter, poles, gap)
    }

    pub fn rebuild_rotor(&mut self, diameter: f64, poles: usize, gap: f64) {
        self.rotor = Rotor::build(diameter / 2.0, poles, gap);
        debug!(theta = self.theta, "Rotor replaced; pose applies on next step");
    }

    pub fn rotor(&self) -> &Rotor {
        &self.rotor
    }

    pub fn stator(&self) -> &Stator {
        &self.stator
    }

    pub fn slots(&self) -> &[Slot] {
        self.stator.slots()
    }

    /// Current rotor angle in radians, in `[0, THETA_PERIOD)`.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Current rotational frequency in revolutions per second.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn target_frequency(&self) -> f64 {
        self.target_frequency
    }

    pub fn set_target_frequency(&mut self, frequency: f64) {
        self.target_frequency = frequency;
    }

    pub fn acceleration_time(&self) -> f64 {
        self.acceleration_time
    }

    pub fn set_acceleration_time(&mut self, frames: f64) {
        self.acceleration_time = frames;
    }

    pub fn wave_scale(&self) -> f64 {
        self.wave_scale
    }

    pub fn set_wave_scale(&mut self, scale: f64) {
        self.wave_scale = scale;
    }

    /// Sums the scaled mean EMF of every slot into its phase.
    pub fn phase_voltages(&self, scale: f64) -> PhaseVoltages {
        let mut out = PhaseVoltages::default();
        for (s, slot) in self.slots().iter().enumerate() {
            let value = slot.mean_back_emf() * scale;
            match Phase::of_slot(s) {
                Phase::U => out.u += value,
                Phase::V => out.v += value,
                Phase::W => out.w += value,
            }
        }
        out.u = out.u.clamp(-1.0, 1.0);
        out.v = out.v.clamp(-1.0, 1.0);
        out.w = out.w.clamp(-1.0, 1.0);
        out
    }

    /// `cos` of the electrical angle, for overlay against the phase EMF.
    pub fn electrical_reference(&self) -> f64 {
        (self.theta * self.rotor.poles() as f64 / 2.0).cos()
    }
}

impl Simulation for Motor {
    fn step(&mut self, frames_per_second: f64) {
        self.advance(frames_per_second);
    }

    fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            theta: self.theta,
            frequency: self.frequency,
            target_frequency: self.target_frequency,
            voltages: self.phase_voltages(self.wave_scale),
            electrical_reference: self.electrical_reference(),
        }
    }
}
