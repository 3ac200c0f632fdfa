//! Discretized rotor and stator geometry.
//!
//! The rotor is a ring of point dipoles, one per angular sample that falls
//! inside a pole's active arc. Each stator slot is a band of sample points on
//! which the field simulator evaluates magnetic force and back-EMF.

use std::f64::consts::{PI, TAU};

use tracing::debug;

use crate::error::GeometryError;
use crate::vector::{polar, rotate_z, Vec3};

/// Base angular resolution of the rotor ring.
pub const ROTOR_BASE_RESOLUTION: usize = 50;
/// Angular samples evaluated around the full rotor.
pub const ROTOR_SAMPLES: usize = 3 * ROTOR_BASE_RESOLUTION;
/// Base angular resolution of the stator ring.
pub const SLOT_BASE_RESOLUTION: usize = 100;
/// Radial offset of the magnetic-force display band.
pub const MAGNETIC_DISPLAY_OFFSET: f64 = 7.0;
/// Radial offset of the back-EMF display band.
pub const BACK_EMF_DISPLAY_OFFSET: f64 = 13.0;

/// One discretized magnetic pole element of the rotor.
#[derive(Debug, Clone, PartialEq)]
pub struct MagneticDipole {
    fixed_position: Vec3,
    fixed_moment: Vec3,
    rotated_position: Vec3,
    rotated_moment: Vec3,
}

impl MagneticDipole {
    pub fn new(position: Vec3, moment: Vec3) -> Self {
        Self {
            fixed_position: position,
            fixed_moment: moment,
            rotated_position: position,
            rotated_moment: moment,
        }
    }

    /// Position in the rotor frame.
    pub fn fixed_position(&self) -> &Vec3 {
        &self.fixed_position
    }

    /// Moment in the rotor frame.
    pub fn fixed_moment(&self) -> &Vec3 {
        &self.fixed_moment
    }

    /// Position after the last rotation, in the stator frame.
    pub fn rotated_position(&self) -> &Vec3 {
        &self.rotated_position
    }

    /// Moment after the last rotation, in the stator frame.
    pub fn rotated_moment(&self) -> &Vec3 {
        &self.rotated_moment
    }

    /// Recomputes the rotated state from the fixed state, never from the
    /// previous rotated state, so repeated steps do not accumulate drift.
    pub(crate) fn rotate(&mut self, sin: f64, cos: f64) {
        self.rotated_position = rotate_z(&self.fixed_position, sin, cos);
        self.rotated_moment = rotate_z(&self.fixed_moment, sin, cos);
    }
}

/// Permanent-magnet rotor.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotor {
    radius: f64,
    poles: usize,
    dipoles: Vec<MagneticDipole>,
}

impl Rotor {
    /// Builds the dipole ring for `poles` magnets separated by `gap`, the
    /// fraction of each pole pitch left empty (split evenly at both edges).
    ///
    /// Dipoles are emitted in ascending angle. Even pole indices are north
    /// (moment points outward), odd ones south.
    pub fn build(radius: f64, poles: usize, gap: f64) -> Self {
        let half_gap = gap * 0.5;
        let mut dipoles = Vec::with_capacity(ROTOR_SAMPLES);

        for idx in 0..ROTOR_SAMPLES {
            let scaled = poles * idx;
            let pole = scaled / ROTOR_SAMPLES;
            // Offset of the sample inside its pole pitch, in [0, 1).
            let frac = (scaled % ROTOR_SAMPLES) as f64 / ROTOR_SAMPLES as f64;
            if frac < half_gap || 1.0 - half_gap < frac {
                continue;
            }

            let theta = TAU * idx as f64 / ROTOR_SAMPLES as f64;
            let polarity = if pole % 2 == 0 { 1.0 } else { -1.0 };
            dipoles.push(MagneticDipole::new(
                polar(radius, theta),
                polar(polarity, theta),
            ));
        }

        debug!(radius, poles, gap, dipoles = dipoles.len(), "Rotor built");
        Self {
            radius,
            poles,
            dipoles,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn poles(&self) -> usize {
        self.poles
    }

    pub fn dipoles(&self) -> &[MagneticDipole] {
        &self.dipoles
    }

    /// Places every dipole at rotor angle `theta` (radians).
    pub(crate) fn rotate_to(&mut self, theta: f64) {
        let (sin, cos) = theta.sin_cos();
        for dipole in &mut self.dipoles {
            dipole.rotate(sin, cos);
        }
    }
}

/// Sample band on one stator slot.
///
/// All five sequences share one ordering: index `i` names the same angular
/// sample in the primary, display and numeric sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slot {
    positions: Vec<Vec3>,
    magnetic_field_positions: Vec<Vec3>,
    back_emf_positions: Vec<Vec3>,
    magnetic_force: Vec<f64>,
    back_emf: Vec<f64>,
}

/// Number of sample points on one slot of a `slot_count` stator.
pub fn slot_samples(slot_count: usize) -> usize {
    SLOT_BASE_RESOLUTION * 3 / slot_count.max(1) + 1
}

impl Slot {
    /// Fresh slot with zeroed force and EMF history.
    pub fn build(radius: f64, gap: f64, slot_count: usize, slot_index: usize) -> Self {
        let mut slot = Self::default();
        slot.place(radius, gap, slot_count, slot_index);
        slot.magnetic_force = vec![0.0; slot.positions.len()];
        slot.back_emf = vec![0.0; slot.positions.len()];
        slot
    }

    /// Moves the sample points in place, keeping force and EMF history.
    ///
    /// Fails without touching the slot when the new geometry would change the
    /// number of samples.
    pub fn reshape(
        &mut self,
        radius: f64,
        gap: f64,
        slot_count: usize,
        slot_index: usize,
    ) -> Result<(), GeometryError> {
        let requested = slot_samples(slot_count);
        if requested != self.len() {
            return Err(GeometryError::SampleCountMismatch {
                slot: slot_index,
                current: self.len(),
                requested,
            });
        }
        self.place(radius, gap, slot_count, slot_index);
        Ok(())
    }

    fn place(&mut self, radius: f64, gap: f64, slot_count: usize, slot_index: usize) {
        let slots = slot_count.max(1) as f64;
        let div = slot_samples(slot_count) - 1;
        let offset = -PI / slots;
        let magnetic_radius = radius + MAGNETIC_DISPLAY_OFFSET;
        let back_emf_radius = radius + BACK_EMF_DISPLAY_OFFSET;

        self.positions.clear();
        self.magnetic_field_positions.clear();
        self.back_emf_positions.clear();

        for d in (0..=div).rev() {
            let span = d as f64 * (1.0 - gap) / div.max(1) as f64;
            let theta = offset + TAU * (slot_index as f64 + span + gap * 0.5) / slots;
            self.positions.push(polar(radius, theta));
            self.magnetic_field_positions.push(polar(magnetic_radius, theta));
            self.back_emf_positions.push(polar(back_emf_radius, theta));
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn magnetic_field_positions(&self) -> &[Vec3] {
        &self.magnetic_field_positions
    }

    pub fn back_emf_positions(&self) -> &[Vec3] {
        &self.back_emf_positions
    }

    pub fn magnetic_force(&self) -> &[f64] {
        &self.magnetic_force
    }

    pub fn back_emf(&self) -> &[f64] {
        &self.back_emf
    }

    /// Mean back-EMF over the slot's samples; 0 for an empty slot.
    pub fn mean_back_emf(&self) -> f64 {
        if self.back_emf.is_empty() {
            return 0.0;
        }
        self.back_emf.iter().sum::<f64>() / self.back_emf.len() as f64
    }

    /// Stores a new force sample and sets the EMF to its negated change.
    pub(crate) fn record_force(&mut self, index: usize, force: f64) {
        self.back_emf[index] = -(force - self.magnetic_force[index]);
        self.magnetic_force[index] = force;
    }
}

/// The stator winding: `3 × poles` slots in U, V, W order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stator {
    slots: Vec<Slot>,
}

impl Stator {
    /// Allocates every slot from scratch with zeroed history.
    pub fn build(diameter: f64, poles: usize, gap: f64) -> Self {
        let slot_count = 3 * poles;
        let radius = diameter / 2.0;
        let slots = (0..slot_count)
            .map(|s| Slot::build(radius, gap, slot_count, s))
            .collect::<Vec<_>>();
        debug!(diameter, poles, gap, slots = slots.len(), "Stator built");
        Self { slots }
    }

    /// Moves every slot in place, keeping accumulated force and EMF.
    ///
    /// The slot count must stay the same; on mismatch nothing is changed.
    pub fn reshape(&mut self, diameter: f64, poles: usize, gap: f64) -> Result<(), GeometryError> {
        let slot_count = 3 * poles;
        if slot_count != self.slots.len() {
            return Err(GeometryError::SlotCountMismatch {
                current: self.slots.len(),
                requested: slot_count,
            });
        }
        let radius = diameter / 2.0;
        for (s, slot) in self.slots.iter_mut().enumerate() {
            slot.reshape(radius, gap, slot_count, s)?;
        }
        debug!(diameter, poles, gap, "Stator reshaped");
        Ok(())
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }
}
