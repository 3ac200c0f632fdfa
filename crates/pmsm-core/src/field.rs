//! Dipole superposition over the rotor, sampled on the stator slots.

use crate::geometry::{Rotor, Stator};
use crate::vector::Vec3;

/// Closest approach (in stator units) before the falloff is clamped.
pub const CLOSE_RANGE: f64 = 5.0;

/// Mean dipole contribution of the rotor at `sample`.
///
/// Distances are normalized by the rotor radius and clamped below at
/// `CLOSE_RANGE / radius`. The falloff is illustrative, not physical. A rotor
/// without dipoles yields 0.
pub fn force_at(sample: &Vec3, rotor: &Rotor) -> f64 {
    let dipoles = rotor.dipoles();
    if dipoles.is_empty() {
        return 0.0;
    }

    let radius = rotor.radius();
    let r_min = CLOSE_RANGE / radius;
    let total: f64 = dipoles
        .iter()
        .map(|dipole| {
            let r = (sample - dipole.rotated_position()) / radius;
            let dist = r.norm().max(r_min);
            dipole.rotated_moment().dot(&r) / (dist * dist * dist)
        })
        .sum();
    total / dipoles.len() as f64
}

/// Samples the field on every slot and derives back-EMF as the negated change
/// since the previous call.
///
/// Must run exactly once per simulation step: a second call without an
/// intervening rotation sees no change and zeroes the EMF.
pub fn compute_fields(rotor: &Rotor, stator: &mut Stator) {
    for slot in stator.slots_mut() {
        for i in 0..slot.len() {
            let force = force_at(&slot.positions()[i], rotor);
            slot.record_force(i, force);
        }
    }
}
