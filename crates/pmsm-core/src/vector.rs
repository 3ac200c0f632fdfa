//! Planar vector helpers on top of `nalgebra`.

use nalgebra::Vector3;

/// Three-component vector; geometry in this crate lives in the z = 0 plane.
pub type Vec3 = Vector3<f64>;

/// Point on a circle of `radius` at angle `theta` (radians).
#[must_use]
pub fn polar(radius: f64, theta: f64) -> Vec3 {
    let (sin, cos) = theta.sin_cos();
    Vec3::new(radius * cos, radius * sin, 0.0)
}

/// Rotates `v` about the z axis by the precomputed `(sin, cos)` pair.
#[must_use]
pub fn rotate_z(v: &Vec3, sin: f64, cos: f64) -> Vec3 {
    Vec3::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos, v.z)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn polar_lies_on_circle() {
        let p = polar(75.0, 1.234);
        assert_relative_eq!(p.norm(), 75.0, epsilon = 1.0e-12);
        assert_eq!(p.z, 0.0);
    }

    #[test]
    fn quarter_turn_maps_x_to_y() {
        let (sin, cos) = FRAC_PI_2.sin_cos();
        let r = rotate_z(&Vec3::new(1.0, 0.0, 0.0), sin, cos);
        assert_relative_eq!(r.x, 0.0, epsilon = 1.0e-12);
        assert_relative_eq!(r.y, 1.0, epsilon = 1.0e-12);
    }
}
