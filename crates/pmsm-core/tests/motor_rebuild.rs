use pmsm_core::geometry::slot_samples;
use pmsm_core::{GeometryError, Motor, MotorParams};

fn run(motor: &mut Motor, frames: usize) {
    for _ in 0..frames {
        motor.advance(60.0);
    }
}

fn spinning() -> Motor {
    let mut motor = Motor::new(&MotorParams {
        target_frequency: 0.25,
        acceleration_time: 10.0,
        ..Default::default()
    });
    run(&mut motor, 30);
    motor
}

#[test]
fn soft_update_preserves_emf_trace() {
    let mut motor = spinning();
    let emf_before: Vec<Vec<f64>> = motor.slots().iter().map(|s| s.back_emf().to_vec()).collect();

    motor.reshape_stator(160.0, 4, 3.0 / 24.0).unwrap();

    let emf_after: Vec<Vec<f64>> = motor.slots().iter().map(|s| s.back_emf().to_vec()).collect();
    assert_eq!(emf_before, emf_after);
    assert!(emf_after.iter().flatten().any(|e| *e != 0.0));
}

#[test]
fn hard_rebuild_discards_emf_trace() {
    let mut motor = spinning();
    motor.rebuild_stator(155.0, 2, 0.0);
    assert_eq!(motor.slots().len(), 6);
    for slot in motor.slots() {
        assert_eq!(slot.len(), slot_samples(6));
        assert!(slot.back_emf().iter().all(|e| *e == 0.0));
        assert!(slot.magnetic_force().iter().all(|f| *f == 0.0));
    }
}

#[test]
fn soft_update_with_new_pole_count_fails_loudly() {
    let mut motor = spinning();
    let before = motor.stator().clone();
    let err = motor.reshape_stator(155.0, 3, 0.0).unwrap_err();
    assert_eq!(
        err,
        GeometryError::SlotCountMismatch {
            current: 12,
            requested: 9
        }
    );
    assert_eq!(motor.stator(), &before);
}

#[test]
fn rotor_rebuild_keeps_rotation_state() {
    let mut motor = spinning();
    let theta = motor.theta();
    let frequency = motor.frequency();
    motor.rebuild_rotor(150.0, 8, 2.0 / 16.0);
    assert_eq!(motor.rotor().poles(), 8);
    assert_eq!(motor.theta(), theta);
    assert_eq!(motor.frequency(), frequency);
    run(&mut motor, 1);
    assert!(motor.slots().iter().all(|s| s.back_emf().iter().all(|e| e.is_finite())));
}

#[test]
fn fixed_rotor_yields_no_emf() {
    let mut motor = Motor::new(&MotorParams::default());
    run(&mut motor, 5);
    for slot in motor.slots() {
        for emf in slot.back_emf() {
            assert!(emf.abs() < 1.0e-12);
        }
    }
}
