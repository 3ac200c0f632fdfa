use serde::{Deserialize, Serialize};

use crate::motor::PhaseVoltages;

/// Per-frame outputs published to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub theta: f64,
    pub frequency: f64,
    pub target_frequency: f64,
    pub voltages: PhaseVoltages,
    pub electrical_reference: f64,
}

/// A simulation advanced one discrete frame at a time.
pub trait Simulation {
    fn step(&mut self, frames_per_second: f64);
    fn snapshot(&self) -> FrameSnapshot;
}
