pub mod driver;
pub mod error;
pub mod field;
pub mod geometry;
pub mod motor;
pub mod phase;
pub mod sim;
pub mod step24;
pub mod vector;
pub mod waveform;

pub use driver::{DriverConfig, FrameDriver, RunStats};
pub use error::GeometryError;
pub use geometry::{MagneticDipole, Rotor, Slot, Stator};
pub use motor::{Motor, MotorParams, Phase, PhaseVoltages};
pub use phase::{DecoderParams, PhaseDecoder, PhaseEstimatorState, PhaseReading};
pub use sim::{FrameSnapshot, Simulation};
pub use step24::DriveDuty;
pub use vector::Vec3;
pub use waveform::{decode_run, DecodeSample, SynthParams, ThreePhaseSample, WaveformSynthesizer};
