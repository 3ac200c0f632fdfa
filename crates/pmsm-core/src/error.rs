use thiserror::Error;

/// Contract violations on the in-place ("reshape") geometry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Stator holds {current} slots but the reshape asks for {requested}")]
    SlotCountMismatch { current: usize, requested: usize },

    #[error("Slot {slot} holds {current} samples but the new geometry has {requested}")]
    SampleCountMismatch {
        slot: usize,
        current: usize,
        requested: usize,
    },
}
