//! Error kinds surfaced by the inference engine.
//!
//! Numeric and invariant failures bubble up from the leaf modules
//! (`numerics`, `assignment_store`) through `particle`, `particle_store` and
//! `engine`. `AssignmentMissing` and `ReservoirSlotOutOfRange` indicate an
//! invariant violation in the driver and should be treated as fatal by
//! callers; `EmptyDistribution`, `DegenerateDistribution` and
//! `ParticleCollapse` are ordinary, recoverable-at-the-caller failures.

use thiserror::Error;

use crate::assignment_store::ParticleId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("attempted to sample a category from an empty distribution")]
    EmptyDistribution,

    #[error("cannot normalize a degenerate (empty or all-zero) distribution")]
    DegenerateDistribution,

    #[error("all particle weights collapsed to zero after reweighting")]
    ParticleCollapse,

    #[error(
        "assignment missing for particle {particle}, document slot {doc}, word position {word}"
    )]
    AssignmentMissing {
        particle: ParticleId,
        doc: usize,
        word: usize,
    },

    #[error("reservoir slot {slot} is out of range (capacity {capacity})")]
    ReservoirSlotOutOfRange { slot: usize, capacity: usize },
}
