//! Rao-Blackwellized particle filter with MCMC rejuvenation for online LDA
//! topic inference (Canini, Shi & Griffiths, "Online Inference of Topics
//! with Latent Dirichlet Allocation").
//!
//! A fixed set of particles, each a full hypothesis about every word's
//! latent topic assignment, is carried forward one word at a time:
//! reweight by the incremental likelihood, sample a topic transition,
//! renormalize, and — whenever the effective sample size drops too low —
//! resample particles and rejuvenate a batch of past assignments against a
//! reservoir sample of the document stream.

pub mod assignment_store;
pub mod config;
pub mod counts;
pub mod engine;
pub mod error;
pub mod numerics;
pub mod particle;
pub mod particle_store;
pub mod report;
pub mod reservoir;
pub mod vocabulary;

pub use config::EngineConfig;
pub use engine::{new_engine, DocumentId, ParticleFilterLDA};
pub use error::EngineError;
pub use report::{TopicReport, TopicWord};
