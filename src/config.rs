//! Engine configuration: the run's parameter table, loadable from JSON (the
//! teacher's `Config` struct plays the same role for its own, narrower, set
//! of nested-sampling parameters).

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Configuration for a [`crate::engine::ParticleFilterLDA`] run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `T`: number of topics.
    pub topics: usize,
    /// `α`: symmetric Dirichlet prior on document-topic distributions.
    pub alpha: f64,
    /// `β`: symmetric Dirichlet prior on topic-word distributions.
    pub beta: f64,
    /// `K`: reservoir capacity, in documents.
    pub reservoir_capacity: usize,
    /// `P`: number of particles.
    pub particles: usize,
    /// `τ`: ESS threshold; rejuvenate when `1 / Σwᵢ² ≤ τ`.
    pub ess_threshold: f64,
    /// `R`: number of reservoir word positions resampled per rejuvenation
    /// pass.
    pub rejuv_batch: usize,
    /// `M`: number of MCMC passes per rejuvenation event.
    pub rejuv_mcmc_steps: usize,
    /// PRNG seed. Identical seed plus identical input order yields
    /// identical output.
    pub seed: u64,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.topics == 0 {
            return Err(EngineError::DegenerateDistribution);
        }
        if self.particles == 0 {
            return Err(EngineError::ParticleCollapse);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            topics: 2,
            alpha: 0.1,
            beta: 0.1,
            reservoir_capacity: 64,
            particles: 10,
            ess_threshold: 2.0,
            rejuv_batch: 5,
            rejuv_mcmc_steps: 1,
            seed: 0,
        }
    }
}
