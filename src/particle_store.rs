//! Owns the particle array and the shared copy-on-write assignment store;
//! performs the per-word broadcasts, weight normalization, ESS check, and
//! multinomial resampling.

use rand::rngs::StdRng;

use crate::assignment_store::AssignmentStore;
use crate::error::EngineError;
use crate::numerics::{l2_norm, normalize_to_cdf, sample_categorical};
use crate::particle::Particle;
use crate::reservoir::ReservoirSampler;

pub struct ParticleStore {
    particles: Vec<Particle>,
    assignments: AssignmentStore,
    next_store_id: u64,
}

impl ParticleStore {
    /// Allocates `num_particles` particles, each a root in the assignment
    /// store with weight `1 / num_particles`.
    pub fn new(num_particles: usize, topics: usize) -> Self {
        let mut assignments = AssignmentStore::new();
        let weight = 1.0 / num_particles as f64;
        let particles = (0..num_particles as u64)
            .map(|id| {
                assignments.new_root(id);
                Particle::new_root(id, topics, weight)
            })
            .collect();
        ParticleStore {
            particles,
            assignments,
            next_store_id: num_particles as u64,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn get_assignment(
        &self,
        particle: crate::assignment_store::ParticleId,
        doc: usize,
        word: usize,
    ) -> Result<usize, EngineError> {
        self.assignments.get(particle, doc, word)
    }

    pub fn new_document_all(&mut self, slot: Option<usize>, topics: usize) {
        for particle in self.particles.iter_mut() {
            particle.new_document(slot, topics, &mut self.assignments);
        }
    }

    pub fn reweight_all(&mut self, word_id: u32, vocab_size: usize, topics: usize, alpha: f64, beta: f64) {
        for particle in self.particles.iter_mut() {
            particle.reweight(word_id, vocab_size, topics, alpha, beta);
        }
    }

    pub fn transition_all(
        &mut self,
        word_index: usize,
        word_id: u32,
        vocab_size: usize,
        topics: usize,
        alpha: f64,
        beta: f64,
        rng: &mut StdRng,
    ) -> Result<(), EngineError> {
        for particle in self.particles.iter_mut() {
            particle.transition(
                word_id,
                word_index,
                vocab_size,
                topics,
                alpha,
                beta,
                rng,
                &mut self.assignments,
            )?;
        }
        Ok(())
    }

    pub fn weights(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.weight()).collect()
    }

    /// Rescales weights to sum to 1. Fails with `ParticleCollapse` if every
    /// weight has gone to zero.
    pub fn normalize_weights(&mut self) -> Result<(), EngineError> {
        let sum: f64 = self.particles.iter().map(|p| p.weight()).sum();
        if sum <= 0.0 {
            return Err(EngineError::ParticleCollapse);
        }
        for particle in self.particles.iter_mut() {
            let w = particle.weight() / sum;
            particle.set_weight(w);
        }
        Ok(())
    }

    pub fn uniform_reweight_all(&mut self) {
        let w = 1.0 / self.particles.len() as f64;
        for particle in self.particles.iter_mut() {
            particle.set_weight(w);
        }
    }

    /// `1 / sum(w_i^2)` over the (assumed already normalized) weights.
    pub fn effective_sample_size(&self) -> f64 {
        let weights = self.weights();
        let norm = l2_norm(&weights);
        1.0 / (norm * norm)
    }

    /// Multinomial resampling: draws `len()` indices with replacement
    /// proportional to weight, and replaces the particle array with deep
    /// copies of the chosen particles, each registered as a child of its
    /// source particle in the assignment store. Weights are reset to
    /// uniform afterward.
    pub fn resample(&mut self, rng: &mut StdRng) -> Result<(), EngineError> {
        let mut cdf = self.weights();
        normalize_to_cdf(&mut cdf)?;

        let mut next = Vec::with_capacity(self.particles.len());
        for _ in 0..self.particles.len() {
            let chosen = sample_categorical(&cdf, rng)?;
            let parent = &self.particles[chosen];
            let new_id = self.next_store_id;
            self.next_store_id += 1;
            self.assignments.new_child(new_id, parent.store_id());
            next.push(parent.deep_copy(new_id, parent.weight()));
        }
        self.particles = next;
        self.uniform_reweight_all();
        Ok(())
    }

    /// Broadcasts one MCMC rejuvenation pass over every particle. Positions
    /// are resampled fresh (from `positions`) on each call: standard MCMC
    /// practice draws a new sample per pass rather than reusing one sample
    /// across passes.
    pub fn rejuvenate(
        &mut self,
        rng: &mut StdRng,
        reservoir: &ReservoirSampler<Vec<u32>>,
        positions: &[(usize, usize)],
        batch: usize,
        vocab_size: usize,
        topics: usize,
        alpha: f64,
        beta: f64,
    ) -> Result<(), EngineError> {
        for particle in self.particles.iter_mut() {
            particle.rejuvenate(
                positions,
                batch,
                vocab_size,
                topics,
                alpha,
                beta,
                rng,
                &mut self.assignments,
                reservoir,
            )?;
        }
        Ok(())
    }

    pub fn prune_assignments(&mut self) {
        self.assignments.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn construction_gives_uniform_weights() {
        let store = ParticleStore::new(4, 2);
        for w in store.weights() {
            assert!((w - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_weights_sums_to_one() {
        let mut store = ParticleStore::new(3, 2);
        store.particles[0].set_weight(2.0);
        store.particles[1].set_weight(1.0);
        store.particles[2].set_weight(1.0);
        store.normalize_weights().unwrap();
        let sum: f64 = store.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_weights_fails_on_collapse() {
        let mut store = ParticleStore::new(2, 2);
        store.particles[0].set_weight(0.0);
        store.particles[1].set_weight(0.0);
        assert!(matches!(
            store.normalize_weights(),
            Err(EngineError::ParticleCollapse)
        ));
    }

    #[test]
    fn ess_of_uniform_weights_equals_particle_count() {
        let store = ParticleStore::new(5, 2);
        let ess = store.effective_sample_size();
        assert!((ess - 5.0).abs() < 1e-9);
    }

    #[test]
    fn resample_resets_to_uniform_weights() {
        let mut store = ParticleStore::new(4, 2);
        store.particles[0].set_weight(0.9);
        store.particles[1].set_weight(0.05);
        store.particles[2].set_weight(0.03);
        store.particles[3].set_weight(0.02);
        let mut rng = StdRng::seed_from_u64(5);
        store.resample(&mut rng).unwrap();
        for w in store.weights() {
            assert!((w - 0.25).abs() < 1e-12);
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn resample_children_inherit_parent_assignments() {
        let mut store = ParticleStore::new(2, 2);
        store.new_document_all(Some(0), 2);
        let mut rng = StdRng::seed_from_u64(6);
        store.transition_all(0, 3, 1, 2, 0.1, 0.1, &mut rng).unwrap();

        // Force particle 0 to dominate so resample reliably copies it.
        store.particles[0].set_weight(1.0);
        store.particles[1].set_weight(0.0);
        store.resample(&mut rng).unwrap();

        let original_topic = store.get_assignment(0, 0, 0).unwrap();
        for particle in store.particles() {
            assert_eq!(
                store.get_assignment(particle.store_id(), 0, 0).unwrap(),
                original_topic
            );
        }
    }
}
