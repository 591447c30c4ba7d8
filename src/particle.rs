//! A single particle: one hypothesis about every word's latent topic,
//! bundling global word-topic counts, per-document counts for every
//! document it currently retains in the reservoir, a weight, and its id in
//! the shared copy-on-write assignment store.

use ahash::AHashMap;
use rand::Rng;

use crate::assignment_store::{AssignmentStore, ParticleId};
use crate::counts::{DocumentCounts, GlobalCounts};
use crate::error::EngineError;
use crate::numerics::{normalize_to_cdf, sample_categorical, sample_without_replacement};
use crate::reservoir::ReservoirSampler;

/// o-LDA eqn 2: the (unnormalized) posterior of topic `topic` for word
/// `word_id`, given one particle's current counts.
fn f(
    word_id: u32,
    topic: usize,
    doc: &DocumentCounts,
    global: &GlobalCounts,
    vocab_size: usize,
    topics: usize,
    alpha: f64,
    beta: f64,
) -> f64 {
    let word_term = (global.count(word_id, topic) as f64 + beta)
        / (global.total(topic) as f64 + vocab_size as f64 * beta);
    let doc_term =
        (doc.count(topic) as f64 + alpha) / (doc.total() as f64 + topics as f64 * alpha);
    word_term * doc_term
}

/// o-LDA eqn 3: the incremental posterior used by rejuvenation, which
/// excludes the current contribution of the position being resampled.
fn g(
    word_id: u32,
    topic: usize,
    old_topic: usize,
    doc_d: &DocumentCounts,
    global: &GlobalCounts,
    vocab_size: usize,
    topics: usize,
    alpha: f64,
    beta: f64,
) -> f64 {
    let indicator = (topic == old_topic) as u32;
    let gc = global.count(word_id, topic).saturating_sub(indicator);
    let gt = global.total(topic).saturating_sub(indicator as u64);
    let word_term = (gc as f64 + beta) / (gt as f64 + vocab_size as f64 * beta);

    let dc = doc_d.count(topic).saturating_sub(indicator);
    let dt = doc_d.total().saturating_sub(1);
    let doc_term = (dc as f64 + alpha) / (dt as f64 + topics as f64 * alpha);

    word_term * doc_term
}

pub struct Particle {
    store_id: ParticleId,
    weight: f64,
    global: GlobalCounts,
    /// Counts for documents currently retained in the reservoir, keyed by
    /// reservoir slot.
    doc_counts: AHashMap<usize, DocumentCounts>,
    /// Scratch counts for the document being ingested right now, used only
    /// when that document will not be retained by the reservoir.
    transient_doc: DocumentCounts,
    active_slot: Option<usize>,
}

impl Particle {
    pub fn new_root(store_id: ParticleId, topics: usize, weight: f64) -> Self {
        Particle {
            store_id,
            weight,
            global: GlobalCounts::new(topics),
            doc_counts: AHashMap::new(),
            transient_doc: DocumentCounts::new(topics),
            active_slot: None,
        }
    }

    pub fn store_id(&self) -> ParticleId {
        self.store_id
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn global_count(&self, word_id: u32, topic: usize) -> u32 {
        self.global.count(word_id, topic)
    }

    pub fn global_total(&self, topic: usize) -> u64 {
        self.global.total(topic)
    }

    /// Total word count of the document currently active for this particle
    /// (the retained reservoir slot if any, otherwise the transient scratch
    /// counter).
    pub fn current_doc_total(&self) -> u32 {
        self.current_doc().total()
    }

    fn current_doc(&self) -> &DocumentCounts {
        match self.active_slot {
            Some(slot) => self
                .doc_counts
                .get(&slot)
                .expect("new_document registers the active slot before any transition"),
            None => &self.transient_doc,
        }
    }

    fn current_doc_mut(&mut self) -> &mut DocumentCounts {
        match self.active_slot {
            Some(slot) => self
                .doc_counts
                .get_mut(&slot)
                .expect("new_document registers the active slot before any transition"),
            None => &mut self.transient_doc,
        }
    }

    /// Resets the active document's counts. If `slot` is `Some`, the
    /// document was retained by the reservoir and its counts live on in
    /// `doc_counts` for future rejuvenation, and the slot is registered in
    /// `store` as a new document for this particle; otherwise a transient
    /// counter is used that is discarded at the end of the ingest call.
    pub fn new_document(&mut self, slot: Option<usize>, topics: usize, store: &mut AssignmentStore) {
        self.active_slot = slot;
        match slot {
            Some(s) => {
                self.doc_counts.insert(s, DocumentCounts::new(topics));
                store.new_document(self.store_id, s);
            }
            None => {
                self.transient_doc = DocumentCounts::new(topics);
            }
        }
    }

    /// Multiplies this particle's weight by the unnormalized likelihood of
    /// observing `word_id` under its current counts.
    pub fn reweight(&mut self, word_id: u32, vocab_size: usize, topics: usize, alpha: f64, beta: f64) {
        let doc = self.current_doc();
        let sum: f64 = (0..topics)
            .map(|t| f(word_id, t, doc, &self.global, vocab_size, topics, alpha, beta))
            .sum();
        self.weight *= sum;
    }

    /// Samples a topic for `word_id` at position `word_index` of the
    /// current document, updates counts and (if the document is retained)
    /// the assignment store, and returns the sampled topic.
    pub fn transition(
        &mut self,
        word_id: u32,
        word_index: usize,
        vocab_size: usize,
        topics: usize,
        alpha: f64,
        beta: f64,
        rng: &mut impl Rng,
        store: &mut AssignmentStore,
    ) -> Result<usize, EngineError> {
        let mut dist = vec![0.0; topics];
        {
            let doc = self.current_doc();
            for (t, slot) in dist.iter_mut().enumerate() {
                *slot = f(word_id, t, doc, &self.global, vocab_size, topics, alpha, beta);
            }
        }
        normalize_to_cdf(&mut dist)?;
        let topic = sample_categorical(&dist, rng)?;

        self.global.add(word_id, topic);
        self.current_doc_mut().add(topic);
        if let Some(slot) = self.active_slot {
            store.set(self.store_id, slot, word_index, topic)?;
        }
        Ok(topic)
    }

    /// Runs one MCMC rejuvenation pass: draws `batch` reservoir positions
    /// without replacement from `positions` and, for each, resamples its
    /// topic from the incremental posterior that excludes its own current
    /// contribution.
    pub fn rejuvenate(
        &mut self,
        positions: &[(usize, usize)],
        batch: usize,
        vocab_size: usize,
        topics: usize,
        alpha: f64,
        beta: f64,
        rng: &mut impl Rng,
        store: &mut AssignmentStore,
        reservoir: &ReservoirSampler<Vec<u32>>,
    ) -> Result<(), EngineError> {
        let sample = sample_without_replacement(positions, batch, rng);
        for (doc, word_index) in sample {
            let word_id = reservoir.get(doc)?[word_index];
            let old_topic = store.get(self.store_id, doc, word_index)?;

            let mut dist = vec![0.0; topics];
            {
                let doc_counts =
                    self.doc_counts
                        .get(&doc)
                        .ok_or(EngineError::AssignmentMissing {
                            particle: self.store_id,
                            doc,
                            word: word_index,
                        })?;
                for (t, slot) in dist.iter_mut().enumerate() {
                    *slot = g(
                        word_id, t, old_topic, doc_counts, &self.global, vocab_size, topics,
                        alpha, beta,
                    );
                }
            }
            normalize_to_cdf(&mut dist)?;
            let new_topic = sample_categorical(&dist, rng)?;

            if new_topic != old_topic {
                self.global.resample_update(word_id, old_topic, new_topic);
                if let Some(doc_counts) = self.doc_counts.get_mut(&doc) {
                    doc_counts.resample_update(old_topic, new_topic);
                }
                store.set(self.store_id, doc, word_index, new_topic)?;
            }
        }
        Ok(())
    }

    /// Deep-copies this particle's counts (values, not references) into a
    /// new particle with a fresh store id and weight; the new particle
    /// shares historical topic assignments with its parent via the
    /// assignment store rather than copying them.
    pub fn deep_copy(&self, new_store_id: ParticleId, weight: f64) -> Particle {
        Particle {
            store_id: new_store_id,
            weight,
            global: self.global.clone(),
            doc_counts: self.doc_counts.clone(),
            transient_doc: self.transient_doc.clone(),
            active_slot: self.active_slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn particle_with_root(store: &mut AssignmentStore, id: ParticleId, topics: usize) -> Particle {
        store.new_root(id);
        Particle::new_root(id, topics, 1.0)
    }

    #[test]
    fn reweight_then_transition_keeps_doc_total_in_sync() {
        let mut store = AssignmentStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = particle_with_root(&mut store, 0, 2);
        p.new_document(Some(0), 2, &mut store);

        p.reweight(5, 1, 2, 0.1, 0.1);
        let before_weight = p.weight();
        assert!(before_weight > 0.0);

        let topic = p.transition(5, 0, 1, 2, 0.1, 0.1, &mut rng, &mut store).unwrap();
        assert!(topic < 2);
        assert_eq!(p.current_doc().total(), 1);
        let sum: u32 = (0..2).map(|t| p.current_doc().count(t)).sum();
        assert_eq!(sum, p.current_doc().total());
        assert_eq!(store.get(0, 0, 0).unwrap(), topic);
    }

    #[test]
    fn transition_without_retained_slot_does_not_touch_store() {
        let mut store = AssignmentStore::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut p = particle_with_root(&mut store, 0, 2);
        p.new_document(None, 2, &mut store);
        p.transition(1, 0, 1, 2, 0.1, 0.1, &mut rng, &mut store).unwrap();
        assert!(store.get(0, 0, 0).is_err());
    }

    #[test]
    fn deep_copy_is_independent_of_original() {
        let mut store = AssignmentStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = particle_with_root(&mut store, 0, 2);
        p.new_document(Some(0), 2, &mut store);
        p.transition(1, 0, 1, 2, 0.1, 0.1, &mut rng, &mut store).unwrap();

        let mut copy = p.deep_copy(1, 0.5);
        store.new_child(1, 0);
        copy.transition(2, 1, 2, 2, 0.1, 0.1, &mut rng, &mut store).unwrap();

        // The copy's mutation must not leak back into the original.
        assert_eq!(p.current_doc().total(), 1);
        assert_eq!(copy.current_doc().total(), 2);
        assert_eq!(copy.weight(), 0.5);
    }

    #[test]
    fn rejuvenate_is_noop_when_topic_unchanged_by_construction() {
        // With a single topic, g(...) always puts all mass on topic 0, so
        // rejuvenation can only ever confirm the existing assignment.
        let mut store = AssignmentStore::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut reservoir: ReservoirSampler<Vec<u32>> = ReservoirSampler::new(4);
        let mut p = particle_with_root(&mut store, 0, 1);

        let slot = reservoir.add(Vec::new(), &mut rng).index().unwrap();
        p.new_document(Some(slot), 1, &mut store);
        let word_id = 7u32;
        reservoir.get_mut(slot).unwrap().push(word_id);
        let topic = p
            .transition(word_id, 0, 1, 1, 0.1, 0.1, &mut rng, &mut store)
            .unwrap();
        assert_eq!(topic, 0);

        let positions = vec![(slot, 0)];
        p.rejuvenate(&positions, 1, 1, 1, 0.1, 0.1, &mut rng, &mut store, &reservoir)
            .unwrap();
        assert_eq!(store.get(0, slot, 0).unwrap(), 0);
    }
}
