//! The public entry point: `ParticleFilterLDA::ingest_document` drives the
//! per-word reweight → transition → normalize → (resample + rejuvenate if
//! ESS is low) state machine over a stream of documents.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::particle_store::ParticleStore;
use crate::report::{self, TopicReport};
use crate::reservoir::{ReservoirSampler, Slot};
use crate::vocabulary::VocabularyMap;

pub type DocumentId = Slot;

pub struct ParticleFilterLDA {
    config: EngineConfig,
    vocabulary: VocabularyMap,
    reservoir: ReservoirSampler<Vec<u32>>,
    store: ParticleStore,
    rng: StdRng,
    total_words: u64,
}

impl ParticleFilterLDA {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let store = ParticleStore::new(config.particles, config.topics);
        let reservoir = ReservoirSampler::new(config.reservoir_capacity);
        Ok(ParticleFilterLDA {
            config,
            vocabulary: VocabularyMap::new(),
            reservoir,
            store,
            rng,
            total_words: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &VocabularyMap {
        &self.vocabulary
    }

    pub fn reservoir(&self) -> &ReservoirSampler<Vec<u32>> {
        &self.reservoir
    }

    pub fn particle_store(&self) -> &ParticleStore {
        &self.store
    }

    /// Ingests one document: reserves it a reservoir slot, then drives the
    /// per-word reweight/transition/normalize/ESS-check state machine over
    /// its tokens.
    #[tracing::instrument(level = "debug", skip(self, tokens), fields(n_tokens = tokens.len()))]
    pub fn ingest_document(&mut self, tokens: &[String]) -> Result<DocumentId, EngineError> {
        let slot = self.reservoir.reserve_with(&mut self.rng, Vec::new());
        let slot_index = slot.index();
        self.store.new_document_all(slot_index, self.config.topics);

        for (word_index, token) in tokens.iter().enumerate() {
            let word_id = self.vocabulary.intern(token);
            self.total_words += 1;
            let vocab_size = self.vocabulary.len();

            if let Some(idx) = slot_index {
                self.reservoir.get_mut(idx)?.push(word_id);
            }

            self.store
                .reweight_all(word_id, vocab_size, self.config.topics, self.config.alpha, self.config.beta);
            self.store.transition_all(
                word_index,
                word_id,
                vocab_size,
                self.config.topics,
                self.config.alpha,
                self.config.beta,
                &mut self.rng,
            )?;
            self.store.normalize_weights()?;

            let ess = self.store.effective_sample_size();
            if ess <= self.config.ess_threshold {
                tracing::debug!(ess, "ESS at or below threshold, resampling and rejuvenating");
                self.store.resample(&mut self.rng)?;
                let positions = self.collect_reservoir_positions();
                for _ in 0..self.config.rejuv_mcmc_steps {
                    self.store.rejuvenate(
                        &mut self.rng,
                        &self.reservoir,
                        &positions,
                        self.config.rejuv_batch,
                        vocab_size,
                        self.config.topics,
                        self.config.alpha,
                        self.config.beta,
                    )?;
                }
                self.store.uniform_reweight_all();
            }
        }

        Ok(slot)
    }

    /// All `(doc_slot, word_index)` pairs currently addressable in the
    /// reservoir, bounded by the total number of words observed so far as a
    /// safeguard against over-counting early in a run (in this
    /// implementation the sum of retained document lengths can never
    /// exceed `total_words`, since a position is only ever pushed once it
    /// has actually been observed, but the bound is kept defensively).
    fn collect_reservoir_positions(&self) -> Vec<(usize, usize)> {
        let mut positions = Vec::new();
        for (doc, words) in self.reservoir.iter() {
            for i in 0..words.len() {
                positions.push((doc, i));
            }
        }
        if positions.len() as u64 > self.total_words {
            positions.truncate(self.total_words as usize);
        }
        positions
    }

    /// Top words per topic, per particle, under the current global counts.
    pub fn topic_report(&self, top_n: usize) -> TopicReport {
        report::topic_report(
            self.store.particles(),
            &self.vocabulary,
            self.config.topics,
            self.config.beta,
            top_n,
        )
    }

    /// For each particle, the topic assigned to every word position of
    /// document `doc`. Returns an empty vector for `DocumentId::NotRetained`
    /// since there is nothing addressable to report on.
    pub fn per_document_labels(&self, doc: DocumentId) -> Result<Vec<Vec<usize>>, EngineError> {
        let slot = match doc.index() {
            Some(slot) => slot,
            None => return Ok(Vec::new()),
        };
        let n = self.reservoir.get(slot)?.len();
        let mut out = Vec::with_capacity(self.store.len());
        for particle in self.store.particles() {
            let mut labels = Vec::with_capacity(n);
            for i in 0..n {
                labels.push(self.store.get_assignment(particle.store_id(), slot, i)?);
            }
            out.push(labels);
        }
        Ok(out)
    }
}

/// Free-function convenience constructor alongside `ParticleFilterLDA::new`.
pub fn new_engine(config: EngineConfig) -> Result<ParticleFilterLDA, EngineError> {
    ParticleFilterLDA::new(config)
}
