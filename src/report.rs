//! Human-readable summaries derived from a live [`crate::particle_store::ParticleStore`]:
//! per-particle, per-topic top words, and per-document topic labels.

use std::fmt;

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::particle::Particle;
use crate::vocabulary::VocabularyMap;

/// One entry in a topic's top-word list.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicWord {
    pub word: String,
    pub probability: f64,
}

/// Top words per topic, per particle.
#[derive(Debug, Clone)]
pub struct TopicReport {
    /// `particles[p][t]` is the descending-probability top-word list for
    /// particle `p`, topic `t`.
    pub particles: Vec<Vec<Vec<TopicWord>>>,
}

impl fmt::Display for TopicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (p, topics) in self.particles.iter().enumerate() {
            for (t, words) in topics.iter().enumerate() {
                writeln!(f, "particle {p} topic {t}")?;
                for w in words {
                    writeln!(f, "    {:.6}  {}", w.probability, w.word)?;
                }
            }
        }
        Ok(())
    }
}

/// For each particle and topic, the `top_n` words with the highest
/// `P(word | topic)` under that particle's current global counts, computed
/// as `(count(word, topic) + beta) / (total(topic) + vocab_size * beta)`.
///
/// This is read-only and order-independent across particles and topics, so
/// particles are processed in parallel; nothing here touches the RNG.
pub fn topic_report(
    particles: &[Particle],
    vocabulary: &VocabularyMap,
    topics: usize,
    beta: f64,
    top_n: usize,
) -> TopicReport {
    let vocab_size = vocabulary.len();
    let report = particles
        .par_iter()
        .map(|particle| {
            (0..topics)
                .map(|t| top_words_for_topic(particle, vocabulary, vocab_size, t, beta, top_n))
                .collect::<Vec<_>>()
        })
        .collect();
    TopicReport { particles: report }
}

fn top_words_for_topic(
    particle: &Particle,
    vocabulary: &VocabularyMap,
    vocab_size: usize,
    topic: usize,
    beta: f64,
    top_n: usize,
) -> Vec<TopicWord> {
    let denom = particle.global_total(topic) as f64 + vocab_size as f64 * beta;
    let mut scored: Vec<(OrderedFloat<f64>, u32)> = (0..vocab_size as u32)
        .map(|word_id| {
            let prob = (particle.global_count(word_id, topic) as f64 + beta) / denom;
            (OrderedFloat(prob), word_id)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(top_n);
    scored
        .into_iter()
        .map(|(prob, word_id)| TopicWord {
            word: vocabulary.word(word_id).to_string(),
            probability: prob.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment_store::AssignmentStore;

    fn vocab_with(tokens: &[&str]) -> VocabularyMap {
        let mut v = VocabularyMap::new();
        for t in tokens {
            v.intern(t);
        }
        v
    }

    #[test]
    fn top_words_are_sorted_descending_by_probability() {
        let mut store = AssignmentStore::new();
        store.new_root(0);
        let mut p = Particle::new_root(0, 2, 1.0);
        p.new_document(Some(0), 2, &mut store);

        let vocab = vocab_with(&["a", "b", "c"]);
        // Hand-bias word 1 ("b") heavily toward topic 0.
        for _ in 0..5 {
            p.transition(1, 0, 3, 2, 0.1, 0.1, &mut rand::rngs::mock::StepRng::new(0, 0), &mut store)
                .ok();
        }

        let report = topic_report(std::slice::from_ref(&p), &vocab, 2, 0.1, 3);
        let topic0 = &report.particles[0][0];
        assert!(topic0.len() <= 3);
        for pair in topic0.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
    }

    #[test]
    fn display_renders_one_header_per_particle_topic() {
        let report = TopicReport {
            particles: vec![vec![
                vec![TopicWord { word: "a".into(), probability: 0.5 }],
                vec![TopicWord { word: "b".into(), probability: 0.25 }],
            ]],
        };
        let text = report.to_string();
        assert!(text.contains("particle 0 topic 0"));
        assert!(text.contains("particle 0 topic 1"));
        assert!(text.contains("a"));
        assert!(text.contains("b"));
    }

    #[test]
    fn empty_vocabulary_gives_empty_top_words() {
        let mut store = AssignmentStore::new();
        store.new_root(0);
        let p = Particle::new_root(0, 2, 1.0);
        let vocab = VocabularyMap::new();
        let report = topic_report(std::slice::from_ref(&p), &vocab, 2, 0.1, 5);
        assert!(report.particles[0][0].is_empty());
    }
}
