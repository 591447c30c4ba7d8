//! Copy-on-write tree of topic assignments, keyed by particle-store-id.
//!
//! When a particle is resampled, most of its word-topic assignments are
//! shared with the particle it was copied from. Rather than copy every
//! assignment the particle has ever made (`O(total words)`), each particle
//! is a node in a forest: its local table holds only the assignments it has
//! written itself, and a lookup that misses locally walks up to the parent.
//! This makes resample `O(1)` per particle instead of `O(words)`.

use ahash::AHashMap;

use crate::error::EngineError;

pub type ParticleId = u64;

struct Node {
    parent: Option<ParticleId>,
    overrides: AHashMap<(usize, usize), usize>,
}

#[derive(Default)]
pub struct AssignmentStore {
    nodes: AHashMap<ParticleId, Node>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        AssignmentStore::default()
    }

    pub fn new_root(&mut self, particle: ParticleId) {
        self.nodes.insert(
            particle,
            Node {
                parent: None,
                overrides: AHashMap::new(),
            },
        );
    }

    pub fn new_child(&mut self, particle: ParticleId, parent: ParticleId) {
        self.nodes.insert(
            particle,
            Node {
                parent: Some(parent),
                overrides: AHashMap::new(),
            },
        );
    }

    /// Registers a new document for `particle`. The override table is
    /// created lazily by `set`, so there is nothing to allocate up front;
    /// this is the natural place to hook in eager allocation later if
    /// profiling calls for it.
    pub fn new_document(&mut self, _particle: ParticleId, _doc: usize) {}

    pub fn set(
        &mut self,
        particle: ParticleId,
        doc: usize,
        word: usize,
        topic: usize,
    ) -> Result<(), EngineError> {
        let node = self
            .nodes
            .get_mut(&particle)
            .ok_or(EngineError::AssignmentMissing {
                particle,
                doc,
                word,
            })?;
        node.overrides.insert((doc, word), topic);
        Ok(())
    }

    /// Walks from `particle` up through its ancestors until some node
    /// defines `(doc, word)`. Fails with `AssignmentMissing` if no ancestor
    /// (including a root) defines it — an invariant violation.
    pub fn get(&self, particle: ParticleId, doc: usize, word: usize) -> Result<usize, EngineError> {
        let mut current = Some(particle);
        while let Some(id) = current {
            let node = self.nodes.get(&id).ok_or(EngineError::AssignmentMissing {
                particle,
                doc,
                word,
            })?;
            if let Some(&topic) = node.overrides.get(&(doc, word)) {
                return Ok(topic);
            }
            current = node.parent;
        }
        Err(EngineError::AssignmentMissing {
            particle,
            doc,
            word,
        })
    }

    /// Reclaims nodes that are neither a live particle nor on the path from
    /// a live particle to a needed assignment. Left as a no-op: a pure
    /// optimization, safe to defer indefinitely.
    pub fn prune(&mut self) {}
}
