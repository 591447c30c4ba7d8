//! Vitter-style uniform reservoir sampling over a stream of documents.
//!
//! For the first `K` insertions every item is retained. After that, the
//! `c`-th insertion (`c` = items seen before this one) replaces a uniformly
//! chosen existing slot with probability `K / (c + 1)`, and is otherwise
//! dropped.

use rand::Rng;

use crate::error::EngineError;

/// The outcome of inserting an item into a [`ReservoirSampler`]: either the
/// slot it now occupies, or `NotRetained` if the item was not sampled into
/// the reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Index(usize),
    NotRetained,
}

impl Slot {
    pub fn index(self) -> Option<usize> {
        match self {
            Slot::Index(i) => Some(i),
            Slot::NotRetained => None,
        }
    }
}

pub struct ReservoirSampler<T> {
    capacity: usize,
    seen: u64,
    slots: Vec<Option<T>>,
}

impl<T> ReservoirSampler<T> {
    pub fn new(capacity: usize) -> Self {
        ReservoirSampler {
            capacity,
            seen: 0,
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Reserves a slot for the next stream item according to the Vitter
    /// rule, without yet writing any content into it. `initial` is stored
    /// immediately if the item is retained, so that callers who need to
    /// fill the content in incrementally (see `get_mut`) have something to
    /// mutate right away.
    pub fn reserve_with(&mut self, rng: &mut impl Rng, initial: T) -> Slot {
        let c = self.seen;
        self.seen += 1;
        if self.capacity == 0 {
            return Slot::NotRetained;
        }
        if c < self.capacity as u64 {
            self.slots[c as usize] = Some(initial);
            Slot::Index(c as usize)
        } else {
            let r: u64 = rng.gen_range(0..=c);
            if r < self.capacity as u64 {
                self.slots[r as usize] = Some(initial);
                Slot::Index(r as usize)
            } else {
                Slot::NotRetained
            }
        }
    }

    /// Inserts a complete item in one shot. `reserve_with` exists to let the
    /// engine stream a document's word ids in as they are produced; this is
    /// the convenience form for callers with the whole item in hand up
    /// front.
    pub fn add(&mut self, item: T, rng: &mut impl Rng) -> Slot {
        self.reserve_with(rng, item)
    }

    pub fn get(&self, slot: usize) -> Result<&T, EngineError> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(EngineError::ReservoirSlotOutOfRange {
                slot,
                capacity: self.capacity,
            })
    }

    pub fn get_mut(&mut self, slot: usize) -> Result<&mut T, EngineError> {
        let capacity = self.capacity;
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(EngineError::ReservoirSlotOutOfRange { slot, capacity })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_ref().map(|v| (i, v)))
    }

    /// Number of slots currently holding a document: `min(seen, capacity)`.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fill_phase_fills_slots_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut rs: ReservoirSampler<i32> = ReservoirSampler::new(3);
        assert_eq!(rs.add(10, &mut rng), Slot::Index(0));
        assert_eq!(rs.add(20, &mut rng), Slot::Index(1));
        assert_eq!(rs.add(30, &mut rng), Slot::Index(2));
        assert_eq!(rs.occupied(), 3);
    }

    #[test]
    fn occupied_never_exceeds_capacity() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut rs: ReservoirSampler<i32> = ReservoirSampler::new(10);
        for i in 0..10_000 {
            rs.add(i, &mut rng);
        }
        assert_eq!(rs.occupied(), 10);
        assert_eq!(rs.seen(), 10_000);
    }

    #[test]
    fn zero_capacity_never_retains() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut rs: ReservoirSampler<i32> = ReservoirSampler::new(0);
        for i in 0..50 {
            assert_eq!(rs.add(i, &mut rng), Slot::NotRetained);
        }
        assert_eq!(rs.occupied(), 0);
        assert_eq!(rs.seen(), 50);
    }

    #[test]
    fn get_mut_allows_incremental_fill() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut rs: ReservoirSampler<Vec<u32>> = ReservoirSampler::new(2);
        let slot = rs.add(Vec::new(), &mut rng);
        let idx = slot.index().unwrap();
        rs.get_mut(idx).unwrap().push(1);
        rs.get_mut(idx).unwrap().push(2);
        assert_eq!(rs.get(idx).unwrap(), &vec![1, 2]);
    }

    #[test]
    fn out_of_range_slot_errors() {
        let rs: ReservoirSampler<i32> = ReservoirSampler::new(2);
        assert!(matches!(
            rs.get(5),
            Err(EngineError::ReservoirSlotOutOfRange { .. })
        ));
    }

    #[test]
    fn deterministic_with_same_seed() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        let mut rs1: ReservoirSampler<i32> = ReservoirSampler::new(5);
        let mut rs2: ReservoirSampler<i32> = ReservoirSampler::new(5);
        let mut out1 = vec![];
        let mut out2 = vec![];
        for i in 0..200 {
            out1.push(rs1.add(i, &mut rng1));
            out2.push(rs2.add(i, &mut rng2));
        }
        assert_eq!(
            out1.iter().map(|s| s.index()).collect::<Vec<_>>(),
            out2.iter().map(|s| s.index()).collect::<Vec<_>>()
        );
    }

    // Monte Carlo check: every one of the first N items seen is equally
    // likely to end up in any particular slot once N > K.
    #[test]
    fn uniform_over_many_trials() {
        let n = 10_000usize;
        let k = 100usize;
        let trials = 1_000u64;
        let mut counts = vec![0u64; n];

        for seed in 0..trials {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut rs: ReservoirSampler<usize> = ReservoirSampler::new(k);
            for i in 0..n {
                rs.add(i, &mut rng);
            }
            for (_, &item) in rs.iter() {
                counts[item] += 1;
            }
        }

        let expected = trials as f64 * k as f64 / n as f64;
        // Binomial-ish standard deviation per item; allow a generous 3-sigma
        // band plus a floor so low-count items don't trip on rounding.
        let sigma = (expected * (1.0 - k as f64 / n as f64)).sqrt();
        let mut failures = 0;
        for &c in &counts {
            if (c as f64 - expected).abs() > 5.0 * sigma.max(1.0) {
                failures += 1;
            }
        }
        // Allow a small fraction of outliers since this is a statistical test.
        assert!(
            failures < n / 20,
            "{failures} of {n} items fell outside the expected band"
        );
    }
}
