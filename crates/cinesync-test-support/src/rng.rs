//! Test RNG — deterministic `DeterministicRng` implementation for tests.

use cinesync_core::rng::DeterministicRng;

/// An RNG that returns values from a predetermined sequence, clamped to the
/// requested range. Panics if the sequence is exhausted. Used in tests that
/// need repeatable room codes.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u32>,
    index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` with the given values.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let val = self.values[self.index];
        self.index += 1;
        val.clamp(min, max)
    }
}
