//! Endpoint selection

use super::EndpointDescriptor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Picks the next endpoint to try
///
/// `remaining` is never empty. The returned index must be in bounds; the
/// failover loop clamps it otherwise.
pub trait Selector: Send {
    fn pick(&mut self, remaining: &[EndpointDescriptor]) -> usize;
}

/// Uniform random selection without replacement
///
/// Priorities and weights are ignored; every remaining endpoint is equally
/// likely. This is what [`Driver::connect`](crate::Driver::connect) uses.
#[derive(Debug)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl RandomSelector<StdRng> {
    /// Selector seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Selector with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSelector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomSelector<R> {
    /// Selector over a caller supplied random source
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> Selector for RandomSelector<R> {
    fn pick(&mut self, remaining: &[EndpointDescriptor]) -> usize {
        if remaining.len() <= 1 {
            return 0;
        }
        self.rng.gen_range(0..remaining.len())
    }
}

/// Priority ordered selection, opt in through
/// [`Driver::connect_with_selector`](crate::Driver::connect_with_selector)
///
/// Only endpoints of the highest remaining priority are eligible (missing
/// priority counts as 0). Inside that tier the pick is random, proportional
/// to weight; a tier whose weights are all 0 is picked uniformly.
#[derive(Debug)]
pub struct PrioritySelector<R = StdRng> {
    rng: R,
}

impl PrioritySelector<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for PrioritySelector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PrioritySelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> Selector for PrioritySelector<R> {
    fn pick(&mut self, remaining: &[EndpointDescriptor]) -> usize {
        if remaining.len() <= 1 {
            return 0;
        }

        let top = remaining
            .iter()
            .map(|e| e.priority().unwrap_or(0))
            .max()
            .unwrap_or(0);
        let tier: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, e)| e.priority().unwrap_or(0) == top)
            .map(|(i, _)| i)
            .collect();

        let total: u64 = tier.iter().map(|&i| u64::from(remaining[i].weight())).sum();
        if total == 0 {
            return tier[self.rng.gen_range(0..tier.len())];
        }
        let mut ticket = self.rng.gen_range(0..total);
        for &i in &tier {
            let weight = u64::from(remaining[i].weight());
            if ticket < weight {
                return i;
            }
            ticket -= weight;
        }
        tier[tier.len() - 1]
    }
}

/// Deterministic selector for tests
///
/// Returns the scripted indices in order (modulo the remaining count), then
/// always the first remaining endpoint.
#[derive(Debug, Clone, Default)]
pub struct SequenceSelector {
    picks: VecDeque<usize>,
}

impl SequenceSelector {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }

    /// Always pick the first remaining endpoint
    pub fn in_order() -> Self {
        Self::default()
    }
}

impl Selector for SequenceSelector {
    fn pick(&mut self, remaining: &[EndpointDescriptor]) -> usize {
        match self.picks.pop_front() {
            Some(i) if !remaining.is_empty() => i % remaining.len(),
            _ => 0,
        }
    }
}
