//! Bounded random selection of oversized lists.
//!
//! Reports cap every list at a maximum size. When a list is larger, a random
//! subset is reported instead, so that over many reports different members of
//! the full population show up. Selection goes through the [`Selector`]
//! trait so callers can swap in a deterministic strategy.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Strategy picking which elements of an oversized list survive.
pub trait Selector {
    /// Return exactly `amount` distinct indices in `0..len`.
    ///
    /// Only called with `amount < len`.
    fn select(&mut self, len: usize, amount: usize) -> Vec<usize>;
}

/// Uniform selection without replacement, reseeded from OS entropy on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn select(&mut self, len: usize, amount: usize) -> Vec<usize> {
        let mut rng = StdRng::from_entropy();
        rand::seq::index::sample(&mut rng, len, amount).into_vec()
    }
}

/// Keeps the first `amount` elements. Deterministic, for tests and tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstSelector;

impl Selector for FirstSelector {
    fn select(&mut self, _len: usize, amount: usize) -> Vec<usize> {
        (0..amount).collect()
    }
}

/// Bound `items` to at most `max_size` elements.
///
/// A `max_size` of zero means unbounded. Lists within bound come back
/// unchanged and in order.
pub fn downsample<T: Clone>(items: &[T], max_size: usize, selector: &mut dyn Selector) -> Vec<T> {
    if max_size == 0 || items.len() <= max_size {
        return items.to_vec();
    }

    selector
        .select(items.len(), max_size)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}
