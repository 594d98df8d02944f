use rand::Rng;

use crate::error::{ChainError, Result};

/// Draws items with a probability proportional to their weight.
///
/// The sampler stores the prefix sums of the weights. A draw picks a uniform
/// integer in `[0, total)` and returns the first item whose cumulative weight
/// is strictly greater than the draw, which is an O(log n) binary search.
///
/// ## Invariants
/// - `items` and `cumulative` have the same, non-zero, length
/// - `cumulative` is strictly increasing (every weight is >= 1)
///
/// Drawing never consumes or decays an item: successive calls to [`next`]
/// are independent and identically distributed.
///
/// [`next`]: WeightedSampler::next
#[derive(Clone, Debug)]
pub struct WeightedSampler<T> {
	items: Vec<T>,
	cumulative: Vec<u64>,
}

impl<T> WeightedSampler<T> {
	/// Builds a sampler from `(item, weight)` pairs.
	///
	/// The order of the pairs has no effect on the distribution.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidWeight`] if there is no pair, if a weight
	/// is zero, or if the weights add up to more than `u64::MAX`.
	pub fn new<I>(pairs: I) -> Result<Self>
	where
		I: IntoIterator<Item = (T, u64)>,
	{
		let pairs = pairs.into_iter();
		let (lower, _) = pairs.size_hint();
		let mut items = Vec::with_capacity(lower);
		let mut cumulative = Vec::with_capacity(lower);
		let mut total: u64 = 0;

		for (item, weight) in pairs {
			if weight == 0 {
				return Err(ChainError::invalid_weight(format!(
					"weight of candidate #{} must be strictly positive",
					items.len()
				)));
			}
			total = total
				.checked_add(weight)
				.ok_or_else(|| ChainError::invalid_weight("total weight overflows u64"))?;
			items.push(item);
			cumulative.push(total);
		}

		if items.is_empty() {
			return Err(ChainError::invalid_weight("no candidate to sample from"));
		}

		Ok(Self { items, cumulative })
	}

	/// Builds a sampler where every item has weight 1.
	pub fn uniform<I>(items: I) -> Result<Self>
	where
		I: IntoIterator<Item = T>,
	{
		Self::new(items.into_iter().map(|item| (item, 1)))
	}

	/// Number of candidates.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Always `false`, a sampler cannot be built without candidates.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Sum of all weights.
	pub fn total(&self) -> u64 {
		self.cumulative.last().copied().unwrap_or(0)
	}

	/// Draws one item.
	pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
		let draw = rng.random_range(0..self.total());
		// First bucket whose cumulative weight exceeds the draw
		let index = self.cumulative.partition_point(|&bound| bound <= draw);
		&self.items[index]
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::collections::HashMap;

	fn frequencies(sampler: &WeightedSampler<&'static str>, draws: usize, seed: u64) -> HashMap<&'static str, usize> {
		let mut rng = StdRng::seed_from_u64(seed);
		let mut seen = HashMap::new();
		for _ in 0..draws {
			*seen.entry(*sampler.next(&mut rng)).or_insert(0) += 1;
		}
		seen
	}

	#[test]
	fn rejects_empty_candidates() {
		let result = WeightedSampler::<&str>::new(Vec::new());
		assert!(matches!(result, Err(ChainError::InvalidWeight(_))));
	}

	#[test]
	fn rejects_zero_weight() {
		let result = WeightedSampler::new(vec![("a", 3), ("b", 0)]);
		assert!(matches!(result, Err(ChainError::InvalidWeight(_))));
	}

	#[test]
	fn rejects_overflowing_total() {
		let result = WeightedSampler::new(vec![("a", u64::MAX), ("b", 1)]);
		assert!(matches!(result, Err(ChainError::InvalidWeight(_))));
	}

	#[test]
	fn single_candidate_is_always_drawn() {
		let sampler = WeightedSampler::new(vec![("only", 7)]).unwrap();
		let seen = frequencies(&sampler, 1_000, 1);
		assert_eq!(seen.len(), 1);
		assert_eq!(seen["only"], 1_000);
	}

	#[test]
	fn draws_follow_weights() {
		let sampler = WeightedSampler::new(vec![("a", 1), ("b", 3), ("c", 6)]).unwrap();
		assert_eq!(sampler.total(), 10);

		let draws = 20_000;
		let seen = frequencies(&sampler, draws, 42);
		for (item, expected) in [("a", 0.1), ("b", 0.3), ("c", 0.6)] {
			let observed = seen[item] as f64 / draws as f64;
			assert!((observed - expected).abs() < 0.02, "{item}: {observed} vs {expected}");
		}
	}

	#[test]
	fn order_does_not_change_distribution() {
		let forward = WeightedSampler::new(vec![("x", 2), ("y", 8)]).unwrap();
		let backward = WeightedSampler::new(vec![("y", 8), ("x", 2)]).unwrap();

		let draws = 20_000;
		let f = frequencies(&forward, draws, 3);
		let b = frequencies(&backward, draws, 4);
		let fx = f["x"] as f64 / draws as f64;
		let bx = b["x"] as f64 / draws as f64;
		assert!((fx - 0.2).abs() < 0.02);
		assert!((bx - 0.2).abs() < 0.02);
	}

	#[test]
	fn uniform_gives_every_item_weight_one() {
		let sampler = WeightedSampler::uniform(["a", "b", "c", "d"]).unwrap();
		assert_eq!(sampler.len(), 4);
		assert_eq!(sampler.total(), 4);

		let draws = 20_000;
		let seen = frequencies(&sampler, draws, 9);
		for item in ["a", "b", "c", "d"] {
			let observed = seen[item] as f64 / draws as f64;
			assert!((observed - 0.25).abs() < 0.02);
		}
	}
}
