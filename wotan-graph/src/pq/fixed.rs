//! Fixed-size, comparator-parameterized top-k retention queue (§4.2).
//!
//! Keeps the `capacity` smallest items under the given comparator (`less` retains the smallest
//! values; `greater` retains the largest, since "largest under `greater`" is "smallest under the
//! order `greater` induces"). Used for (a) the per-length worst connection probabilities and
//! (b) the most-demanded routing nodes (§4.10).

use std::cmp::Ordering;

pub struct FixedSizeBoundedPq<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    capacity: usize,
    /// Kept ascending under `cmp`; index 0 is the current "best" (smallest-under-`cmp`) entry.
    items: Vec<T>,
    cmp: F,
}

impl<T, F> FixedSizeBoundedPq<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(capacity: usize, cmp: F) -> Self {
        assert!(capacity > 0, "a fixed-size bounded pq needs a positive capacity");
        Self { capacity, items: Vec::with_capacity(capacity), cmp }
    }

    pub fn push(&mut self, x: T) {
        let pos = self.items.partition_point(|y| (self.cmp)(y, &x) != Ordering::Greater);
        if self.items.len() < self.capacity {
            self.items.insert(pos, x);
        } else if pos < self.items.len() {
            // x is not the worst of the current k; it displaces the current worst.
            self.items.insert(pos, x);
            self.items.pop();
        }
        // else: x is worse than everything currently kept, and we're already at capacity.
    }

    pub fn top(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() { None } else { Some(self.items.remove(0)) }
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn less_comparator_keeps_the_k_smallest() {
        let mut pq = FixedSizeBoundedPq::new(3, |a: &f64, b: &f64| a.partial_cmp(b).unwrap());
        for x in [0.9, 0.1, 0.5, 0.7, 0.2, 0.95, 0.05] {
            pq.push(x);
        }
        let kept: Vec<f64> = pq.iter().copied().collect();
        assert_eq!(kept, vec![0.05, 0.1, 0.2]);
    }

    #[test]
    fn greater_comparator_keeps_the_k_largest() {
        let mut pq = FixedSizeBoundedPq::new(3, |a: &f64, b: &f64| b.partial_cmp(a).unwrap());
        for x in [0.9, 0.1, 0.5, 0.7, 0.2, 0.95, 0.05] {
            pq.push(x);
        }
        let kept: Vec<f64> = pq.iter().copied().collect();
        assert_eq!(kept, vec![0.95, 0.9, 0.7]);
    }

    #[test]
    fn scenario_6_pessimistic_metric_retains_smallest_decile() {
        // §8 scenario 6: 100 connections at length 2, probabilities {0.1,...,1.0} cycling; the
        // per-length PQ retains the 10 smallest.
        let probs: Vec<f64> = (0..100).map(|i| ((i % 10) + 1) as f64 / 10.0).collect();
        let k = (probs.len() as f64 * 0.10).ceil() as usize;
        let mut pq = FixedSizeBoundedPq::new(k, |a: &f64, b: &f64| a.partial_cmp(b).unwrap());
        for p in probs {
            pq.push(p);
        }
        let sum: f64 = pq.iter().sum();
        assert_eq!(pq.size(), 10);
        assert!((sum - 1.0).abs() < 1e-9, "expected sum of ten 0.1 entries, got {sum}");
    }
}
