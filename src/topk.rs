//! Bounded top-k selection over candidate streams.
//!
//! The scanners push `(raw distance, flat candidate offset)` pairs as they
//! encounter them; `TopK` keeps the k smallest by distance, breaking ties in
//! favor of the first-seen candidate. For the small k typical of probe-based
//! search, linear worst-slot replacement beats a heap.

/// Running bounded top-k of `(distance, index)` candidates.
#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    entries: Vec<(f32, u32)>,
    /// Current k-th best distance; `f32::INFINITY` until k entries exist.
    threshold: f32,
}

impl TopK {
    /// New selector for the k smallest distances. `k` must be nonzero.
    #[must_use]
    pub fn new(k: usize) -> Self {
        debug_assert!(k > 0);
        Self {
            k,
            entries: Vec::with_capacity(k),
            threshold: f32::INFINITY,
        }
    }

    /// Current k-th best distance, or `f32::INFINITY` while fewer than k
    /// candidates have been accepted. This is the pruning threshold.
    #[inline]
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.k
    }

    /// Offer a candidate. Ties with the current threshold lose (strict `<`),
    /// which preserves first-seen order among equal distances.
    pub fn push(&mut self, dist: f32, index: u32) {
        if self.entries.len() < self.k {
            self.entries.push((dist, index));
            if self.entries.len() == self.k {
                self.recompute_threshold();
            }
            return;
        }
        if dist < self.threshold {
            // Replace the first worst slot.
            if let Some(worst) = self
                .entries
                .iter()
                .position(|&(d, _)| d == self.threshold)
            {
                self.entries[worst] = (dist, index);
                self.recompute_threshold();
            }
        }
    }

    fn recompute_threshold(&mut self) {
        self.threshold = self
            .entries
            .iter()
            .map(|&(d, _)| d)
            .fold(f32::NEG_INFINITY, f32::max);
    }

    /// Drain into `(distance, index)` pairs, ascending by distance.
    ///
    /// The sort is stable, so candidates at equal distance come out in the
    /// order they were first accepted.
    #[must_use]
    pub fn into_sorted(self) -> Vec<(f32, u32)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underfull_keeps_everything() {
        let mut top = TopK::new(5);
        top.push(3.0, 0);
        top.push(1.0, 1);
        assert_eq!(top.len(), 2);
        assert_eq!(top.threshold(), f32::INFINITY);
        assert_eq!(top.into_sorted(), vec![(1.0, 1), (3.0, 0)]);
    }

    #[test]
    fn replaces_worst_once_full() {
        let mut top = TopK::new(2);
        top.push(5.0, 0);
        top.push(3.0, 1);
        assert_eq!(top.threshold(), 5.0);
        top.push(1.0, 2);
        assert_eq!(top.threshold(), 3.0);
        assert_eq!(top.into_sorted(), vec![(1.0, 2), (3.0, 1)]);
    }

    #[test]
    fn ties_favor_first_seen() {
        let mut top = TopK::new(2);
        top.push(2.0, 7);
        top.push(2.0, 8);
        // Equal to the threshold: rejected, slot 7/8 keep their places.
        top.push(2.0, 9);
        assert_eq!(top.into_sorted(), vec![(2.0, 7), (2.0, 8)]);
    }

    #[test]
    fn worse_candidates_are_ignored() {
        let mut top = TopK::new(1);
        top.push(1.0, 0);
        top.push(4.0, 1);
        assert_eq!(top.into_sorted(), vec![(1.0, 0)]);
    }
}
