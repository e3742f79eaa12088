//! Set of frames known to be in the browser's image cache

use std::collections::BTreeSet;

/// Append-only record of loaded frame indices
///
/// Losing it only costs a re-fetch, so it is never persisted.
#[derive(Debug, Clone, Default)]
pub struct FrameCache {
    loaded: BTreeSet<usize>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the frame was not already recorded
    pub fn mark_loaded(&mut self, frame: usize) -> bool {
        self.loaded.insert(frame)
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.loaded.contains(&frame)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Whether every frame of a `total`-frame set is loaded
    pub fn is_complete(&self, total: usize) -> bool {
        (0..total).all(|f| self.loaded.contains(&f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_monotonically() {
        let mut cache = FrameCache::new();
        assert!(cache.is_empty());
        assert!(cache.mark_loaded(3));
        assert!(!cache.mark_loaded(3));
        assert!(cache.mark_loaded(0));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(3));
        assert!(!cache.contains(1));
    }

    #[test]
    fn test_is_complete() {
        let mut cache = FrameCache::new();
        for f in 0..4 {
            assert!(!cache.is_complete(4));
            cache.mark_loaded(f);
        }
        assert!(cache.is_complete(4));
    }
}
