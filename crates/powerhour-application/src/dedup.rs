//! Bounded memory of recently seen upstream deliveries.

use std::collections::{HashSet, VecDeque};

/// FIFO set of delivery keys. Once full, the oldest key is forgotten.
#[derive(Debug)]
pub struct DedupCache {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Records `key`; returns `false` when it was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(key.to_string());
        self.seen.insert(key.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_key_rejected() {
        let mut cache = DedupCache::new(4);
        assert!(cache.insert("call-1:dial"));
        assert!(!cache.insert("call-1:dial"));
        assert!(cache.insert("call-1:connection"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_oldest_key_evicted() {
        let mut cache = DedupCache::new(2);
        cache.insert("a");
        cache.insert("b");
        cache.insert("c");
        assert_eq!(cache.len(), 2);
        assert!(cache.insert("a"));
        assert!(!cache.insert("c"));
    }
}
