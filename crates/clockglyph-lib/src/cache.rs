//! Bounded icon cache — insertion-ordered, oldest entry evicted first.

use std::collections::{HashMap, VecDeque};

use crate::render::Bitmap;

/// Default number of icons kept. A day of minute icons in one color fits
/// comfortably; color or format changes push older entries out.
pub const DEFAULT_CAPACITY: usize = 100;

/// FIFO cache from cache key to rendered bitmap.
#[derive(Debug)]
pub struct RenderCache {
    capacity: usize,
    entries: HashMap<String, Bitmap>,
    order: VecDeque<String>,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RenderCache {
    /// Create an empty cache. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Bitmap> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace `key`. Replacing keeps the entry's original age.
    ///
    /// Returns the evicted key, if the insert pushed one out.
    pub fn insert(&mut self, key: String, bitmap: Bitmap) -> Option<String> {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = bitmap;
            return None;
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().inspect(|oldest| {
                self.entries.remove(oldest);
            })
        } else {
            None
        };
        self.order.push_back(key.clone());
        self.entries.insert(key, bitmap);
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(tag: u8) -> Bitmap {
        let mut b = Bitmap::new(2, 2);
        b.set_pixel(0, 0, crate::color::Rgb::new(tag, 0, 0));
        b
    }

    #[test]
    fn get_returns_inserted_bitmap() {
        let mut cache = RenderCache::new(4);
        cache.insert("a".into(), bitmap(1));
        assert_eq!(cache.get("a"), Some(&bitmap(1)));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn overflow_evicts_exactly_the_first_key() {
        let n = 5;
        let mut cache = RenderCache::new(n);
        for i in 0..=n {
            cache.insert(format!("k{i}"), bitmap(i as u8));
        }
        assert_eq!(cache.len(), n);
        assert!(!cache.contains("k0"));
        for i in 1..=n {
            assert!(cache.contains(&format!("k{i}")), "k{i} should remain");
        }
    }

    #[test]
    fn insert_reports_evicted_key() {
        let mut cache = RenderCache::new(2);
        assert_eq!(cache.insert("a".into(), bitmap(1)), None);
        assert_eq!(cache.insert("b".into(), bitmap(2)), None);
        assert_eq!(cache.insert("c".into(), bitmap(3)).as_deref(), Some("a"));
    }

    #[test]
    fn eviction_is_fifo_not_lru() {
        let mut cache = RenderCache::new(2);
        cache.insert("a".into(), bitmap(1));
        cache.insert("b".into(), bitmap(2));
        // Reading "a" does not refresh it.
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), bitmap(3));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn replacing_existing_key_keeps_age_and_size() {
        let mut cache = RenderCache::new(2);
        cache.insert("a".into(), bitmap(1));
        cache.insert("b".into(), bitmap(2));
        assert_eq!(cache.insert("a".into(), bitmap(9)), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(&bitmap(9)));
        cache.insert("c".into(), bitmap(3));
        assert!(!cache.contains("a"), "replaced entry is still the oldest");
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = RenderCache::new(3);
        cache.insert("a".into(), bitmap(1));
        cache.insert("b".into(), bitmap(2));
        cache.clear();
        assert!(cache.is_empty());
        cache.insert("c".into(), bitmap(3));
        cache.insert("d".into(), bitmap(4));
        cache.insert("e".into(), bitmap(5));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut cache = RenderCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a".into(), bitmap(1));
        cache.insert("b".into(), bitmap(2));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("b"));
    }

    #[test]
    fn default_capacity() {
        assert_eq!(RenderCache::default().capacity(), DEFAULT_CAPACITY);
    }
}
