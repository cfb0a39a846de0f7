//! Keyed cache for rendered bylaw pages.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

const DEFAULT_CAPACITY: usize = 64;

/// Process-wide cache of rendered HTML.
///
/// Keys fold the render scope together with the store's cache version, so
/// invalidation is coarse: any clause save bumps the version and every
/// outstanding key goes stale at once, regardless of which group changed.
/// Stale entries age out of the bounded map instead of being purged eagerly.
pub struct RenderCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    entries: HashMap<u64, String>,
    order: VecDeque<u64>,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Cache key for one render scope at one store version.
    pub fn key(group: Option<&str>, version: u64) -> u64 {
        let scope = group.unwrap_or("");
        (u64::from(crc32fast::hash(scope.as_bytes())) << 32) ^ version
    }

    pub fn get(&self, key: u64) -> Option<String> {
        self.inner.lock().entries.get(&key).cloned()
    }

    pub fn insert(&self, key: u64, html: String) {
        let mut inner = self.inner.lock();
        if inner.entries.insert(key, html).is_none() {
            inner.order.push_back(key);
        }
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
