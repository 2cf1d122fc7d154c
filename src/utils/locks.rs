use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// One lock per key, created on first use. An entry is dropped again once the last holder
/// releases it, so the map only holds keys that are in use.
pub struct KeyedLocks<K, L> {
    locks: Mutex<HashMap<K, Arc<L>>>,
}

impl<K, L> Default for KeyedLocks<K, L> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy, L: Default> KeyedLocks<K, L> {
    pub fn new() -> Self {
        Self::default()
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<K, Arc<L>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock of `key`. Has to be handed back through [KeyedLocks::release] once the caller is done
    /// with it.
    pub fn acquire(&self, key: K) -> Arc<L> {
        self.locks().entry(key).or_default().clone()
    }

    pub fn release(&self, key: K, lock: Arc<L>) {
        let mut locks = self.locks();
        drop(lock);
        // Nobody can clone the entry while the map is locked, so a count of 1 means it's unused.
        if locks.get(&key).is_some_and(|v| Arc::strong_count(v) == 1) {
            locks.remove(&key);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks().len()
    }
}
