//! Per-key async mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Slot values that can tell whether they still hold anything worth keeping.
pub trait Vacant {
    fn is_vacant(&self) -> bool;
}

impl Vacant for () {
    fn is_vacant(&self) -> bool {
        true
    }
}

impl<T> Vacant for Option<T> {
    fn is_vacant(&self) -> bool {
        self.is_none()
    }
}

/// Map of independent async mutexes, one per key.
///
/// Holders of different keys never wait on each other. A slot is removed when
/// its guard is dropped, nobody else holds or waits for it, and its value is
/// vacant.
pub struct KeyedMutex<K, V> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<V>>>>,
}

impl<K, V> Default for KeyedMutex<K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedMutex<K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to the value stored under `key`.
    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K, V> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                slots
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(V::default()))),
            )
        };
        let guard = slot.lock_owned().await;

        KeyedGuard {
            owner: self,
            key,
            guard,
        }
    }

    /// Number of slots currently held, awaited or non-vacant.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &K, slot: &Arc<AsyncMutex<V>>, vacant: bool) {
        let Ok(mut slots) = self.slots.lock() else {
            return;
        };
        // One reference in the map and one in the releasing guard. Waiters
        // clone the slot under the map lock, so the count cannot grow here.
        let idle = slots
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2);
        if vacant && idle {
            slots.remove(key);
        }
    }
}

/// Exclusive access to one slot of a [`KeyedMutex`].
pub struct KeyedGuard<'a, K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    owner: &'a KeyedMutex<K, V>,
    key: K,
    guard: OwnedMutexGuard<V>,
}

impl<K, V> KeyedGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V> Deref for KeyedGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    type Target = V;

    fn deref(&self) -> &V {
        &self.guard
    }
}

impl<K, V> DerefMut for KeyedGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    fn deref_mut(&mut self) -> &mut V {
        &mut self.guard
    }
}

impl<K, V> Drop for KeyedGuard<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Vacant + Default,
{
    fn drop(&mut self) {
        let vacant = self.guard.is_vacant();
        self.owner.release(&self.key, OwnedMutexGuard::mutex(&self.guard), vacant);
    }
}
