//! Public surface of the lock-free engine.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{self, Ordering};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

use crate::hash;
use crate::lockfree::counter::LiveCounter;
use crate::lockfree::table::{
    self, CellBox, Expected, InsertOutcome, InsertState, ReadOutcome, Table, WriteOutcome,
};
use crate::DefaultHashBuilder;

const DEFAULT_CAPACITY: usize = 16;

/// A hash map shared by reference across threads. Reads are wait-free off
/// the common path; writes are compare-and-swap loops; resizing is performed
/// by one thread while the others wait for the root table to swap.
///
/// Values come back by clone ([`get`](Self::get)) or through a borrowing
/// closure ([`get_and`](Self::get_and)); references cannot outlive the
/// epoch pin that keeps the entry alive.
pub struct LockFreeSwissMap<K, V, S = DefaultHashBuilder> {
    root: Atomic<Table<K, V>>,
    live: LiveCounter,
    build_hasher: S,
}

impl<K, V> LockFreeSwissMap<K, V, DefaultHashBuilder> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a map sized for `capacity` entries, rounded up to a whole
    /// power-of-two number of 8-slot groups.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> LockFreeSwissMap<K, V, S> {
    pub fn with_hasher(build_hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, build_hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: S) -> Self {
        Self {
            root: Atomic::new(Table::with_groups(hash::groups_for(capacity))),
            live: LiveCounter::new(),
            build_hasher,
        }
    }

    /// Approximate number of live entries: the striped counter's sum, which
    /// trails in-flight operations on other threads.
    pub fn len(&self) -> usize {
        self.live.sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slot count of the current table.
    pub fn capacity(&self) -> usize {
        let guard = &crossbeam_epoch::pin();
        // SAFETY: root is never null.
        unsafe { self.root.load(Ordering::Acquire, guard).deref() }.capacity()
    }

    /// Spins until the root no longer references `old`.
    fn wait_for_swap(&self, guard: &Guard, old: Shared<'_, Table<K, V>>) {
        while self.root.load(Ordering::Acquire, guard) == old {
            std::hint::spin_loop();
        }
    }

    /// Loads the current table, waiting out any in-flight resize.
    fn current<'g>(&self, guard: &'g Guard) -> (Shared<'g, Table<K, V>>, &'g Table<K, V>) {
        loop {
            let shared = self.root.load(Ordering::Acquire, guard);
            // SAFETY: root is never null, and the guard pins its epoch.
            let table = unsafe { shared.deref() };
            if !table.is_resizing(guard) {
                return (shared, table);
            }
            self.wait_for_swap(guard, shared);
        }
    }
}

impl<K, V, S> LockFreeSwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash_of<Q>(&self, key: &Q) -> u32
    where
        Q: Hash + ?Sized,
    {
        hash::smeared_hash(&self.build_hasher, key)
    }

    /// Performs (or waits out) a resize of the table at `old`, retiring it
    /// once the successor is published.
    fn resize_or_wait<'g>(&self, guard: &'g Guard, old: Shared<'g, Table<K, V>>) {
        // SAFETY: `old` was loaded under `guard`, which still pins it.
        let old_ref = unsafe { old.deref() };
        match old_ref.resize(guard, &self.build_hasher) {
            Some(next) => {
                let swapped = self
                    .root
                    .compare_exchange(old, next, Ordering::AcqRel, Ordering::Acquire, guard);
                assert!(swapped.is_ok(), "only the copy winner swaps the root");
                // SAFETY: no new operation can reach the drained table.
                unsafe { table::defer_acquire_destroy(guard, old) };
            }
            None => self.wait_for_swap(guard, old),
        }
    }

    /// Clones the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_and(key, V::clone)
    }

    /// Applies `with_value` to the value stored for `key` without cloning.
    pub fn get_and<Q, F, T>(&self, key: &Q, with_value: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> T,
    {
        self.get_key_value_and(key, |_, v| with_value(v))
    }

    /// Clones the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Clone,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_key_value_and(key, |k, v| (k.clone(), v.clone()))
    }

    /// Applies `with_entry` to the stored key and value for `key`.
    pub fn get_key_value_and<Q, F, T>(&self, key: &Q, with_entry: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&K, &V) -> T,
    {
        let guard = &crossbeam_epoch::pin();
        let hash = self.hash_of(key);
        loop {
            let (_, table) = self.current(guard);
            match table.find(guard, hash, |k| k.borrow() == key) {
                ReadOutcome::Present(stored_key, val) => {
                    // SAFETY: live pointers observed under the guard.
                    let value = &unsafe { val.deref() }.0;
                    return Some(with_entry(stored_key, value));
                }
                ReadOutcome::Absent => return None,
                ReadOutcome::Retry => std::hint::spin_loop(),
            }
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_and(key, |_| ()).is_some()
    }

    /// Inserts the pair, returning a clone of the value it displaced.
    pub fn insert(&self, key: K, value: V) -> Option<V>
    where
        V: Clone,
    {
        self.put(key, value, false)
    }

    /// Inserts only when no live value exists; otherwise returns a clone of
    /// the existing value and leaves the map untouched.
    pub fn insert_if_absent(&self, key: K, value: V) -> Option<V>
    where
        V: Clone,
    {
        self.put(key, value, true)
    }

    fn put(&self, key: K, value: V, only_if_absent: bool) -> Option<V>
    where
        V: Clone,
    {
        let guard = &crossbeam_epoch::pin();
        let hash = self.hash_of(&key);
        let mut state = InsertState::new(key, value);
        loop {
            let (shared, table) = self.current(guard);
            match table.insert(guard, hash, state, only_if_absent) {
                InsertOutcome::Applied(prior) => {
                    if table::is_tombstone(prior) {
                        // Revived a tombstoned slot.
                        self.live.increment();
                        return None;
                    }
                    return match unsafe { prior.as_ref() } {
                        Some(cell) => {
                            let displaced = cell.0.clone();
                            // SAFETY: the CAS detached `prior`.
                            unsafe { table::defer_acquire_destroy(guard, prior) };
                            Some(displaced)
                        }
                        None => {
                            self.live.increment();
                            None
                        }
                    };
                }
                InsertOutcome::Unchanged(current, _) => {
                    // SAFETY: `current` is live under the guard.
                    return Some(unsafe { current.deref() }.0.clone());
                }
                InsertOutcome::Retry(s) => {
                    state = s;
                    std::hint::spin_loop();
                }
                InsertOutcome::NeedResize(s) => {
                    state = s;
                    self.resize_or_wait(guard, shared);
                }
            }
        }
    }

    /// Removes `key`, returning a clone of the removed value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let guard = &crossbeam_epoch::pin();
        let hash = self.hash_of(key);
        loop {
            let (shared, table) = self.current(guard);
            let mut delete = None;
            match table.update(
                guard,
                hash,
                |k| k.borrow() == key,
                &mut delete,
                &mut Expected::Present,
            ) {
                WriteOutcome::Applied(prior) => {
                    self.live.decrement();
                    // SAFETY: `Present` guarantees a live prior value, now
                    // detached by the CAS.
                    let removed = unsafe { prior.deref() }.0.clone();
                    unsafe { table::defer_acquire_destroy(guard, prior) };
                    return Some(removed);
                }
                WriteOutcome::Unchanged(_) => return None,
                WriteOutcome::Retry => std::hint::spin_loop(),
                WriteOutcome::NeedResize => self.resize_or_wait(guard, shared),
            }
        }
    }

    /// Removes `key` only when its value equals `expected`.
    pub fn remove_if_eq<Q>(&self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let guard = &crossbeam_epoch::pin();
        let hash = self.hash_of(key);
        loop {
            let (shared, table) = self.current(guard);
            let mut delete = None;
            let mut pred = |v: &V| v == expected;
            match table.update(
                guard,
                hash,
                |k| k.borrow() == key,
                &mut delete,
                &mut Expected::Satisfies(&mut pred),
            ) {
                WriteOutcome::Applied(prior) => {
                    self.live.decrement();
                    // SAFETY: detached by the CAS.
                    unsafe { table::defer_acquire_destroy(guard, prior) };
                    return true;
                }
                WriteOutcome::Unchanged(_) => return false,
                WriteOutcome::Retry => std::hint::spin_loop(),
                WriteOutcome::NeedResize => self.resize_or_wait(guard, shared),
            }
        }
    }

    /// Replaces the value for `key` only if a live value exists, returning a
    /// clone of the displaced value.
    pub fn replace<Q>(&self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let guard = &crossbeam_epoch::pin();
        let hash = self.hash_of(key);
        let mut new_val = Some(Owned::new(CellBox(value)));
        loop {
            let (shared, table) = self.current(guard);
            match table.update(
                guard,
                hash,
                |k| k.borrow() == key,
                &mut new_val,
                &mut Expected::Present,
            ) {
                WriteOutcome::Applied(prior) => {
                    // SAFETY: detached by the CAS.
                    let displaced = unsafe { prior.deref() }.0.clone();
                    unsafe { table::defer_acquire_destroy(guard, prior) };
                    return Some(displaced);
                }
                WriteOutcome::Unchanged(_) => return None,
                WriteOutcome::Retry => std::hint::spin_loop(),
                WriteOutcome::NeedResize => self.resize_or_wait(guard, shared),
            }
        }
    }

    /// Replaces the value for `key` only when the current value equals
    /// `expected`.
    pub fn compare_and_replace<Q>(&self, key: &Q, expected: &V, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let guard = &crossbeam_epoch::pin();
        let hash = self.hash_of(key);
        let mut new_val = Some(Owned::new(CellBox(value)));
        loop {
            let (shared, table) = self.current(guard);
            let mut pred = |v: &V| v == expected;
            match table.update(
                guard,
                hash,
                |k| k.borrow() == key,
                &mut new_val,
                &mut Expected::Satisfies(&mut pred),
            ) {
                WriteOutcome::Applied(prior) => {
                    // SAFETY: detached by the CAS.
                    unsafe { table::defer_acquire_destroy(guard, prior) };
                    return true;
                }
                WriteOutcome::Unchanged(_) => return false,
                WriteOutcome::Retry => std::hint::spin_loop(),
                WriteOutcome::NeedResize => self.resize_or_wait(guard, shared),
            }
        }
    }

    /// Returns the value for `key`, inserting the one built by `init` when
    /// absent. `init` may run and its result be discarded if another thread
    /// publishes first.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        let value = init();
        match self.insert_if_absent(key, value.clone()) {
            Some(existing) => existing,
            None => value,
        }
    }

    /// Re-maps the value for `key` while one is present: `f` returning
    /// `None` removes the entry. Retries optimistically until the value it
    /// read is still the one it replaces.
    pub fn compute_if_present<Q, F>(&self, key: &Q, mut f: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnMut(&V) -> Option<V>,
        V: Clone + PartialEq,
    {
        loop {
            let current = self.get(key)?;
            match f(&current) {
                Some(next) => {
                    if self.compare_and_replace(key, &current, next.clone()) {
                        return Some(next);
                    }
                }
                None => {
                    if self.remove_if_eq(key, &current) {
                        return None;
                    }
                }
            }
        }
    }

    /// Full compute: `f` sees the current value (or `None`) and decides the
    /// next one (`None` removes). Returns the value the map holds afterward.
    pub fn compute<F>(&self, key: K, mut f: F) -> Option<V>
    where
        K: Clone,
        F: FnMut(Option<&V>) -> Option<V>,
        V: Clone + PartialEq,
    {
        loop {
            let current = self.get(&key);
            match f(current.as_ref()) {
                Some(next) => match current {
                    None => {
                        if self.insert_if_absent(key.clone(), next.clone()).is_none() {
                            return Some(next);
                        }
                    }
                    Some(old) => {
                        if self.compare_and_replace(&key, &old, next.clone()) {
                            return Some(next);
                        }
                    }
                },
                None => match current {
                    None => return None,
                    Some(old) => {
                        if self.remove_if_eq(&key, &old) {
                            return None;
                        }
                    }
                },
            }
        }
    }

    /// Inserts every pair from `entries`.
    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        V: Clone,
    {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Tombstones every live entry of the current table. Capacity is
    /// retained; entries being drained by a concurrent resize may survive.
    pub fn clear(&self) {
        let guard = &crossbeam_epoch::pin();
        let (_, table) = self.current(guard);
        let cleared = table.clear(guard);
        self.live.sub(cleared);
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let guard = &crossbeam_epoch::pin();
        loop {
            let (_, table) = self.current(guard);
            match table.scan(guard, |_, v| v == value) {
                Some(found) => return found,
                // A resize started mid-scan; rescan the successor.
                None => std::hint::spin_loop(),
            }
        }
    }

    /// Point-in-time snapshot of the live entries. The walk restarts if a
    /// resize begins mid-scan, and values being copied out are read through
    /// their Prime box (they are still current).
    fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let guard = &crossbeam_epoch::pin();
        loop {
            let (_, table) = self.current(guard);
            let mut entries = Vec::new();
            let complete = table.scan(guard, |k, v| {
                entries.push((k.clone(), v.clone()));
                false
            });
            if complete.is_some() {
                return entries;
            }
            std::hint::spin_loop();
        }
    }

    /// Iterates a point-in-time snapshot of the live entries.
    pub fn iter(&self) -> Iter<K, V>
    where
        K: Clone,
        V: Clone,
    {
        Iter {
            entries: self.snapshot().into_iter(),
        }
    }

    pub fn keys(&self) -> Keys<K, V>
    where
        K: Clone,
        V: Clone,
    {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<K, V>
    where
        K: Clone,
        V: Clone,
    {
        Values { inner: self.iter() }
    }
}

impl<K, V, S> Drop for LockFreeSwissMap<K, V, S> {
    fn drop(&mut self) {
        // Exclusive access: no reader, writer, or resize can be in flight.
        let guard = unsafe { crossbeam_epoch::unprotected() };
        atomic::fence(Ordering::Acquire);
        let root = self.root.load(Ordering::Relaxed, guard);
        // SAFETY: root is never null; cells are drained exactly once and the
        // table allocation follows.
        unsafe {
            root.deref().release_cells(guard);
            drop(root.into_owned());
        }
    }
}

impl<K, V> Default for LockFreeSwissMap<K, V, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> fmt::Debug for LockFreeSwissMap<K, V, S>
where
    K: fmt::Debug + Clone + Hash + Eq,
    V: fmt::Debug + Clone,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

/// Owning iterator over a snapshot of the map.
pub struct Iter<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for Iter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

pub struct Keys<K, V> {
    inner: Iter<K, V>,
}

impl<K, V> Iterator for Keys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }
}

pub struct Values<K, V> {
    inner: Iter<K, V>,
}

impl<K, V> Iterator for Values<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next().map(|(_, v)| v)
    }
}
