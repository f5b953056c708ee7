//! A single-owner SwissTable map with SWAR group probing.
//!
//! Slots are triples spread over three parallel arrays: one control byte,
//! one key cell, one value cell. Control bytes are packed eight to a `u64`
//! so a whole group is scanned with a couple of word operations. A control
//! byte is either EMPTY, DELETED (a tombstone), or FULL carrying the low
//! seven bits of the entry's smeared hash; a FULL byte is the discriminant
//! that says the corresponding `MaybeUninit` cells are initialized.
//!
//! Probing is triangular over groups: from the starting group the probe
//! steps +1, +2, +3, ... (mod group count). With a power-of-two group count
//! the sequence visits every group exactly once, which is also why
//! deletion must tombstone instead of backward-shifting: entries may sit
//! arbitrarily far from their home group along that sequence.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};

use crate::hash::{self, GROUP_SIZE};
use crate::swar::{self, Matches, DELETED, EMPTY};
use crate::DefaultHashBuilder;

const DEFAULT_CAPACITY: usize = 16;
const DEFAULT_LOAD_FACTOR: f64 = 0.875;

/// A hash map for exactly one owner: no internal synchronization, mutation
/// through `&mut self` only.
///
/// Removals leave tombstones so later probes still reach entries placed
/// behind them; insertion reuses the first tombstone on its probe path. When
/// tombstones outnumber half the live entries the table is rebuilt at the
/// same capacity, so delete-heavy workloads never grow the table.
pub struct SwissMap<K, V, S = DefaultHashBuilder> {
    /// One packed control word per group.
    ctrl: Box<[u64]>,
    keys: Box<[MaybeUninit<K>]>,
    vals: Box<[MaybeUninit<V>]>,
    size: usize,
    tombstones: usize,
    max_load: usize,
    load_factor: f64,
    build_hasher: S,
}

fn alloc_ctrl(groups: usize) -> Box<[u64]> {
    vec![swar::broadcast(EMPTY); groups].into_boxed_slice()
}

fn alloc_cells<T>(len: usize) -> Box<[MaybeUninit<T>]> {
    (0..len).map(|_| MaybeUninit::uninit()).collect()
}

fn max_load(capacity: usize, load_factor: f64) -> usize {
    (capacity as f64 * load_factor) as usize
}

impl<K, V> SwissMap<K, V, DefaultHashBuilder> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a map sized for `capacity` entries, rounded up to a whole
    /// power-of-two number of 8-slot groups.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }

    /// # Panics
    ///
    /// Panics unless `load_factor` lies strictly between 0 and 1.
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f64) -> Self {
        Self::with_capacity_load_factor_and_hasher(
            capacity,
            load_factor,
            DefaultHashBuilder::default(),
        )
    }
}

impl<K, V, S> SwissMap<K, V, S> {
    pub fn with_hasher(build_hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, build_hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: S) -> Self {
        Self::with_capacity_load_factor_and_hasher(capacity, DEFAULT_LOAD_FACTOR, build_hasher)
    }

    /// # Panics
    ///
    /// Panics unless `load_factor` lies strictly between 0 and 1.
    pub fn with_capacity_load_factor_and_hasher(
        capacity: usize,
        load_factor: f64,
        build_hasher: S,
    ) -> Self {
        assert!(
            load_factor > 0.0 && load_factor < 1.0,
            "load factor must lie strictly between 0 and 1"
        );
        let groups = hash::groups_for(capacity);
        let slots = groups * GROUP_SIZE;
        Self {
            ctrl: alloc_ctrl(groups),
            keys: alloc_cells(slots),
            vals: alloc_cells(slots),
            size: 0,
            tombstones: 0,
            max_load: max_load(slots, load_factor),
            load_factor,
            build_hasher,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Total slot count; always a power of two and a multiple of 8.
    pub fn capacity(&self) -> usize {
        self.ctrl.len() * GROUP_SIZE
    }

    #[inline]
    fn group_mask(&self) -> usize {
        self.ctrl.len() - 1
    }

    #[inline]
    fn ctrl_byte(&self, idx: usize) -> u8 {
        swar::ctrl_byte(self.ctrl[idx / GROUP_SIZE], idx % GROUP_SIZE)
    }

    #[inline]
    fn set_ctrl(&mut self, idx: usize, byte: u8) {
        let shift = (idx % GROUP_SIZE) * 8;
        let word = &mut self.ctrl[idx / GROUP_SIZE];
        *word = (*word & !(0xFF << shift)) | (u64::from(byte) << shift);
    }

    /// Removes all entries, keeping the allocation and capacity.
    pub fn clear(&mut self) {
        self.drop_entries();
        for word in self.ctrl.iter_mut() {
            *word = swar::broadcast(EMPTY);
        }
        self.size = 0;
        self.tombstones = 0;
    }

    fn drop_entries(&mut self) {
        if !mem::needs_drop::<K>() && !mem::needs_drop::<V>() {
            return;
        }
        for idx in 0..self.capacity() {
            if swar::is_full(self.ctrl_byte(idx)) {
                // SAFETY: FULL control bytes are the discriminant for
                // initialized cells, and the caller resets them afterwards.
                unsafe {
                    self.keys[idx].assume_init_drop();
                    self.vals[idx].assume_init_drop();
                }
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            ctrl: &self.ctrl,
            keys: &self.keys,
            vals: &self.vals,
            idx: 0,
            remaining: self.size,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            ctrl: &self.ctrl,
            keys: &self.keys,
            vals: self.vals.as_mut_ptr(),
            idx: 0,
            remaining: self.size,
            _marker: PhantomData,
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K, V, S> SwissMap<K, V, S>
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

    /// Index of the FULL slot holding `key`. An EMPTY lane anywhere on the
    /// probe path proves absence; DELETED lanes do not, because the entry
    /// may have been placed past them.
    fn find_index<Q>(&self, hash: u32, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mask = self.group_mask();
        let tag = hash::h2(hash);
        let mut g = hash::h1(hash) as usize & mask;
        let mut step = 0;
        for _ in 0..=mask {
            let word = self.ctrl[g];
            let base = g * GROUP_SIZE;
            for lane in Matches(swar::eq_mask(word, tag)) {
                let idx = base + lane;
                // SAFETY: a fingerprint match means this control byte is
                // FULL, so the key cell is initialized.
                if unsafe { self.keys[idx].assume_init_ref() }.borrow() == key {
                    return Some(idx);
                }
            }
            if swar::empty_mask(word) != 0 {
                return None;
            }
            step += 1;
            g = (g + step) & mask;
        }
        None
    }

    /// Slot for a key known to be absent: the first tombstone seen on the
    /// probe path if there is one, otherwise the first EMPTY lane.
    fn find_insert_slot(&self, hash: u32) -> (usize, bool) {
        let mask = self.group_mask();
        let mut g = hash::h1(hash) as usize & mask;
        let mut step = 0;
        let mut reuse = None;
        for _ in 0..=mask {
            let word = self.ctrl[g];
            let base = g * GROUP_SIZE;
            if reuse.is_none() {
                let deleted = swar::eq_mask(word, DELETED);
                if deleted != 0 {
                    reuse = Some(base + deleted.trailing_zeros() as usize);
                }
            }
            let empty = swar::empty_mask(word);
            if empty != 0 {
                return match reuse {
                    Some(idx) => (idx, true),
                    None => (base + empty.trailing_zeros() as usize, false),
                };
            }
            step += 1;
            g = (g + step) & mask;
        }
        match reuse {
            Some(idx) => (idx, true),
            None => unreachable!("occupancy bound left no free slot"),
        }
    }

    /// Rebuilds the table at `groups` groups if the projected occupancy
    /// `size + tombstones + additional` would exceed the load bound: at the
    /// same capacity when clearing tombstones is enough, doubled otherwise.
    /// Tombstone pressure alone never grows the table.
    fn reserve_for(&mut self, additional: usize) {
        if self.size + self.tombstones + additional <= self.max_load {
            return;
        }
        let mut groups = self.ctrl.len();
        while self.size + additional > max_load(groups * GROUP_SIZE, self.load_factor) {
            groups *= 2;
        }
        self.rebuild(groups);
    }

    /// Rebuilds every live entry into fresh arrays of `groups` groups and
    /// resets the tombstone count. The target is pristine, so placement only
    /// needs the first EMPTY lane and no key comparisons.
    fn rebuild(&mut self, groups: usize) {
        let old_ctrl = mem::replace(&mut self.ctrl, alloc_ctrl(groups));
        let old_keys = mem::replace(&mut self.keys, alloc_cells(groups * GROUP_SIZE));
        let old_vals = mem::replace(&mut self.vals, alloc_cells(groups * GROUP_SIZE));
        self.tombstones = 0;
        self.max_load = max_load(groups * GROUP_SIZE, self.load_factor);
        for (g, &word) in old_ctrl.iter().enumerate() {
            for lane in Matches(swar::full_mask(word)) {
                let idx = g * GROUP_SIZE + lane;
                // SAFETY: FULL slots of the retired arrays are initialized
                // and are moved out exactly once; the retired arrays are
                // dropped as uninitialized storage.
                let (key, value) =
                    unsafe { (old_keys[idx].assume_init_read(), old_vals[idx].assume_init_read()) };
                let hash = self.hash_of(&key);
                let (slot, _) = self.find_insert_slot(hash);
                self.set_ctrl(slot, hash::h2(hash));
                self.keys[slot] = MaybeUninit::new(key);
                self.vals[slot] = MaybeUninit::new(value);
            }
        }
    }

    /// Writes a key known to be absent into a claimed slot. Occupancy must
    /// already be reserved.
    fn insert_unique(&mut self, hash: u32, key: K, value: V) -> usize {
        let (idx, reused) = self.find_insert_slot(hash);
        self.set_ctrl(idx, hash::h2(hash));
        self.keys[idx] = MaybeUninit::new(key);
        self.vals[idx] = MaybeUninit::new(value);
        self.size += 1;
        if reused {
            self.tombstones -= 1;
        }
        idx
    }

    /// Tombstones a FULL slot and moves its entry out.
    fn take_slot(&mut self, idx: usize) -> (K, V) {
        self.set_ctrl(idx, DELETED);
        self.size -= 1;
        self.tombstones += 1;
        // SAFETY: the slot was FULL; the DELETED byte now marks the cells
        // dead, so they are neither read nor dropped again.
        unsafe {
            (
                self.keys[idx].assume_init_read(),
                self.vals[idx].assume_init_read(),
            )
        }
    }

    /// Same-capacity rebuild once tombstones dominate the live entries.
    fn maybe_cleanup(&mut self) {
        if self.tombstones > self.size / 2 {
            self.rebuild(self.ctrl.len());
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.find_index(self.hash_of(key), key)?;
        // SAFETY: `find_index` only returns FULL slots.
        Some(unsafe { self.vals[idx].assume_init_ref() })
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.find_index(self.hash_of(key), key)?;
        // SAFETY: `find_index` only returns FULL slots.
        Some(unsafe { self.vals[idx].assume_init_mut() })
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.find_index(self.hash_of(key), key)?;
        // SAFETY: `find_index` only returns FULL slots.
        unsafe { Some((self.keys[idx].assume_init_ref(), self.vals[idx].assume_init_ref())) }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_index(self.hash_of(key), key).is_some()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Inserts the pair, returning the value it displaced.
    ///
    /// The occupancy check runs before the probe, so a put can grow the
    /// table even when it ends up overwriting an existing entry.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.reserve_for(1);
        let hash = self.hash_of(&key);
        if let Some(idx) = self.find_index(hash, &key) {
            // SAFETY: `find_index` only returns FULL slots.
            return Some(mem::replace(
                unsafe { self.vals[idx].assume_init_mut() },
                value,
            ));
        }
        self.insert_unique(hash, key, value);
        None
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.find_index(self.hash_of(key), key)?;
        let entry = self.take_slot(idx);
        self.maybe_cleanup();
        Some(entry)
    }

    /// Removal that leaves no tombstone behind: the entry is taken out and
    /// the table immediately rebuilt at its current capacity, clearing every
    /// tombstone. Useful when predictable probe lengths matter more than the
    /// cost of the rebuild.
    pub fn remove_without_tombstone<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.find_index(self.hash_of(key), key)?;
        let (_, value) = self.take_slot(idx);
        self.rebuild(self.ctrl.len());
        Some(value)
    }

    /// Keeps only the entries for which `f` returns true. Removals are
    /// tombstoned during the scan; any cleanup rebuild is deferred until the
    /// scan is done so slot order stays stable under the caller's feet.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        for idx in 0..self.capacity() {
            if !swar::is_full(self.ctrl_byte(idx)) {
                continue;
            }
            // SAFETY: FULL slot, disjoint key/value borrows.
            let keep = {
                let key = unsafe { self.keys[idx].assume_init_ref() };
                let value = unsafe { self.vals[idx].assume_init_mut() };
                f(key, value)
            };
            if !keep {
                let _ = self.take_slot(idx);
            }
        }
        self.maybe_cleanup();
    }

    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        let hash = self.hash_of(&key);
        match self.find_index(hash, &key) {
            // The caller's duplicate key is dropped; the slot keeps its own.
            Some(idx) => Entry::Occupied(OccupiedEntry { map: self, idx }),
            None => Entry::Vacant(VacantEntry {
                map: self,
                hash,
                key,
            }),
        }
    }
}

impl<K, V, S> Drop for SwissMap<K, V, S> {
    fn drop(&mut self) {
        self.drop_entries();
    }
}

impl<K, V, S: Default> Default for SwissMap<K, V, S> {
    fn default() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, S::default())
    }
}

impl<K, V, S> fmt::Debug for SwissMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for SwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Batch insertion reserves with the projection
    /// `size + tombstones + max(0, batch - tombstones)`, so a batch that can
    /// reuse tombstones does not force a needless rebuild.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let batch = iter.size_hint().0;
        self.reserve_for(batch.saturating_sub(self.tombstones));
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for SwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity_and_hasher(iter.size_hint().0, S::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a SwissMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// A view into a single slot of a [`SwissMap`], the map's rendition of the
/// compute-style conditional operations.
pub enum Entry<'a, K, V, S = DefaultHashBuilder> {
    Occupied(OccupiedEntry<'a, K, V, S>),
    Vacant(VacantEntry<'a, K, V, S>),
}

pub struct OccupiedEntry<'a, K, V, S = DefaultHashBuilder> {
    map: &'a mut SwissMap<K, V, S>,
    idx: usize,
}

pub struct VacantEntry<'a, K, V, S = DefaultHashBuilder> {
    map: &'a mut SwissMap<K, V, S>,
    hash: u32,
    key: K,
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn or_insert(self, default: V) -> &'a mut V {
        self.or_insert_with(|| default)
    }

    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }

    pub fn and_modify<F: FnOnce(&mut V)>(mut self, f: F) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }

    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        // SAFETY: the entry holds a FULL slot for the map's lifetime borrow.
        unsafe { self.map.keys[self.idx].assume_init_ref() }
    }

    pub fn get(&self) -> &V {
        // SAFETY: as above.
        unsafe { self.map.vals[self.idx].assume_init_ref() }
    }

    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: as above.
        unsafe { self.map.vals[self.idx].assume_init_mut() }
    }

    pub fn into_mut(self) -> &'a mut V {
        let OccupiedEntry { map, idx } = self;
        // SAFETY: as above.
        unsafe { map.vals[idx].assume_init_mut() }
    }

    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    pub fn remove_entry(self) -> (K, V) {
        let OccupiedEntry { map, idx } = self;
        let entry = map.take_slot(idx);
        map.maybe_cleanup();
        entry
    }
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_key(self) -> K {
        self.key
    }

    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, hash, key } = self;
        map.reserve_for(1);
        let idx = map.insert_unique(hash, key, value);
        // SAFETY: `insert_unique` made the slot FULL.
        unsafe { map.vals[idx].assume_init_mut() }
    }
}

/// Iterator over `(&K, &V)` in slot order, skipping EMPTY and DELETED slots.
pub struct Iter<'a, K, V> {
    ctrl: &'a [u64],
    keys: &'a [MaybeUninit<K>],
    vals: &'a [MaybeUninit<V>],
    idx: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < self.keys.len() {
            let i = self.idx;
            self.idx += 1;
            if swar::is_full(swar::ctrl_byte(self.ctrl[i / GROUP_SIZE], i % GROUP_SIZE)) {
                self.remaining -= 1;
                // SAFETY: FULL slots are initialized; the map is borrowed
                // shared for 'a so no mutation can invalidate them.
                return Some(unsafe {
                    (self.keys[i].assume_init_ref(), self.vals[i].assume_init_ref())
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` in slot order.
pub struct IterMut<'a, K, V> {
    ctrl: &'a [u64],
    keys: &'a [MaybeUninit<K>],
    vals: *mut MaybeUninit<V>,
    idx: usize,
    remaining: usize,
    _marker: PhantomData<&'a mut V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < self.keys.len() {
            let i = self.idx;
            self.idx += 1;
            if swar::is_full(swar::ctrl_byte(self.ctrl[i / GROUP_SIZE], i % GROUP_SIZE)) {
                self.remaining -= 1;
                // SAFETY: FULL slots are initialized, each index is visited
                // once, and the map is borrowed exclusively for 'a.
                unsafe {
                    let value = (*self.vals.add(i)).assume_init_mut();
                    return Some((self.keys[i].assume_init_ref(), value));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
