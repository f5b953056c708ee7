//! Slot arrays and per-slot protocols of the lock-free engine.

use std::sync::atomic::{self, AtomicU64, Ordering};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

use crate::hash::{self, GROUP_SIZE};
use crate::swar::{self, Matches, EMPTY};

/// Key-cell tag: the slot has been (or is being) copied out by a resize.
const MOVED_TAG: usize = 0b001;
/// Value-cell tag: the entry is logically absent.
const TOMBSTONE_TAG: usize = 0b001;
/// Value-cell tag: the value is boxed for copy-out; writers and readers must
/// restart. Combined with [`TOMBSTONE_TAG`] it seals a drained slot.
const PRIME_TAG: usize = 0b010;
/// Forward-pointer tag: a resize winner claimed the table and is allocating
/// the successor.
const CLAIMED_TAG: usize = 0b001;

/// Heap cell for a key or value. The alignment keeps the low pointer bits
/// free for the tags above regardless of `T`'s own alignment.
#[repr(align(8))]
pub(crate) struct CellBox<T>(pub(crate) T);

#[inline]
fn is_moved<T>(p: Shared<'_, CellBox<T>>) -> bool {
    p.tag() & MOVED_TAG != 0
}

#[inline]
fn is_prime<T>(p: Shared<'_, CellBox<T>>) -> bool {
    p.tag() & PRIME_TAG != 0
}

#[inline]
pub(crate) fn is_tombstone<T>(p: Shared<'_, CellBox<T>>) -> bool {
    p.tag() & TOMBSTONE_TAG != 0
}

#[inline]
fn moved<'g, T>() -> Shared<'g, CellBox<T>> {
    Shared::null().with_tag(MOVED_TAG)
}

#[inline]
fn tombstone<'g, T>() -> Shared<'g, CellBox<T>> {
    Shared::null().with_tag(TOMBSTONE_TAG)
}

#[inline]
fn tombstone_prime<'g, T>() -> Shared<'g, CellBox<T>> {
    Shared::null().with_tag(TOMBSTONE_TAG | PRIME_TAG)
}

/// Defers dropping a detached cell or table until no pinned thread can still
/// hold a reference to it.
///
/// # Safety
///
/// `ptr` must have been detached from every cell, so this thread is its sole
/// owner, and it must not be dereferenced afterwards.
pub(crate) unsafe fn defer_acquire_destroy<'g, T>(guard: &'g Guard, ptr: Shared<'g, T>) {
    debug_assert!(!ptr.with_tag(0).is_null());
    guard.defer_unchecked(move || {
        atomic::fence(Ordering::Acquire);
        drop(ptr.with_tag(0).into_owned());
    });
}

/// Outcome of a read probe.
pub(crate) enum ReadOutcome<'g, K, V> {
    /// The stored key and the live value pointer, untagged and non-null.
    Present(&'g K, Shared<'g, CellBox<V>>),
    Absent,
    /// A frozen or boxed slot was met; restart on the current table.
    Retry,
}

/// Value-cell precondition for conditional writes.
pub(crate) enum Expected<'e, V> {
    /// A live value must be present.
    Present,
    /// A live value must be present and satisfy the predicate.
    Satisfies(&'e mut dyn FnMut(&V) -> bool),
}

/// Outcome of an update or removal probe.
pub(crate) enum WriteOutcome<'g, V> {
    /// The CAS landed; the displaced live value cell.
    Applied(Shared<'g, CellBox<V>>),
    /// The precondition failed; the observed cell (null-ish when absent).
    Unchanged(Shared<'g, CellBox<V>>),
    Retry,
    NeedResize,
}

/// Owned key/value boxes threaded through insertion attempts, so a failed
/// CAS or a table swap does not re-allocate them.
pub(crate) struct InsertState<K, V> {
    pub(crate) key: Owned<CellBox<K>>,
    pub(crate) val: Owned<CellBox<V>>,
}

impl<K, V> InsertState<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key: Owned::new(CellBox(key)),
            val: Owned::new(CellBox(value)),
        }
    }
}

/// Outcome of an insertion attempt.
pub(crate) enum InsertOutcome<'g, K, V> {
    /// The write landed. The displaced value cell is null for a fresh slot,
    /// a tombstone for a revived one, and a live pointer for an overwrite.
    Applied(Shared<'g, CellBox<V>>),
    /// Insert-if-absent found a live value; the state comes back untouched.
    Unchanged(Shared<'g, CellBox<V>>, InsertState<K, V>),
    Retry(InsertState<K, V>),
    /// No EMPTY lane in any group; the table must grow.
    NeedResize(InsertState<K, V>),
}

/// One immutable-layout table generation: packed control words plus parallel
/// atomic key/value cells, and the forward pointer used by the resize
/// protocol.
pub(crate) struct Table<K, V> {
    ctrl: Box<[AtomicU64]>,
    keys: Box<[Atomic<CellBox<K>>]>,
    vals: Box<[Atomic<CellBox<V>>]>,
    next: Atomic<Table<K, V>>,
}

impl<K, V> Table<K, V> {
    pub(crate) fn with_groups(groups: usize) -> Self {
        assert!(groups.is_power_of_two());
        let slots = groups * GROUP_SIZE;
        Self {
            ctrl: (0..groups)
                .map(|_| AtomicU64::new(swar::broadcast(EMPTY)))
                .collect(),
            keys: (0..slots).map(|_| Atomic::null()).collect(),
            vals: (0..slots).map(|_| Atomic::null()).collect(),
            next: Atomic::null(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn groups(&self) -> usize {
        self.ctrl.len()
    }

    #[inline]
    fn group_mask(&self) -> usize {
        self.ctrl.len() - 1
    }

    #[inline]
    fn ctrl_word(&self, group: usize) -> u64 {
        self.ctrl[group].load(Ordering::Acquire)
    }

    /// CAS one control byte inside its packed group word, tolerating
    /// concurrent changes to the other lanes.
    fn cas_ctrl(&self, idx: usize, expected: u8, update: u8) -> bool {
        let shift = (idx % GROUP_SIZE) * 8;
        let mask = 0xFFu64 << shift;
        let word = &self.ctrl[idx / GROUP_SIZE];
        let mut cur = word.load(Ordering::Acquire);
        loop {
            if (cur >> shift) as u8 != expected {
                return false;
            }
            let new = (cur & !mask) | (u64::from(update) << shift);
            match word.compare_exchange_weak(cur, new, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(changed) => cur = changed,
            }
        }
    }

    /// True from the moment a resize winner claims this table until the
    /// map's root stops pointing at it.
    pub(crate) fn is_resizing(&self, guard: &Guard) -> bool {
        let next = self.next.load(Ordering::Acquire, guard);
        !next.is_null() || next.tag() != 0
    }

    /// Walks live entries in slot order, applying `f`; stops early when `f`
    /// returns true. Prime values are unboxed: a boxed value is still the
    /// current one while its slot is being drained. Returns `None` when a
    /// frozen key is met, in which case the caller restarts on the current
    /// table.
    pub(crate) fn scan<F>(&self, guard: &Guard, mut f: F) -> Option<bool>
    where
        F: FnMut(&K, &V) -> bool,
    {
        for g in 0..self.groups() {
            let word = self.ctrl_word(g);
            let base = g * GROUP_SIZE;
            for lane in Matches(swar::full_mask(word)) {
                let idx = base + lane;
                let key = self.keys[idx].load(Ordering::Acquire, guard);
                if is_moved(key) {
                    return None;
                }
                // SAFETY: a FULL control byte is published after the key
                // cell, and the guard keeps the allocation alive.
                let key_cell = match unsafe { key.as_ref() } {
                    Some(cell) => cell,
                    None => return None,
                };
                let val = self.vals[idx].load(Ordering::Acquire, guard);
                if is_tombstone(val) {
                    continue;
                }
                // SAFETY: `as_ref` strips the Prime tag; null means the
                // entry is gone.
                let val_cell = match unsafe { val.as_ref() } {
                    Some(cell) => cell,
                    None => continue,
                };
                if f(&key_cell.0, &val_cell.0) {
                    return Some(true);
                }
            }
        }
        Some(false)
    }

    /// Tombstones every live value, best-effort under contention, and
    /// returns how many entries were killed. Control bytes stay FULL.
    pub(crate) fn clear(&self, guard: &Guard) -> usize {
        let mut cleared = 0;
        for g in 0..self.groups() {
            let word = self.ctrl_word(g);
            let base = g * GROUP_SIZE;
            for lane in Matches(swar::full_mask(word)) {
                let idx = base + lane;
                let val = self.vals[idx].load(Ordering::Acquire, guard);
                if is_prime(val) || is_tombstone(val) || val.is_null() {
                    continue;
                }
                if self.vals[idx]
                    .compare_exchange(val, tombstone(), Ordering::AcqRel, Ordering::Acquire, guard)
                    .is_ok()
                {
                    // SAFETY: the CAS detached the sole reference.
                    unsafe { defer_acquire_destroy(guard, val) };
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Drops every allocation still owned by this table's cells. The caller
    /// must have exclusive access (drop path).
    pub(crate) fn release_cells(&self, guard: &Guard) {
        for idx in 0..self.capacity() {
            let key = self.keys[idx].load(Ordering::Relaxed, guard);
            if !key.with_tag(0).is_null() {
                // SAFETY: exclusive access; each cell is drained once.
                drop(unsafe { key.with_tag(0).into_owned() });
            }
            let val = self.vals[idx].load(Ordering::Relaxed, guard);
            if !val.with_tag(0).is_null() {
                // SAFETY: as above.
                drop(unsafe { val.with_tag(0).into_owned() });
            }
        }
    }
}

impl<'g, K, V> Table<K, V>
where
    K: 'g + Eq,
    V: 'g,
{
    /// Read probe. Terminates at the first group with an EMPTY lane; a full
    /// sweep of every group without one also proves absence.
    pub(crate) fn find(
        &self,
        guard: &'g Guard,
        hash: u32,
        mut eq: impl FnMut(&K) -> bool,
    ) -> ReadOutcome<'g, K, V> {
        let mask = self.group_mask();
        let tag = hash::h2(hash);
        let mut g = hash::h1(hash) as usize & mask;
        let mut step = 0;
        for _ in 0..=mask {
            let word = self.ctrl_word(g);
            let base = g * GROUP_SIZE;
            for lane in Matches(swar::eq_mask(word, tag)) {
                let idx = base + lane;
                let key = self.keys[idx].load(Ordering::Acquire, guard);
                if is_moved(key) {
                    return ReadOutcome::Retry;
                }
                // SAFETY: a FULL control byte is published after the key
                // cell, and the guard keeps the allocation alive.
                let key_cell = match unsafe { key.as_ref() } {
                    Some(cell) => cell,
                    None => continue,
                };
                if !eq(&key_cell.0) {
                    continue;
                }
                let val = self.vals[idx].load(Ordering::Acquire, guard);
                if is_prime(val) {
                    return ReadOutcome::Retry;
                }
                if is_tombstone(val) || val.is_null() {
                    return ReadOutcome::Absent;
                }
                return ReadOutcome::Present(&key_cell.0, val);
            }
            if swar::empty_mask(word) != 0 {
                return ReadOutcome::Absent;
            }
            step += 1;
            g = (g + step) & mask;
        }
        ReadOutcome::Absent
    }

    /// Conditional update or removal of an existing entry; never claims a
    /// slot. `new_val` of `None` writes a TOMBSTONE.
    pub(crate) fn update(
        &self,
        guard: &'g Guard,
        hash: u32,
        mut eq: impl FnMut(&K) -> bool,
        new_val: &mut Option<Owned<CellBox<V>>>,
        expected: &mut Expected<'_, V>,
    ) -> WriteOutcome<'g, V> {
        if self.is_resizing(guard) {
            return WriteOutcome::Retry;
        }
        let mask = self.group_mask();
        let tag = hash::h2(hash);
        let mut g = hash::h1(hash) as usize & mask;
        let mut step = 0;
        for _ in 0..=mask {
            let word = self.ctrl_word(g);
            let base = g * GROUP_SIZE;
            for lane in Matches(swar::eq_mask(word, tag)) {
                let idx = base + lane;
                let key = self.keys[idx].load(Ordering::Acquire, guard);
                if is_moved(key) {
                    return WriteOutcome::Retry;
                }
                // SAFETY: as in `find`.
                let key_cell = match unsafe { key.as_ref() } {
                    Some(cell) => cell,
                    None => continue,
                };
                if !eq(&key_cell.0) {
                    continue;
                }
                let cur = self.vals[idx].load(Ordering::Acquire, guard);
                if is_prime(cur) {
                    return WriteOutcome::Retry;
                }
                if is_tombstone(cur) || cur.is_null() {
                    // Logically absent; conditional writes need a live value.
                    return WriteOutcome::Unchanged(cur);
                }
                if let Expected::Satisfies(pred) = expected {
                    // SAFETY: `cur` is a live untagged pointer under `guard`.
                    if !pred(&unsafe { cur.deref() }.0) {
                        return WriteOutcome::Unchanged(cur);
                    }
                }
                if self.is_resizing(guard) {
                    return WriteOutcome::Retry;
                }
                return match new_val.take() {
                    Some(owned) => match self.vals[idx].compare_exchange(
                        cur,
                        owned,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        guard,
                    ) {
                        Ok(_) => WriteOutcome::Applied(cur),
                        Err(e) => {
                            *new_val = Some(e.new);
                            WriteOutcome::Retry
                        }
                    },
                    None => match self.vals[idx].compare_exchange(
                        cur,
                        tombstone(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        guard,
                    ) {
                        Ok(_) => WriteOutcome::Applied(cur),
                        Err(_) => WriteOutcome::Retry,
                    },
                };
            }
            if swar::empty_mask(word) != 0 {
                return WriteOutcome::Unchanged(Shared::null());
            }
            step += 1;
            g = (g + step) & mask;
        }
        WriteOutcome::NeedResize
    }

    /// Unconditional or if-absent insertion. May overwrite a live value,
    /// revive a tombstoned slot for the same key, or claim an EMPTY lane
    /// with the publication triple.
    pub(crate) fn insert(
        &self,
        guard: &'g Guard,
        hash: u32,
        mut state: InsertState<K, V>,
        only_if_absent: bool,
    ) -> InsertOutcome<'g, K, V> {
        if self.is_resizing(guard) {
            return InsertOutcome::Retry(state);
        }
        let mask = self.group_mask();
        let tag = hash::h2(hash);
        let mut g = hash::h1(hash) as usize & mask;
        let mut step = 0;
        for _ in 0..=mask {
            let word = self.ctrl_word(g);
            let base = g * GROUP_SIZE;
            for lane in Matches(swar::eq_mask(word, tag)) {
                let idx = base + lane;
                let key = self.keys[idx].load(Ordering::Acquire, guard);
                if is_moved(key) {
                    return InsertOutcome::Retry(state);
                }
                // SAFETY: as in `find`.
                let key_cell = match unsafe { key.as_ref() } {
                    Some(cell) => cell,
                    None => continue,
                };
                if key_cell.0 != state.key.0 {
                    continue;
                }
                let cur = self.vals[idx].load(Ordering::Acquire, guard);
                if is_prime(cur) {
                    return InsertOutcome::Retry(state);
                }
                if cur.is_null() && !is_tombstone(cur) {
                    // A tombstone is also a tagged null; only a genuinely
                    // unset cell (a publication whose value CAS has not
                    // landed yet) retries here. Tombstones fall through to
                    // the revival CAS.
                    return InsertOutcome::Retry(state);
                }
                if !is_tombstone(cur) && only_if_absent {
                    return InsertOutcome::Unchanged(cur, state);
                }
                // Overwrite the live value, or revive the slot: a slot's key
                // never changes once set, so the duplicate key box is
                // discarded either way.
                if self.is_resizing(guard) {
                    return InsertOutcome::Retry(state);
                }
                let InsertState { key, val } = state;
                return match self.vals[idx].compare_exchange(
                    cur,
                    val,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                ) {
                    Ok(_) => {
                        drop(key);
                        InsertOutcome::Applied(cur)
                    }
                    Err(e) => InsertOutcome::Retry(InsertState { key, val: e.new }),
                };
            }
            let empty = swar::empty_mask(word);
            if empty != 0 {
                let idx = base + empty.trailing_zeros() as usize;
                if self.is_resizing(guard) {
                    return InsertOutcome::Retry(state);
                }
                let InsertState { key, val } = state;
                // Publication triple. Once the key lands the sequence runs
                // to completion; a resize that catches the slot half-way
                // waits for the value and copies the finished entry out.
                if let Err(e) = self.keys[idx].compare_exchange(
                    Shared::null(),
                    key,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                ) {
                    return InsertOutcome::Retry(InsertState { key: e.new, val });
                }
                match self.vals[idx].compare_exchange(
                    Shared::null(),
                    val,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                ) {
                    Ok(_) => {}
                    Err(_) => unreachable!("value cell of a freshly claimed slot was written"),
                }
                let published = self.cas_ctrl(idx, EMPTY, tag);
                assert!(published, "control byte of a freshly claimed slot changed");
                return InsertOutcome::Applied(Shared::null());
            }
            step += 1;
            g = (g + step) & mask;
        }
        InsertOutcome::NeedResize(state)
    }
}

impl<'g, K, V> Table<K, V>
where
    K: 'g + std::hash::Hash + Eq,
    V: 'g,
{
    /// Claims and performs a resize of this table, returning the successor
    /// when this thread did the copy. `None` means another thread holds the
    /// claim; the caller spins on the map root instead.
    pub(crate) fn resize<S>(
        &self,
        guard: &'g Guard,
        build_hasher: &S,
    ) -> Option<Shared<'g, Table<K, V>>>
    where
        S: std::hash::BuildHasher,
    {
        if self
            .next
            .compare_exchange(
                Shared::null(),
                Shared::null().with_tag(CLAIMED_TAG),
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            )
            .is_err()
        {
            return None;
        }
        let successor = Owned::new(Table::with_groups(self.groups() * 2));
        let next = match self.next.compare_exchange(
            Shared::null().with_tag(CLAIMED_TAG),
            successor,
            Ordering::AcqRel,
            Ordering::Acquire,
            guard,
        ) {
            Ok(next) => next,
            Err(_) => unreachable!("resize claim is exclusive"),
        };
        // SAFETY: just stored, non-null.
        let next_ref = unsafe { next.deref() };
        for idx in 0..self.capacity() {
            self.copy_slot(guard, next_ref, build_hasher, idx);
        }
        Some(next)
    }

    /// Drains one slot into the successor: freeze the key, box the value,
    /// install, seal. Every path leaves the value cell as tombstone-Prime so
    /// no late write can land in the drained table.
    fn copy_slot<S>(&self, guard: &'g Guard, next: &Table<K, V>, build_hasher: &S, idx: usize)
    where
        S: std::hash::BuildHasher,
    {
        // 1) Freeze the key cell.
        let frozen_key;
        loop {
            let key = self.keys[idx].load(Ordering::Acquire, guard);
            if is_moved(key) {
                return;
            }
            match self.keys[idx].compare_exchange(
                key,
                moved(),
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            ) {
                Ok(_) => {
                    frozen_key = key;
                    break;
                }
                Err(_) => continue,
            }
        }

        // 2) Settle the value cell.
        let moved_val;
        loop {
            let val = self.vals[idx].load(Ordering::Acquire, guard);
            if is_prime(val) {
                unreachable!("value boxed before its slot was copied");
            }
            if is_tombstone(val) {
                match self.vals[idx].compare_exchange(
                    val,
                    tombstone_prime(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    guard,
                ) {
                    Ok(_) => {
                        // Dead entry; the frozen key is the last reference.
                        if !frozen_key.is_null() {
                            // SAFETY: detached by the freeze CAS.
                            unsafe { defer_acquire_destroy(guard, frozen_key) };
                        }
                        return;
                    }
                    Err(_) => continue,
                }
            }
            if val.is_null() {
                if frozen_key.is_null() {
                    // Untouched slot: seal it against late publications.
                    match self.vals[idx].compare_exchange(
                        val,
                        tombstone_prime(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                        guard,
                    ) {
                        Ok(_) => return,
                        Err(_) => continue,
                    }
                }
                // A publication is in flight; its value CAS is next.
                std::hint::spin_loop();
                continue;
            }
            // Live value: box it so writers restart while it moves.
            match self.vals[idx].compare_exchange(
                val,
                val.with_tag(PRIME_TAG),
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            ) {
                Ok(_) => {
                    moved_val = val;
                    break;
                }
                Err(_) => continue,
            }
        }

        assert!(!frozen_key.is_null(), "live value in a slot with no key");

        // 3) Install into the successor, transferring both allocations.
        // SAFETY: the freeze and boxing CASes made this thread the sole
        // owner of both pointers.
        let key_box = unsafe { frozen_key.into_owned() };
        let val_box = unsafe { moved_val.into_owned() };
        let hash = hash::smeared_hash(build_hasher, &key_box.0);
        match next.insert(guard, hash, InsertState { key: key_box, val: val_box }, true) {
            InsertOutcome::Applied(prior) => {
                assert!(prior.is_null(), "copy collided in a pristine successor");
            }
            _ => unreachable!("copy into a pristine successor cannot conflict"),
        }

        // 4) Seal the old cell; after boxing no other thread writes it.
        match self.vals[idx].compare_exchange(
            moved_val.with_tag(PRIME_TAG),
            tombstone_prime(),
            Ordering::AcqRel,
            Ordering::Acquire,
            guard,
        ) {
            Ok(_) => {}
            Err(_) => unreachable!("boxed value cell changed during copy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::smeared_hash;
    use std::collections::hash_map::RandomState;

    fn put<'g>(
        table: &Table<&'static str, u32>,
        guard: &'g Guard,
        hasher: &RandomState,
        key: &'static str,
        value: u32,
    ) -> InsertOutcome<'g, &'static str, u32> {
        let hash = smeared_hash(hasher, key);
        table.insert(guard, hash, InsertState::new(key, value), false)
    }

    fn read(
        table: &Table<&'static str, u32>,
        guard: &Guard,
        hasher: &RandomState,
        key: &'static str,
    ) -> Option<u32> {
        let hash = smeared_hash(hasher, key);
        match table.find(guard, hash, |k| *k == key) {
            ReadOutcome::Present(k, val) => {
                assert_eq!(*k, key);
                Some(unsafe { val.deref() }.0)
            }
            ReadOutcome::Absent => None,
            ReadOutcome::Retry => panic!("no resize can be running here"),
        }
    }

    #[test]
    fn insert_find_update_remove() {
        let hasher = RandomState::new();
        let table: Table<&'static str, u32> = Table::with_groups(2);
        let guard = unsafe { crossbeam_epoch::unprotected() };

        assert_eq!(read(&table, guard, &hasher, "foo"), None);
        assert!(matches!(
            put(&table, guard, &hasher, "foo", 5),
            InsertOutcome::Applied(prior) if prior.is_null()
        ));
        assert_eq!(read(&table, guard, &hasher, "foo"), Some(5));

        // Overwrite returns the displaced live pointer.
        match put(&table, guard, &hasher, "foo", 6) {
            InsertOutcome::Applied(prior) => {
                assert_eq!(unsafe { prior.deref() }.0, 5);
                unsafe { defer_acquire_destroy(guard, prior) };
            }
            _ => panic!("overwrite should apply"),
        }
        assert_eq!(read(&table, guard, &hasher, "foo"), Some(6));

        // Delete tombstones the value cell.
        let hash = smeared_hash(&hasher, "foo");
        match table.update(guard, hash, |k| *k == "foo", &mut None, &mut Expected::Present) {
            WriteOutcome::Applied(prior) => {
                assert_eq!(unsafe { prior.deref() }.0, 6);
                unsafe { defer_acquire_destroy(guard, prior) };
            }
            _ => panic!("delete should apply"),
        }
        assert_eq!(read(&table, guard, &hasher, "foo"), None);

        // Reinserting the same key revives its original slot.
        assert!(matches!(
            put(&table, guard, &hasher, "foo", 7),
            InsertOutcome::Applied(prior) if is_tombstone(prior)
        ));
        assert_eq!(read(&table, guard, &hasher, "foo"), Some(7));

        table.release_cells(guard);
    }

    #[test]
    fn conditional_update_respects_predicate() {
        let hasher = RandomState::new();
        let table: Table<&'static str, u32> = Table::with_groups(2);
        let guard = unsafe { crossbeam_epoch::unprotected() };

        assert!(matches!(
            put(&table, guard, &hasher, "k", 1),
            InsertOutcome::Applied(_)
        ));
        let hash = smeared_hash(&hasher, "k");

        let mut wrong = |v: &u32| *v == 9;
        assert!(matches!(
            table.update(
                guard,
                hash,
                |k| *k == "k",
                &mut Some(Owned::new(CellBox(2))),
                &mut Expected::Satisfies(&mut wrong),
            ),
            WriteOutcome::Unchanged(_)
        ));
        assert_eq!(read(&table, guard, &hasher, "k"), Some(1));

        let mut right = |v: &u32| *v == 1;
        match table.update(
            guard,
            hash,
            |k| *k == "k",
            &mut Some(Owned::new(CellBox(2))),
            &mut Expected::Satisfies(&mut right),
        ) {
            WriteOutcome::Applied(prior) => unsafe { defer_acquire_destroy(guard, prior) },
            _ => panic!("matching predicate should apply"),
        }
        assert_eq!(read(&table, guard, &hasher, "k"), Some(2));

        table.release_cells(guard);
    }

    #[test]
    fn exhausted_table_asks_for_resize() {
        let hasher = RandomState::new();
        let table: Table<u32, u32> = Table::with_groups(1);
        let guard = unsafe { crossbeam_epoch::unprotected() };

        let mut inserted = 0u32;
        let mut k = 0u32;
        while inserted < 8 {
            let hash = smeared_hash(&hasher, &k);
            match table.insert(guard, hash, InsertState::new(k, k), false) {
                InsertOutcome::Applied(_) => inserted += 1,
                InsertOutcome::NeedResize(_) => panic!("table filled early"),
                _ => panic!("unexpected outcome"),
            }
            k += 1;
        }
        let hash = smeared_hash(&hasher, &k);
        assert!(matches!(
            table.insert(guard, hash, InsertState::new(k, k), false),
            InsertOutcome::NeedResize(_)
        ));
        // A full table with no EMPTY lane still answers reads.
        assert!(matches!(
            table.find(guard, hash, |key| *key == k),
            ReadOutcome::Absent
        ));
        table.release_cells(guard);
    }
}
