use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use hashsmith::LockFreeSwissMap;

const NUM_THREADS: usize = 8;

#[test]
fn single_thread_contract() {
    let m = LockFreeSwissMap::new();
    assert!(m.is_empty());
    assert_eq!(m.insert("a", 1), None);
    assert_eq!(m.insert("a", 2), Some(1));
    assert_eq!(m.insert_if_absent("a", 3), Some(2));
    assert_eq!(m.insert_if_absent("b", 4), None);
    assert_eq!(m.len(), 2);

    assert_eq!(m.get("a"), Some(2));
    assert!(m.contains_key("b"));
    assert!(!m.contains_key("c"));
    assert!(m.contains_value(&4));
    assert!(!m.contains_value(&9));

    assert_eq!(m.replace("a", 5), Some(2));
    assert_eq!(m.replace("missing", 1), None);
    assert!(m.compare_and_replace("a", &5, 6));
    assert!(!m.compare_and_replace("a", &5, 7));
    assert_eq!(m.get("a"), Some(6));

    assert!(!m.remove_if_eq("a", &1));
    assert!(m.remove_if_eq("a", &6));
    assert_eq!(m.get("a"), None);
    assert_eq!(m.remove("b"), Some(4));
    assert_eq!(m.remove("b"), None);
    assert_eq!(m.len(), 0);
}

#[test]
fn removed_key_revives_in_place() {
    let m = LockFreeSwissMap::with_capacity(16);
    let cap = m.capacity();
    for round in 0..100u32 {
        assert_eq!(m.insert(1u32, round), None);
        assert_eq!(m.remove(&1), Some(round));
    }
    // Deletion is a value tombstone; churn on one key cannot consume slots.
    assert_eq!(m.capacity(), cap);
    assert_eq!(m.len(), 0);
}

#[test]
fn compute_family() {
    let m: LockFreeSwissMap<&str, u32> = LockFreeSwissMap::new();

    assert_eq!(m.get_or_insert_with("k", || 10), 10);
    assert_eq!(m.get_or_insert_with("k", || 99), 10);

    assert_eq!(m.compute_if_present("k", |v| Some(v + 1)), Some(11));
    assert_eq!(m.compute_if_present("gone", |v| Some(v + 1)), None);
    assert_eq!(m.compute_if_present("k", |_| None), None);
    assert_eq!(m.get("k"), None);

    assert_eq!(m.compute("n", |v| Some(v.copied().unwrap_or(0) + 5)), Some(5));
    assert_eq!(m.compute("n", |v| Some(v.copied().unwrap_or(0) + 5)), Some(10));
    assert_eq!(m.compute("n", |_| None), None);
    assert!(!m.contains_key("n"));
}

#[test]
fn snapshot_iteration() {
    let m = LockFreeSwissMap::new();
    for i in 0..100u32 {
        m.insert(i, i * 2);
    }
    let mut entries: Vec<_> = m.iter().collect();
    entries.sort_unstable();
    assert_eq!(entries.len(), 100);
    for (i, (k, v)) in entries.into_iter().enumerate() {
        assert_eq!(k, i as u32);
        assert_eq!(v, k * 2);
    }
    assert_eq!(m.keys().count(), 100);
    assert_eq!(m.values().filter(|v| v % 4 == 0).count(), 50);
}

#[test]
fn clear_retains_capacity_and_accepts_reinserts() {
    let m = LockFreeSwissMap::with_capacity(64);
    for i in 0..40u32 {
        m.insert(i, i);
    }
    let cap = m.capacity();
    m.clear();
    assert_eq!(m.len(), 0);
    assert_eq!(m.capacity(), cap);
    for i in 0..40u32 {
        assert_eq!(m.get(&i), None);
    }
    for i in 0..40u32 {
        assert_eq!(m.insert(i, i + 1), None);
    }
    assert_eq!(m.len(), 40);
    assert_eq!(m.get(&7), Some(8));
}

#[test]
fn parallel_disjoint_inserts() {
    let per_thread = 16_000u64;
    let m = Arc::new(LockFreeSwissMap::with_capacity(64));
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let threads: Vec<_> = (0..NUM_THREADS as u64)
        .map(|t| {
            let m = Arc::clone(&m);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let base = t * per_thread;
                for i in base..base + per_thread {
                    assert_eq!(m.insert(i, i.wrapping_mul(31)), None);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().expect("writer thread failed");
    }

    let total = NUM_THREADS as u64 * per_thread;
    assert_eq!(m.len(), total as usize);
    for i in 0..total {
        assert_eq!(m.get(&i), Some(i.wrapping_mul(31)), "key {i} lost");
    }
}

#[test]
fn readers_never_observe_a_published_key_vanishing() {
    let per_thread = 4_096u64;
    let writers = 4u64;
    let m = Arc::new(LockFreeSwissMap::with_capacity(16));
    let stop = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(writers as usize + 1));

    let reader = {
        let m = Arc::clone(&m);
        let stop = Arc::clone(&stop);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let mut seen = Vec::new();
            let mut probe = 0u64;
            while !stop.load(Ordering::Acquire) {
                probe = (probe + 7) % (writers * per_thread);
                if m.get(&probe).is_some() {
                    seen.push(probe);
                }
            }
            // Publication is permanent in this workload: everything the
            // reader saw must still be there.
            for key in seen {
                assert_eq!(m.get(&key), Some(key + 1), "published key {key} vanished");
            }
        })
    };

    let threads: Vec<_> = (0..writers)
        .map(|t| {
            let m = Arc::clone(&m);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let base = t * per_thread;
                for i in base..base + per_thread {
                    m.insert(i, i + 1);
                }
            })
        })
        .collect();
    for t in threads {
        t.join().expect("writer thread failed");
    }
    stop.store(true, Ordering::Release);
    reader.join().expect("reader thread failed");

    assert_eq!(m.len(), (writers * per_thread) as usize);
}

#[test]
fn contended_single_key_updates_lose_nothing() {
    let m = Arc::new(LockFreeSwissMap::with_capacity(16));
    m.insert(0u32, 0u64);
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let threads: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let m = Arc::clone(&m);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..10_000 {
                    m.compute_if_present(&0u32, |v| Some(v + 1));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().expect("updater thread failed");
    }

    // compute_if_present only wins when its read is still current, so every
    // increment must be accounted for.
    assert_eq!(m.get(&0u32), Some(NUM_THREADS as u64 * 10_000));
}

#[test]
fn concurrent_mixed_workload_with_resizes() {
    let m = Arc::new(LockFreeSwissMap::with_capacity(8));
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let threads: Vec<_> = (0..NUM_THREADS as u64)
        .map(|t| {
            let m = Arc::clone(&m);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let base = t * 4_096;
                for i in base..base + 4_096 {
                    m.insert(i, i);
                    if i % 3 == 0 {
                        assert_eq!(m.remove(&i), Some(i));
                    }
                }
            })
        })
        .collect();
    for t in threads {
        t.join().expect("worker thread failed");
    }

    let mut expected_len = 0;
    for t in 0..NUM_THREADS as u64 {
        for i in t * 4_096..t * 4_096 + 4_096 {
            if i % 3 == 0 {
                assert_eq!(m.get(&i), None);
            } else {
                assert_eq!(m.get(&i), Some(i));
                expected_len += 1;
            }
        }
    }
    assert_eq!(m.len(), expected_len);
}

#[test]
fn drops_owned_values_exactly_once() {
    // String values exercise the drop paths: overwrite, remove, clear,
    // resize transfer, and final drop.
    let m = LockFreeSwissMap::with_capacity(8);
    for i in 0..1_000u32 {
        m.insert(i, format!("value-{i}"));
    }
    for i in 0..500u32 {
        assert_eq!(m.remove(&i), Some(format!("value-{i}")));
    }
    for i in 0..100u32 {
        m.insert(i, format!("again-{i}"));
    }
    assert_eq!(m.get(&42).as_deref(), Some("again-42"));
    assert_eq!(m.get(&999).as_deref(), Some("value-999"));
    m.clear();
    assert!(m.is_empty());
}
