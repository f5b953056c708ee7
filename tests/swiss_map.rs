use std::hash::{Hash, Hasher};

use hashsmith::SwissMap;

/// Key whose hash is a constant, forcing every instance into one probe chain.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
struct Collide(u32);

impl Hash for Collide {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(0);
    }
}

#[test]
fn smoke_large_insert_delete_reinsert() {
    let mut m = SwissMap::new();
    let n: u64 = 100_000;

    for i in 0..n {
        m.insert(i, i * 2);
    }
    for i in 0..n {
        assert_eq!(m.get(&i), Some(&(i * 2)));
    }

    for i in (0..n).step_by(2) {
        m.remove(&i);
    }
    for i in 0..n {
        if i % 2 == 0 {
            assert_eq!(m.get(&i), None);
        } else {
            assert_eq!(m.get(&i), Some(&(i * 2)));
        }
    }

    for i in (0..n).step_by(2) {
        m.insert(i, i * 3);
    }
    for i in 0..n {
        let expected = if i % 2 == 0 { i * 3 } else { i * 2 };
        assert_eq!(m.get(&i), Some(&expected));
    }
    assert_eq!(m.len(), n as usize);
}

#[test]
fn smoke_high_collision_loop() {
    let mut m = SwissMap::new();
    let n = 10_000;

    for i in 0..n {
        m.insert(Collide(i), i);
    }
    for i in 0..n {
        assert_eq!(m.get(&Collide(i)), Some(&i));
    }

    for i in (0..n).step_by(3) {
        m.remove(&Collide(i));
    }
    for i in 0..n {
        if i % 3 == 0 {
            assert_eq!(m.get(&Collide(i)), None);
        } else {
            assert_eq!(m.get(&Collide(i)), Some(&i));
        }
    }
}

#[test]
fn delete_only_workload_never_grows() {
    let mut m: SwissMap<u32, u32> = SwissMap::with_capacity(64);
    for i in 0..32 {
        m.insert(i, i);
    }
    assert_eq!(m.capacity(), 64);
    for i in 0..32 {
        assert_eq!(m.remove(&i), Some(i));
        assert_eq!(m.capacity(), 64);
    }
    assert_eq!(m.len(), 0);
}

#[test]
fn growth_under_load_pressure() {
    let mut m: SwissMap<u32, u32> = SwissMap::with_capacity(16);
    assert_eq!(m.capacity(), 16);
    for i in 0..15 {
        m.insert(i, i);
    }
    assert!(m.capacity() >= 32);
    for i in 0..15 {
        assert_eq!(m.get(&i), Some(&i));
    }
}

#[test]
fn populate_and_clone_into_smaller_map() {
    let n: u32 = 100_000;
    let mut original = SwissMap::with_capacity(n as usize);
    for i in 1..=n {
        original.insert(i, i);
    }

    let mut cloned = SwissMap::with_capacity(n as usize / 2);
    cloned.extend(original.iter().map(|(&k, &v)| (k, v)));

    assert_eq!(original.len(), n as usize);
    assert_eq!(cloned.len(), original.len());
    assert_eq!(cloned.get(&1234), original.get(&1234));
}

#[test]
fn remove_without_tombstone_keeps_reads_consistent() {
    let mut m: SwissMap<Collide, u32> = SwissMap::with_capacity(64);
    for i in 0..200 {
        m.insert(Collide(i), i);
    }
    for i in 0..50 {
        assert_eq!(m.remove(&Collide(i)), Some(i));
    }
    assert_eq!(m.remove_without_tombstone(&Collide(123)), Some(123));
    assert_eq!(m.remove_without_tombstone(&Collide(7)), None);
    for i in 0..200 {
        let v = m.get(&Collide(i));
        if i < 50 || i == 123 {
            assert_eq!(v, None);
        } else {
            assert_eq!(v, Some(&i));
        }
    }
}

#[test]
fn string_keys_with_borrowed_lookups() {
    let mut m: SwissMap<String, usize> = SwissMap::new();
    for word in ["alpha", "beta", "gamma", "delta"] {
        m.insert(word.to_string(), word.len());
    }
    assert_eq!(m.get("beta"), Some(&4));
    assert!(m.contains_key("delta"));
    assert_eq!(m.remove("alpha"), Some(5));
    assert_eq!(m.get("alpha"), None);
    assert_eq!(m.keys().count(), 3);
}

#[test]
fn retain_drops_half() {
    let mut m: SwissMap<u32, u32> = (0..1000).map(|i| (i, i)).collect();
    m.retain(|&k, _| k % 2 == 1);
    assert_eq!(m.len(), 500);
    assert!(m.iter().all(|(&k, _)| k % 2 == 1));
}

#[test]
fn entry_api_counts_words() {
    let text = "the quick brown fox jumps over the lazy dog the fox";
    let mut counts: SwissMap<&str, u32> = SwissMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word).or_insert(0) += 1;
    }
    assert_eq!(counts.get("the"), Some(&3));
    assert_eq!(counts.get("fox"), Some(&2));
    assert_eq!(counts.get("dog"), Some(&1));
    assert_eq!(counts.get("cat"), None);
}
