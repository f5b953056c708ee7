#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! SwissTable-style hash tables.
//!
//! Both maps in this crate share one slot layout: a control byte per slot,
//! packed eight to a 64-bit word, next to parallel key and value arrays. A
//! control byte is EMPTY (`0x80`) or FULL carrying the low seven bits of the
//! entry's smeared hash, so a group of eight slots is filtered against a
//! lookup with a handful of SWAR word operations, and the full key
//! comparison runs only on fingerprint matches (a false positive once per
//! 128 lanes).
//! Probing walks groups triangularly (+1, +2, +3, ... modulo the power-of-two
//! group count), which touches every group exactly once before wrapping.
//!
//! [`SwissMap`] is the single-owner engine: tombstone deletion with
//! dominance-triggered same-capacity rebuilds, load-factor-driven doubling,
//! and an entry API.
//!
//! [`LockFreeSwissMap`] is the concurrent engine: the same layout with
//! atomic cells, a key/value/control publication protocol, value-cell CAS
//! as the linearization point of every write, and a single-copier resize
//! with per-slot freeze and copy markers. Memory is reclaimed through
//! `crossbeam-epoch`.
//!
//! The slot layout follows Google's SwissTable design as popularized by
//! [abseil] and [hashbrown]; the concurrent protocol follows Cliff Click's
//! non-blocking hash map.
//!
//! [abseil]: https://abseil.io/about/design/swisstables
//! [hashbrown]: https://crates.io/crates/hashbrown

pub mod lockfree;
pub mod map;

mod hash;
mod swar;

pub use lockfree::LockFreeSwissMap;
pub use map::SwissMap;

/// Default hasher for the maps in this crate.
///
/// The default is the one used by `std::collections::HashMap`, currently
/// SipHash 1-3, which trades some raw speed for resistance against HashDoS
/// attacks. Alternative algorithms are available on crates.io, such as the
/// [`aHash`] crate, and can be plugged in through the `*_with_hasher`
/// constructors.
///
/// [`aHash`]: https://crates.io/crates/ahash
pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
