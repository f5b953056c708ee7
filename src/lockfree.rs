//! A lock-free SwissTable map with cooperative resizing.
//!
//! The concurrent engine keeps the single-owner engine's slot layout (one
//! packed control word per 8-slot group next to parallel key and value
//! arrays), but every cell becomes atomic. A control byte moves from EMPTY to FULL
//! exactly once and never back; all later state lives in the value cell, so
//! logical deletion is a TOMBSTONE sentinel in the value rather than a
//! control-byte tombstone.
//!
//! Cells hold tagged pointers to boxed keys and values. The tag bits are the
//! sentinels: a key cell becomes MOVED (tagged null) when a resize freezes
//! the slot for copy-out, a value cell becomes TOMBSTONE (tagged null) on
//! deletion, and a value being copied is "boxed" into a Prime by adding a
//! tag bit to its pointer. Readers restart when they meet a MOVED key or a
//! Prime value; writers funnel every mutation through a compare-and-swap on
//! the value cell, which is also each operation's linearization point.
//!
//! Insertion publishes in three steps: CAS the key cell from null, CAS the
//! value cell from null, then CAS the control byte from EMPTY to the
//! fingerprint. A reader that observes the FULL byte with acquire ordering
//! is therefore guaranteed to see both cells. Once the key CAS lands the
//! sequence always runs to completion; a resize that catches a slot between
//! the key and value steps waits for the value to arrive and then carries
//! the finished entry into the successor table.
//!
//! Resizing is claimed by one thread through the table's forward pointer: a
//! tagged null reserves the claim, then the successor table is stored there
//! and every slot of the old table is drained. Draining a slot freezes the
//! key, boxes the value into a Prime, inserts the pair into the successor
//! (which cannot conflict: the successor is pristine and not yet visible to
//! writers), and finally seals the old value cell as a tombstone-Prime.
//! While the copy runs, every other thread spins until the map's root
//! pointer swaps to the successor; retired tables and displaced values are
//! reclaimed through the epoch once no thread can still hold them.
//!
//! The design follows Cliff Click's non-blocking hash map as presented in
//! [a tech talk] given at Google in 2007, grafted onto the SwissTable slot
//! layout popularized by [abseil] and [hashbrown].
//!
//! [a tech talk]: https://youtu.be/HJ-719EGIts
//! [abseil]: https://abseil.io/about/design/swisstables
//! [hashbrown]: https://crates.io/crates/hashbrown

pub(crate) mod counter;
pub(crate) mod map;
pub(crate) mod table;

pub use map::{Iter, Keys, LockFreeSwissMap, Values};
