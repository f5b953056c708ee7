//! Hash smearing and table sizing.
//!
//! The smear step is one scramble round of MurmurHash3 (written by Austin
//! Appleby and placed in the public domain); it spreads whatever entropy the
//! user hash has across all 32 bits before the table splits them into the
//! group selector and the fingerprint.

use std::hash::{BuildHasher, Hash, Hasher};

const C1: u32 = 0xCC9E_2D51;
const C2: u32 = 0x1B87_3593;

/// Slots per group; one packed control word.
pub(crate) const GROUP_SIZE: usize = 8;

/// One MurmurHash3 scramble round.
#[inline]
pub(crate) fn smear(h: u32) -> u32 {
    h.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

/// Hashes `key` with `build_hasher` and smears the result. The 64-bit hasher
/// output is folded to 32 bits by XOR of the halves so both halves
/// contribute.
#[inline]
pub(crate) fn smeared_hash<Q, S>(build_hasher: &S, key: &Q) -> u32
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    let mut hasher = build_hasher.build_hasher();
    key.hash(&mut hasher);
    let h = hasher.finish();
    smear((h ^ (h >> 32)) as u32)
}

/// Group selector: every smeared bit above the 7 fingerprint bits.
#[inline]
pub(crate) fn h1(smeared: u32) -> u32 {
    (smeared & 0xFFFF_FF80) >> 7
}

/// 7-bit fingerprint. The high bit is clear, so the result is itself a FULL
/// control byte.
#[inline]
pub(crate) fn h2(smeared: u32) -> u8 {
    (smeared & 0x7F) as u8
}

/// Number of 8-slot groups backing a requested entry capacity: `capacity / 8`
/// rounded up, then rounded up again to a power of two so that group masking
/// and triangular probing work.
pub(crate) fn groups_for(capacity: usize) -> usize {
    let groups = ((capacity + GROUP_SIZE - 1) / GROUP_SIZE).max(1);
    groups.next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h2_is_a_full_control_byte() {
        for h in [0u32, 1, 0x7F, 0x80, 0xFFFF_FFFF, 0xDEAD_BEEF] {
            let smeared = smear(h);
            assert_eq!(h2(smeared) & 0x80, 0);
        }
    }

    #[test]
    fn h1_and_h2_partition_the_smeared_hash() {
        for h in 0..1024u32 {
            let smeared = smear(h);
            assert_eq!((h1(smeared) << 7) | u32::from(h2(smeared)), smeared);
        }
    }

    #[test]
    fn smear_matches_reference_step() {
        // rotateLeft(h * C1, 15) * C2, all wrapping.
        let h = 0x1234_5678u32;
        let expected = h.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        assert_eq!(smear(h), expected);
        assert_ne!(smear(1), smear(2));
    }

    #[test]
    fn groups_round_up_to_powers_of_two() {
        assert_eq!(groups_for(0), 1);
        assert_eq!(groups_for(1), 1);
        assert_eq!(groups_for(8), 1);
        assert_eq!(groups_for(9), 2);
        assert_eq!(groups_for(16), 2);
        assert_eq!(groups_for(17), 4);
        assert_eq!(groups_for(64), 8);
        assert_eq!(groups_for(100), 16);
    }
}
