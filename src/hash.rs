//! Bucket index computation.
//!
//! The hash is the classic `h * 31 + byte` string hash kept in a signed
//! 16-bit accumulator. Overflow wraps. The final accumulator is folded to a
//! non-negative value by taking its unsigned magnitude, so `i16::MIN` maps to
//! `32768` rather than staying negative. Results therefore lie in
//! `0..=32768` before reduction by the table capacity.

use core::num::NonZeroU16;

/// Non-cryptographic 16-bit hash of the key's bytes.
///
/// Pure and deterministic: the same key always yields the same value.
#[inline]
pub fn string_hash<K>(key: &K) -> u16
where
    K: AsRef<[u8]> + ?Sized,
{
    let acc = key
        .as_ref()
        .iter()
        .fold(0i16, |h, &b| h.wrapping_mul(31).wrapping_add(i16::from(b)));
    acc.unsigned_abs()
}

/// Reduces `string_hash(key)` into `[0, capacity)`.
#[inline]
pub fn bucket_index<K>(key: &K, capacity: NonZeroU16) -> u16
where
    K: AsRef<[u8]> + ?Sized,
{
    string_hash(key) % capacity.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: u16) -> NonZeroU16 {
        NonZeroU16::new(n).unwrap()
    }

    #[test]
    fn known_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("hello"), 6354);
        assert_eq!(string_hash("alpha"), 20130);
        assert_eq!(string_hash("beta"), 5616);
    }

    /// Accumulators that wrap negative are folded to their magnitude.
    #[test]
    fn negative_accumulator_folds_to_magnitude() {
        // "keyed" accumulates to 0x8F3E, i.e. -28866 as i16.
        assert_eq!(string_hash("keyed"), 28866);
        assert_eq!(string_hash("abcd"), 27582);
    }

    /// The most negative accumulator has no positive i16 counterpart; it folds to 32768.
    #[test]
    fn most_negative_accumulator_folds_to_32768() {
        assert_eq!(string_hash("goia"), 32768);
        assert_eq!(bucket_index("goia", cap(16)), 0);
        assert_eq!(bucket_index("goia", cap(100)), 68);
        assert_eq!(bucket_index("goia", cap(u16::MAX)), 32768);
    }

    #[test]
    fn equal_hash_pair() {
        assert_eq!(string_hash("Aa"), string_hash("BB"));
        assert_eq!(string_hash("Aa"), 2112);
    }

    #[test]
    fn index_is_deterministic_and_in_range() {
        for c in [1u16, 2, 7, 16, 97, 1024, u16::MAX] {
            for k in ["", "a", "alpha", "keyed", "goia", "zzzzzzzzzzzzzzzz", "ünïcødé"] {
                let i = bucket_index(k, cap(c));
                assert!(i < c);
                assert_eq!(i, bucket_index(k, cap(c)));
            }
        }
    }

    /// Keys need not be UTF-8; bytes above 0x7f count as 128..=255.
    #[test]
    fn raw_bytes_hash_unsigned() {
        assert_eq!(string_hash(&[0xffu8][..]), 255);
        assert_eq!(string_hash(b"\xff\x01"), 255 * 31 + 1);
        assert_eq!(string_hash(b"hello"), string_hash("hello"));
    }

    #[test]
    fn capacity_one_maps_everything_to_zero() {
        for k in ["x", "y", "goia", "keyed"] {
            assert_eq!(bucket_index(k, cap(1)), 0);
        }
    }
}
