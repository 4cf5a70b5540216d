//! Out-of-bounds index handling for neighborhood filters.

/// Map a possibly out-of-range index into `[0, len)` by mirroring
/// without repeating the edge sample (`dcb|abcd|cba`).
///
/// A length of 1 always maps to 0. `len` must be non-zero.
#[must_use]
pub fn reflect_101(index: i64, len: u32) -> u32 {
    let n = i64::from(len);
    if n <= 1 {
        return 0;
    }
    let period = 2 * n - 2;
    let i = index.rem_euclid(period);
    let mirrored = if i >= n { period - i } else { i };
    // `mirrored` is in [0, n) so it fits in u32.
    u32::try_from(mirrored).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_is_identity() {
        for i in 0..5 {
            assert_eq!(reflect_101(i, 5), u32::try_from(i).unwrap_or(u32::MAX));
        }
    }

    #[test]
    fn mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
    }

    #[test]
    fn far_out_of_range_stays_in_bounds() {
        for i in -40..40 {
            assert!(reflect_101(i, 3) < 3);
        }
    }

    #[test]
    fn single_sample() {
        assert_eq!(reflect_101(-3, 1), 0);
        assert_eq!(reflect_101(7, 1), 0);
    }
}
