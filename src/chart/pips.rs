//! Pip traversal order for each block value.
//!
//! A block with value `n` expands into `n` pips. The pips are not visited
//! left-to-right: each die face has a fixed visual order, e.g. a three has
//! its centre pip first.

/// Smallest and largest legal block values.
pub const MIN_VALUE: u8 = 1;
pub const MAX_VALUE: u8 = 6;

/// Visit order of pip positions, indexed by `value - 1`.
pub const PIP_ORDER: [&[u8]; 6] = [
    &[0],
    &[0, 1],
    &[1, 0, 2],
    &[0, 2, 1, 3],
    &[0, 1, 2, 3, 4],
    &[0, 1, 2, 3, 4, 5],
];

/// Clamp a raw block value into `MIN_VALUE..=MAX_VALUE`.
pub fn clamp_value(value: u8) -> u8 {
    value.clamp(MIN_VALUE, MAX_VALUE)
}

/// Pip visit order for a block value. Out-of-range values are clamped.
pub fn pip_order(value: u8) -> &'static [u8] {
    PIP_ORDER[(clamp_value(value) - 1) as usize]
}

/// Number of pips (subdivisions) a block value expands to.
pub fn pip_count(value: u8) -> usize {
    pip_order(value).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_order_is_a_permutation() {
        for value in MIN_VALUE..=MAX_VALUE {
            let mut order = pip_order(value).to_vec();
            assert_eq!(order.len(), value as usize);
            order.sort_unstable();
            let expected: Vec<u8> = (0..value).collect();
            assert_eq!(order, expected, "value {value}");
        }
    }

    #[test]
    fn three_visits_centre_first() {
        assert_eq!(pip_order(3), &[1, 0, 2]);
        assert_eq!(pip_order(4), &[0, 2, 1, 3]);
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_eq!(pip_count(0), 1);
        assert_eq!(pip_count(9), 6);
    }
}
