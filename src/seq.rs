//! 32 位序列号/确认号的环绕比较。
//! Wraparound comparison of 32-bit sequence and acknowledgment counters.

/// One quarter of the 32-bit counter space.
const QUARTER: u32 = u32::MAX / 4;

/// Circular "not earlier than" on a 32-bit counter.
///
/// Correct whenever the true distance between `a` and `b` is below 2^31.
///
/// 32 位计数器上的环形 "不早于" 比较。只要 `a` 与 `b` 的真实距离小于 2^31 即正确。
#[inline]
pub fn is_at_or_after(a: u32, b: u32) -> bool {
    a.wrapping_sub(b) < 1 << 31
}

/// Quarter-range "not earlier than", used by TCP round-trip detection.
///
/// True when `a >= b`, or when `b` sits in the top quarter of the counter space
/// and `a` in the bottom quarter (the counter wrapped between the two samples).
/// This is an approximation: it holds as long as fewer than roughly one billion
/// sequence numbers elapse between the two samples and `a` has not fallen behind
/// `b` across the wrap point.
///
/// 基于四分之一区间的 "不早于" 比较，用于 TCP 往返检测。
/// 当 `a >= b`，或 `b` 位于计数空间的最高四分之一且 `a` 位于最低四分之一时为真。
/// 这是一个近似：只要两次采样之间经过的序列号少于约十亿个即成立。
#[inline]
pub fn is_at_or_after_quarter(a: u32, b: u32) -> bool {
    a >= b || (b > u32::MAX - QUARTER && a < QUARTER)
}

/// The later of two counters under the quarter-range rule.
/// 按四分之一区间规则取两个计数器中较晚的一个。
#[inline]
pub fn max_quarter(current: u32, candidate: u32) -> u32 {
    if is_at_or_after_quarter(candidate, current) {
        candidate
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_ordering() {
        assert!(is_at_or_after(10, 10));
        assert!(is_at_or_after(11, 10));
        assert!(!is_at_or_after(9, 10));
        assert!(is_at_or_after_quarter(11, 10));
        assert!(!is_at_or_after_quarter(9, 10));
    }

    #[test]
    fn test_wrap_across_zero() {
        assert!(is_at_or_after(5, u32::MAX - 5));
        assert!(!is_at_or_after(u32::MAX - 5, 5));
        assert!(is_at_or_after_quarter(5, u32::MAX - 5));
    }

    #[test]
    fn test_quarter_rule_boundaries() {
        // b exactly at the top-quarter boundary is not treated as wrapped.
        assert!(!is_at_or_after_quarter(0, u32::MAX - QUARTER));
        assert!(is_at_or_after_quarter(0, u32::MAX - QUARTER + 1));
        // a must lie strictly inside the bottom quarter.
        assert!(!is_at_or_after_quarter(QUARTER, u32::MAX));
        assert!(is_at_or_after_quarter(QUARTER - 1, u32::MAX));
    }

    #[test]
    fn test_max_quarter() {
        assert_eq!(max_quarter(100, 200), 200);
        assert_eq!(max_quarter(200, 100), 200);
        assert_eq!(max_quarter(u32::MAX - 10, 20), 20);
    }

    proptest! {
        #[test]
        fn prop_circular_matches_forward_distance(b: u32, gap in 0u32..(1 << 31)) {
            let a = b.wrapping_add(gap);
            prop_assert!(is_at_or_after(a, b));
            if gap != 0 {
                prop_assert!(!is_at_or_after(b, a));
            }
        }

        #[test]
        fn prop_quarter_rule_agrees_for_small_forward_gaps(b: u32, gap in 0u32..QUARTER) {
            let a = b.wrapping_add(gap);
            // Forward progress of less than a quarter is always recognised,
            // whether or not it crosses zero.
            prop_assert_eq!(is_at_or_after_quarter(a, b), is_at_or_after(a, b));
        }

        #[test]
        fn prop_quarter_rule_agrees_without_wrap(a in 0u32..(1 << 31), b in 0u32..(1 << 31)) {
            prop_assert_eq!(is_at_or_after_quarter(a, b), is_at_or_after(a, b));
        }
    }
}
