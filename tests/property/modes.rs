use proptest::prelude::*;
use static_mock::{at_least, at_most, never, only, times};

proptest! {
    #[test]
    fn test_times_requires_exact_count(n in 0usize..50, matching in 0usize..50, extra in 0usize..50) {
        let total = matching + extra;
        prop_assert_eq!(times(n).is_satisfied(matching, total), matching == n);
    }

    #[test]
    fn test_at_least_and_at_most_partition_counts(n in 0usize..50, matching in 0usize..50) {
        let total = matching;
        // Exactly n satisfies both; every other count satisfies exactly one.
        let both = at_least(n).is_satisfied(matching, total) && at_most(n).is_satisfied(matching, total);
        let either = at_least(n).is_satisfied(matching, total) || at_most(n).is_satisfied(matching, total);
        prop_assert!(either);
        prop_assert_eq!(both, matching == n);
    }

    #[test]
    fn test_never_is_times_zero(matching in 0usize..50, extra in 0usize..50) {
        let total = matching + extra;
        prop_assert_eq!(never().is_satisfied(matching, total), times(0).is_satisfied(matching, total));
    }

    #[test]
    fn test_only_needs_single_call(matching in 0usize..5, extra in 0usize..5) {
        prop_assert_eq!(only().is_satisfied(matching, matching + extra), matching == 1 && extra == 0);
    }
}
