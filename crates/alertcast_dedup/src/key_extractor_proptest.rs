#[cfg(test)]
mod tests {
    use crate::key_extractor::{GenericKeyExtractor, KeyExtractor};
    use alertcast_common::Alert;
    use proptest::prelude::*;

    proptest! {
        // Two alerts in the same bucket always share a key
        #[test]
        fn test_same_bucket_same_key(
            interval_ms in 1u64..600_000,
            bucket_index in 0i64..10_000_000,
            offset_a in 0i64..300_000,
            offset_b in 0i64..300_000,
        ) {
            let extractor = GenericKeyExtractor::new(interval_ms);
            let half = extractor.interval();
            let start = bucket_index * half;
            let a = Alert::new("D", "E", start + offset_a % half);
            let b = Alert::new("D", "E", start + offset_b % half);
            prop_assert_eq!(extractor.current_key(&a), extractor.current_key(&b));
        }

        // Buckets are aligned, no wider than the halved interval and contain the timestamp
        #[test]
        fn test_bucket_contains_timestamp(
            interval_ms in 1u64..600_000,
            timestamp in 0i64..4_000_000_000_000,
        ) {
            let extractor = GenericKeyExtractor::new(interval_ms);
            let half = extractor.interval();
            let bucket = extractor.time_bucket(timestamp);
            prop_assert_eq!(half, ((interval_ms + 1) / 2) as i64);
            prop_assert_eq!(bucket % half, 0);
            prop_assert!(bucket <= timestamp);
            prop_assert!(timestamp - bucket < half);
        }

        // Each hop steps back exactly one bucket width
        #[test]
        fn test_previous_bucket_steps_by_interval(
            interval_ms in 1u64..600_000,
            timestamp in 0i64..4_000_000_000_000,
            hops in 0i64..5,
        ) {
            let extractor = GenericKeyExtractor::new(interval_ms);
            prop_assert_eq!(
                extractor.time_bucket(timestamp) - extractor.previous_bucket(timestamp, hops),
                extractor.interval() * hops
            );
        }
    }
}
