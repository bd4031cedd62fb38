#[cfg(test)]
mod tests {
    use crate::deduplicator::Deduplicator;
    use crate::error::DedupError;
    use crate::key_store::{InMemoryKeyStore, KeyStore};
    use alertcast_common::{Alert, BoxFuture, ChannelMetrics};
    use alertcast_config::DedupConfig;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn config(interval_ms: u64) -> DedupConfig {
        DedupConfig {
            interval_ms,
            store_class: Some("in-memory".to_string()),
            ..DedupConfig::default()
        }
    }

    fn memory_store(config: &DedupConfig) -> Arc<InMemoryKeyStore> {
        Arc::new(InMemoryKeyStore::new(config, "test"))
    }

    fn alert(timestamp: i64) -> Alert {
        Alert::new("D", "E", timestamp)
    }

    fn timestamps(alerts: &[Alert]) -> Vec<i64> {
        alerts.iter().map(|a| a.timestamp).collect()
    }

    #[derive(Default)]
    struct SuppressionCounter {
        reasons: Mutex<Vec<String>>,
    }

    impl ChannelMetrics for SuppressionCounter {
        fn record_alert_suppressed(&self, reason: &str) {
            self.reasons.lock().unwrap().push(reason.to_string());
        }
    }

    struct FailingStore;

    impl KeyStore for FailingStore {
        fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Option<i64>, DedupError> {
            Box::pin(async { Err(DedupError::StoreError("connection refused".to_string())) })
        }

        fn put<'a>(&'a self, _key: &'a str, _value: i64) -> BoxFuture<'a, (), DedupError> {
            Box::pin(async { Err(DedupError::StoreError("connection refused".to_string())) })
        }

        fn set_ttl(&self, _ttl: Duration) {}
    }

    #[tokio::test]
    async fn test_bucket_and_one_hop_suppression() {
        let config = config(1000);
        let store = memory_store(&config);
        let dedup = Deduplicator::with_store(&config, store.clone());

        let kept = dedup
            .filter_duplicate_alert(vec![alert(1000), alert(1400), alert(1600)])
            .await
            .unwrap();

        assert_eq!(timestamps(&kept), vec![1000]);
        assert_eq!(store.get("DEDUP_D_E_1000").await.unwrap(), Some(1000));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_two_hop_keeps_alert_outside_window() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        // 2100 sits in bucket 2000; bucket 1000 is two hops back and 1100ms old
        let kept = dedup
            .filter_duplicate_alert(vec![alert(1000), alert(2100)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1000, 2100]);
    }

    #[tokio::test]
    async fn test_two_hop_drops_alert_inside_window() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        // 1499 records bucket 1000; 2000 is two hops later but only 501ms after it
        let kept = dedup
            .filter_duplicate_alert(vec![alert(1499), alert(2000)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1499]);
    }

    #[tokio::test]
    async fn test_two_hop_boundary_is_inclusive() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        // exactly one window apart is still a duplicate
        let kept = dedup
            .filter_duplicate_alert(vec![alert(1000), alert(2000)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1000]);
    }

    #[tokio::test]
    async fn test_one_hop_suppresses_without_comparing_time() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        // 1000 and 1999 are 999ms apart in adjacent buckets
        let kept = dedup
            .filter_duplicate_alert(vec![alert(1000), alert(1999)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1000]);
    }

    #[tokio::test]
    async fn test_filtering_is_idempotent() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));
        let batch = vec![alert(1000), alert(5000), alert(9000)];

        let first = dedup.filter_duplicate_alert(batch.clone()).await.unwrap();
        assert_eq!(first.len(), 3);
        let second = dedup.filter_duplicate_alert(batch).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_order_is_preserved_across_devices() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));
        let batch = vec![
            Alert::new("B", "E", 3000),
            Alert::new("A", "E", 1000),
            Alert::new("B", "E", 3100),
            Alert::new("C", "E", 2000),
        ];

        let kept = dedup.filter_duplicate_alert(batch).await.unwrap();
        let devices: Vec<&str> = kept.iter().map(|a| a.device_id.as_str()).collect();
        assert_eq!(devices, vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_geofences_are_deduplicated_independently() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));
        let fence = |id: &str, ts: i64| {
            let mut a = Alert::new("D", "GEOFENCE", ts);
            a.attributes.insert("geofenceId".to_string(), json!(id));
            a
        };

        let kept = dedup
            .filter_duplicate_alert(vec![fence("home", 1000), fence("work", 1100), fence("home", 1200)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1000, 1100]);
    }

    #[tokio::test]
    async fn test_zero_interval_only_drops_exact_repeats() {
        let config = config(0);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        let kept = dedup
            .filter_duplicate_alert(vec![alert(1000), alert(1000), alert(1001)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1000, 1001]);
    }

    #[tokio::test]
    async fn test_extreme_timestamps_do_not_abort_batch() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        let kept = dedup
            .filter_duplicate_alert(vec![alert(i64::MIN), alert(i64::MIN), alert(i64::MAX)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![i64::MIN, i64::MAX]);
    }

    #[tokio::test]
    async fn test_oversized_interval_does_not_abort_batch() {
        let config = config(u64::MAX);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));

        let kept = dedup
            .filter_duplicate_alert(vec![alert(1_700_000_000_000), alert(1_700_000_000_500)])
            .await
            .unwrap();
        assert_eq!(timestamps(&kept), vec![1_700_000_000_000]);
    }

    #[tokio::test]
    async fn test_disabled_is_identity() {
        let config = DedupConfig {
            enabled: false,
            ..DedupConfig::default()
        };
        // no store_class needed when disabled
        let dedup = Deduplicator::new(&config).unwrap();
        assert!(!dedup.is_enabled());
        assert!(dedup.store().is_none());

        let batch = vec![alert(1000), alert(1000), alert(1000)];
        let kept = dedup.filter_duplicate_alert(batch.clone()).await.unwrap();
        assert_eq!(kept, batch);
    }

    #[tokio::test]
    async fn test_suppressions_are_reported_to_metrics() {
        let config = config(1000);
        let metrics = Arc::new(SuppressionCounter::default());
        let dedup = Deduplicator::with_store(&config, memory_store(&config))
            .with_metrics(metrics.clone());

        dedup
            .filter_duplicate_alert(vec![alert(1000), alert(1400), alert(1600)])
            .await
            .unwrap();
        assert_eq!(
            *metrics.reasons.lock().unwrap(),
            vec!["same-bucket".to_string(), "one-hop".to_string()]
        );
    }

    #[tokio::test]
    async fn test_store_failures_propagate() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, Arc::new(FailingStore));

        // an empty bloom filter answers reads, so only the record hits the store
        let result = dedup.filter_duplicate_alert(vec![alert(1000)]).await;
        assert!(matches!(result, Err(DedupError::StoreError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_keys_no_longer_suppress() {
        let config = DedupConfig {
            store_ttl_seconds: 60,
            ..config(1000)
        };
        let store = memory_store(&config);
        let dedup = Deduplicator::with_store(&config, store.clone());

        dedup.filter_duplicate_alert(vec![alert(1000)]).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        let kept = dedup.filter_duplicate_alert(vec![alert(1200)]).await.unwrap();
        assert_eq!(timestamps(&kept), vec![1200]);
    }

    #[test]
    fn test_cache_restored_by_default() {
        let config = config(1000);
        let dedup = Deduplicator::with_store(&config, memory_store(&config));
        assert!(dedup.cache_restored());

        dedup.store().unwrap().begin_restore();
        assert!(!dedup.cache_restored());
    }
}
