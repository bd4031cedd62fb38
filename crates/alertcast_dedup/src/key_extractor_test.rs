#[cfg(test)]
mod tests {
    use crate::error::DedupError;
    use crate::key_extractor::{
        halve_interval, EventKind, GenericKeyExtractor, GeofenceKeyExtractor, KeyExtractor,
        KeyExtractorFactory,
    };
    use alertcast_common::Alert;
    use serde_json::json;

    fn alert(event_type: &str, timestamp: i64) -> Alert {
        Alert::new("D", event_type, timestamp)
    }

    fn geofence_alert(timestamp: i64, attribute: &str, id: serde_json::Value) -> Alert {
        let mut alert = alert("GEOFENCE", timestamp);
        alert.attributes.insert(attribute.to_string(), id);
        alert
    }

    #[test]
    fn test_interval_is_halved_rounding_up() {
        assert_eq!(halve_interval(0), 0);
        assert_eq!(halve_interval(1), 1);
        assert_eq!(halve_interval(1000), 500);
        assert_eq!(halve_interval(1001), 501);
        assert_eq!(GenericKeyExtractor::new(1000).interval(), 500);
    }

    #[test]
    fn test_oversized_interval_clamps() {
        assert_eq!(halve_interval(u64::MAX), i64::MAX);
        assert_eq!(halve_interval(u64::MAX - 1), i64::MAX);

        let extractor = GenericKeyExtractor::new(u64::MAX);
        let ts = 1_700_000_000_000;
        assert_eq!(extractor.current_key(&alert("E", ts)), "DEDUP_D_E_0");
        assert_eq!(
            extractor.previous_key(&alert("E", ts), 2),
            format!("DEDUP_D_E_{}", -i64::MAX)
        );
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let extractor = GenericKeyExtractor::new(1000);
        let min = alert("E", i64::MIN);
        assert_eq!(extractor.current_key(&min), format!("DEDUP_D_E_{}", i64::MIN));
        assert_eq!(extractor.previous_key(&min, 2), format!("DEDUP_D_E_{}", i64::MIN));

        let max = alert("E", i64::MAX);
        let bucket = i64::MAX - i64::MAX.rem_euclid(500);
        assert_eq!(extractor.current_key(&max), format!("DEDUP_D_E_{bucket}"));
        assert_eq!(
            extractor.previous_key(&max, 1),
            format!("DEDUP_D_E_{}", bucket - 500)
        );
    }

    #[test]
    fn test_zero_interval_keys_use_exact_timestamp() {
        let extractor = GenericKeyExtractor::new(0);
        assert_eq!(extractor.current_key(&alert("E", 1234)), "DEDUP_D_E_1234");
        assert_eq!(extractor.previous_key(&alert("E", 1234), 2), "DEDUP_D_E_1234");
    }

    #[test]
    fn test_bucketing_with_interval() {
        let extractor = GenericKeyExtractor::new(1000);
        assert_eq!(extractor.current_key(&alert("E", 1000)), "DEDUP_D_E_1000");
        assert_eq!(extractor.current_key(&alert("E", 1400)), "DEDUP_D_E_1000");
        assert_eq!(extractor.current_key(&alert("E", 1600)), "DEDUP_D_E_1500");
        assert_eq!(extractor.previous_key(&alert("E", 1600), 1), "DEDUP_D_E_1000");
        assert_eq!(extractor.previous_key(&alert("E", 1600), 2), "DEDUP_D_E_500");
    }

    #[test]
    fn test_generic_extractor_ignores_geofence_attribute() {
        let extractor = GenericKeyExtractor::new(1000);
        let mut a = alert("IGNITION_ON", 1000);
        a.attributes.insert("geofenceId".to_string(), json!("home"));
        assert_eq!(extractor.current_key(&a), "DEDUP_D_IGNITION_ON_1000");
    }

    #[test]
    fn test_geofence_qualifier_from_either_attribute() {
        let extractor = GeofenceKeyExtractor::new(1000);
        assert_eq!(
            extractor.current_key(&geofence_alert(1000, "geofenceId", json!("home"))),
            "DEDUP_D_GEOFENCE_1000_home"
        );
        assert_eq!(
            extractor.current_key(&geofence_alert(1000, "geoFenceId", json!(42))),
            "DEDUP_D_GEOFENCE_1000_42"
        );
    }

    #[test]
    fn test_geofence_first_attribute_wins() {
        let extractor = GeofenceKeyExtractor::new(1000);
        let mut a = geofence_alert(1000, "geofenceId", json!("first"));
        a.attributes.insert("geoFenceId".to_string(), json!("second"));
        assert_eq!(extractor.current_key(&a), "DEDUP_D_GEOFENCE_1000_first");
    }

    #[test]
    fn test_geofence_without_id_has_no_suffix() {
        let extractor = GeofenceKeyExtractor::new(1000);
        assert_eq!(
            extractor.current_key(&alert("GEOFENCE", 1000)),
            "DEDUP_D_GEOFENCE_1000"
        );
        assert_eq!(
            extractor.current_key(&geofence_alert(1000, "geofenceId", json!(""))),
            "DEDUP_D_GEOFENCE_1000"
        );
    }

    #[test]
    fn test_event_kind_dispatch() {
        assert_eq!(EventKind::of("GEOFENCE"), EventKind::Geofence);
        assert_eq!(EventKind::of("geofence"), EventKind::Generic);
        assert_eq!(EventKind::of("SPEED_ALERT"), EventKind::Generic);
    }

    #[test]
    fn test_factory_fails_before_init() {
        let factory = KeyExtractorFactory::new();
        assert!(!factory.is_initialized());
        assert!(matches!(
            factory.extractor_for("E"),
            Err(DedupError::ExtractorNotInitialized)
        ));
    }

    #[test]
    fn test_factory_init_is_once_only() {
        let factory = KeyExtractorFactory::new();
        assert!(factory.init(1000));
        assert!(!factory.init(4000));
        assert_eq!(factory.extractor_for("E").unwrap().interval(), 500);
        let key = factory
            .extractor_for("GEOFENCE")
            .unwrap()
            .current_key(&geofence_alert(1200, "geofenceId", json!("work")));
        assert_eq!(key, "DEDUP_D_GEOFENCE_1000_work");
    }
}
