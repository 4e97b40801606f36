//! # Event Bus Integration Flows
//!
//! Subscription filter matching, bounded-queue backpressure, ordering, and
//! the statistics surface.

#[cfg(test)]
mod tests {
    use sc_events::{EventBus, EventType, SubscriptionFilter};
    use serde_json::json;

    fn filter(
        key: Option<&str>,
        environment: Option<&str>,
        category: Option<&str>,
    ) -> SubscriptionFilter {
        SubscriptionFilter {
            key: key.map(String::from),
            environment: environment.map(String::from),
            category: category.map(String::from),
        }
    }

    fn publish_db_prod(bus: &EventBus) -> (usize, usize) {
        bus.publish(
            EventType::Updated,
            "db",
            "prod",
            Some("infra".into()),
            None,
            Some("node-a:9000".into()),
        )
    }

    #[tokio::test]
    async fn test_filter_matching_matrix() {
        let bus = EventBus::new();

        // All present fields must match; absent fields are wildcards.
        let (wildcard, mut rx_wildcard) = bus.subscribe(SubscriptionFilter::all());
        let (_, mut rx_key) = bus.subscribe(filter(Some("db"), None, None));
        let (_, mut rx_env) = bus.subscribe(filter(None, Some("prod"), None));
        let (_, mut rx_exact) = bus.subscribe(filter(Some("db"), Some("prod"), Some("infra")));
        let (_, mut rx_wrong_key) = bus.subscribe(filter(Some("cache"), None, None));
        let (_, mut rx_wrong_cat) = bus.subscribe(filter(Some("db"), Some("prod"), Some("web")));

        let (sent, dropped) = publish_db_prod(&bus);
        assert_eq!((sent, dropped), (4, 0));

        for rx in [&mut rx_wildcard, &mut rx_key, &mut rx_env, &mut rx_exact] {
            let event = rx.try_recv().unwrap();
            assert_eq!(event.key, "db");
            assert_eq!(event.event_type, EventType::Updated);
            assert_eq!(event.node_id.as_deref(), Some("node-a:9000"));
        }
        assert!(rx_wrong_key.try_recv().is_err());
        assert!(rx_wrong_cat.try_recv().is_err());

        // Category filter never matches an event without a category.
        let (_, mut rx_cat_only) = bus.subscribe(filter(None, None, Some("infra")));
        bus.publish(EventType::Created, "db", "prod", None, None, None);
        assert!(rx_cat_only.try_recv().is_err());

        bus.unsubscribe(wildcard);
        assert_eq!(bus.active_subscriptions(), 6);
    }

    #[tokio::test]
    async fn test_backpressure_is_per_subscriber() {
        let bus = EventBus::with_queue_size(2);
        let (_, mut rx_slow) = bus.subscribe(SubscriptionFilter::all());
        let (_, mut rx_fast) = bus.subscribe(SubscriptionFilter::all());

        // Fill both queues, then drain only the fast one.
        publish_db_prod(&bus);
        publish_db_prod(&bus);
        rx_fast.try_recv().unwrap();
        rx_fast.try_recv().unwrap();

        // Third publish: slow subscriber drops, fast one still receives.
        let (sent, dropped) = publish_db_prod(&bus);
        assert_eq!((sent, dropped), (1, 1));
        assert!(rx_fast.try_recv().is_ok());

        // The slow queue kept its oldest two events (drop-newest policy).
        assert!(rx_slow.try_recv().is_ok());
        assert!(rx_slow.try_recv().is_ok());
        assert!(rx_slow.try_recv().is_err());

        let stats = bus.stats();
        assert_eq!(stats.events.dropped_queue_full, 1);
    }

    #[tokio::test]
    async fn test_delivery_preserves_publish_order() {
        let bus = EventBus::new();
        let (_, mut rx) = bus.subscribe(filter(None, Some("prod"), None));

        for i in 0..5 {
            bus.publish(
                EventType::Updated,
                &format!("key-{i}"),
                "prod",
                None,
                Some(json!({ "seq": i })),
                None,
            );
        }
        for i in 0..5 {
            assert_eq!(rx.try_recv().unwrap().key, format!("key-{i}"));
        }
    }

    #[tokio::test]
    async fn test_stats_track_lifecycle() {
        let bus = EventBus::new();
        let (id, _rx) = bus.subscribe(filter(Some("db"), None, None));
        let (_, _rx2) = bus.subscribe(SubscriptionFilter::all());

        publish_db_prod(&bus);
        bus.record_keepalive(id);
        bus.unsubscribe(id);
        bus.record_disconnection();

        let stats = bus.stats();
        assert_eq!(stats.subscriptions.total_created, 2);
        assert_eq!(stats.subscriptions.active, 1);
        assert_eq!(stats.events.total_sent, 2);
        assert_eq!(stats.connection_health.keepalive_sent, 1);
        assert_eq!(stats.connection_health.disconnections_detected, 1);

        let details = bus.subscription_details();
        assert_eq!(details.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_receiver_counts_as_drop() {
        let bus = EventBus::new();
        let (_, rx) = bus.subscribe(SubscriptionFilter::all());
        drop(rx);

        let (sent, dropped) = publish_db_prod(&bus);
        assert_eq!((sent, dropped), (0, 1));
    }
}
