//! Tests for `MemoryBroker`.

use std::time::Duration;

use super::{
    Broker, BrokerError, Delivery, Disposition, MemoryBroker, PublishOptions, Publisher,
    Subscription,
};

const QUEUE: &str = "calendar";

fn options() -> PublishOptions {
    PublishOptions::persistent(Duration::from_secs(10))
}

mod publish {
    use super::*;

    #[tokio::test]
    async fn publish_appends_to_queue() {
        let broker = MemoryBroker::new();

        broker.publish(QUEUE, b"first", options()).await.unwrap();
        broker.publish(QUEUE, b"second", options()).await.unwrap();

        assert_eq!(broker.len(QUEUE), 2);
        assert_eq!(
            broker.peek_all(QUEUE),
            vec![b"first".to_vec(), b"second".to_vec()]
        );
    }

    #[tokio::test]
    async fn queues_are_independent() {
        let broker = MemoryBroker::new();

        broker.publish(QUEUE, b"work", options()).await.unwrap();
        broker.publish("errors", b"failed", options()).await.unwrap();

        assert_eq!(broker.len(QUEUE), 1);
        assert_eq!(broker.peek_all("errors"), vec![b"failed".to_vec()]);
        assert!(broker.is_empty("unknown"));
    }

    #[tokio::test]
    async fn publish_after_close_fails() {
        let broker = MemoryBroker::new();
        broker.close();

        let result = broker.publish(QUEUE, b"late", options()).await;

        assert!(matches!(result, Err(BrokerError::Closed)));
    }

    #[tokio::test]
    async fn clones_share_queues() {
        let broker = MemoryBroker::new();
        let clone = broker.clone();

        clone.publish(QUEUE, b"shared", options()).await.unwrap();

        assert_eq!(broker.len(QUEUE), 1);
    }
}

mod subscribe {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"a", options()).await.unwrap();
        broker.publish(QUEUE, b"b", options()).await.unwrap();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        let first = sub.next().await.unwrap();
        assert_eq!(first.payload().unwrap(), b"a");
        first.settle(Disposition::Accept).await.unwrap();

        let second = sub.next().await.unwrap();
        assert_eq!(second.payload().unwrap(), b"b");
    }

    #[tokio::test]
    async fn waits_for_publish() {
        let broker = MemoryBroker::new();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        let publisher = broker.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher.publish(QUEUE, b"later", options()).await.unwrap();
        });

        let delivery = sub.next().await.unwrap();
        assert_eq!(delivery.payload().unwrap(), b"later");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn ends_after_close_once_drained() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"last", options()).await.unwrap();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();
        broker.close();

        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn close_wakes_waiting_subscription() {
        let broker = MemoryBroker::new();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        let closer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            closer.close();
        });

        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn delivery_ids_are_unique() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"a", options()).await.unwrap();
        broker.publish(QUEUE, b"b", options()).await.unwrap();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        let first = sub.next().await.unwrap();
        let second = sub.next().await.unwrap();

        assert_ne!(first.id(), second.id());
    }
}

mod settle {
    use super::*;

    #[tokio::test]
    async fn accept_removes_message() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"done", options()).await.unwrap();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        sub.next().await.unwrap().settle(Disposition::Accept).await.unwrap();

        assert!(broker.is_empty(QUEUE));
    }

    #[tokio::test]
    async fn reject_removes_message() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"garbage", options()).await.unwrap();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        sub.next().await.unwrap().settle(Disposition::Reject).await.unwrap();

        assert!(broker.is_empty(QUEUE));
    }

    #[tokio::test]
    async fn release_redelivers_at_head() {
        let broker = MemoryBroker::new();
        broker.publish(QUEUE, b"retry-me", options()).await.unwrap();
        broker.publish(QUEUE, b"behind", options()).await.unwrap();
        let mut sub = broker.subscribe(QUEUE).await.unwrap();

        let delivery = sub.next().await.unwrap();
        let id = delivery.id().to_string();
        delivery.settle(Disposition::Release).await.unwrap();

        let again = sub.next().await.unwrap();
        assert_eq!(again.payload().unwrap(), b"retry-me");
        assert_eq!(again.id(), id);
    }
}

mod disposition {
    use super::*;

    #[test]
    fn display_uses_past_tense() {
        assert_eq!(Disposition::Accept.to_string(), "accepted");
        assert_eq!(Disposition::Reject.to_string(), "rejected");
        assert_eq!(Disposition::Release.to_string(), "released");
    }

    #[test]
    fn persistent_options_set_marker() {
        let opts = PublishOptions::persistent(Duration::from_secs(10));

        assert!(opts.persistent);
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert!(!PublishOptions::transient(Duration::from_secs(1)).persistent);
    }
}
