//! Tests for the shard watcher and the dropped-transaction reaper
//!
//! Drives both loops tick by tick over the in-memory harness.

#[cfg(test)]
mod tests {
    use crate::{
        BatchStatus, CorrelationEntry, ItemStatus, ObservedStatus,
        gateway::mock::MockGateway,
        registry::CorrelationIndex,
        state::SharedCache,
        test_support::{Harness, SENDER, sample_request, sample_tx, tx_hash},
    };
    use chrono::{DateTime, Duration, Utc};
    use std::time::Duration as StdDuration;

    /// Helper function to submit a batch through the orchestrator
    async fn submit(harness: &Harness, id: &str, groups: Vec<Vec<u64>>) {
        let transactions = groups
            .into_iter()
            .map(|group| group.into_iter().map(sample_tx).collect())
            .collect();
        harness
            .orchestrator
            .submit_batch(sample_request(id, transactions), None)
            .await
            .unwrap();
    }

    /// Helper function to build a finalized observation of a sample transaction
    fn observed(nonce: u64, status: ObservedStatus) -> crate::ObservedTransaction {
        MockGateway::observed(&sample_tx(nonce), status)
    }

    async fn submitted_at(harness: &Harness, nonce: u64) -> DateTime<Utc> {
        harness
            .correlation
            .get(&tx_hash(nonce))
            .await
            .unwrap()
            .unwrap()
            .submitted_at
    }

    #[tokio::test]
    async fn test_group_observed_in_one_tick_notifies_once() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1, 2]]).await;
        harness.gateway.push_block(
            0,
            5,
            vec![observed(1, ObservedStatus::Success), observed(2, ObservedStatus::Success)],
        );

        assert!(harness.watcher().tick().await);

        let stored = harness.stored("b1").await.unwrap();
        assert_eq!(stored.status, BatchStatus::Success);

        let events = harness.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].batch_id, "b1");
        assert_eq!(events[0].tx_hashes, vec![tx_hash(1), tx_hash(2)]);
        assert!(harness.correlation.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_group_observed_across_ticks_notifies_twice() {
        let harness = Harness::new();
        let watcher = harness.watcher();
        submit(&harness, "b1", vec![vec![1, 2]]).await;

        harness
            .gateway
            .push_block(0, 5, vec![observed(1, ObservedStatus::Success)]);
        watcher.tick().await;
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Pending);

        harness
            .gateway
            .push_block(0, 6, vec![observed(2, ObservedStatus::Success)]);
        watcher.tick().await;

        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Success);
        let events = harness.publisher.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].tx_hashes, vec![tx_hash(2)]);
    }

    #[tokio::test]
    async fn test_watcher_cascades_into_failing_group() {
        let harness = Harness::new();
        harness.gateway.reject(&sample_tx(2), "invalid signature");
        submit(&harness, "b1", vec![vec![1], vec![2]]).await;
        harness
            .gateway
            .push_block(1, 3, vec![observed(1, ObservedStatus::Success)]);

        harness.watcher().tick().await;

        let stored = harness.stored("b1").await.unwrap();
        assert_eq!(stored.status, BatchStatus::Invalid);
        assert_eq!(stored.groups[1].items[0].error.as_deref(), Some("invalid signature"));
        assert!(
            harness
                .publisher
                .events()
                .iter()
                .any(|event| event.tx_hashes == vec![tx_hash(2)])
        );
    }

    #[tokio::test]
    async fn test_watcher_follows_network_assigned_hash() {
        let harness = Harness::new();
        let assigned = "0e".repeat(32);
        harness.gateway.assign_hash(&sample_tx(1), &assigned);
        submit(&harness, "b1", vec![vec![1], vec![2]]).await;

        let mut landed = observed(1, ObservedStatus::Success);
        landed.hash = assigned.clone();
        harness.gateway.push_block(0, 4, vec![landed]);

        harness.watcher().tick().await;

        let stored = harness.stored("b1").await.unwrap();
        assert_eq!(stored.groups[0].items[0].status, ItemStatus::Success);
        assert_eq!(harness.gateway.submitted(), vec![assigned.clone(), tx_hash(2)]);
        assert_eq!(harness.publisher.events()[0].tx_hashes, vec![assigned.clone()]);
        assert!(harness.correlation.get(&assigned).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watcher_notifies_when_next_group_is_not_indexed() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1], vec![2]]).await;
        harness
            .gateway
            .push_block(0, 2, vec![observed(1, ObservedStatus::Success)]);

        harness.cache.fail_writes_on("pendingtransaction:");
        harness.watcher().tick().await;

        let events = harness.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tx_hashes, vec![tx_hash(1)]);
        assert_eq!(harness.gateway.submitted(), vec![tx_hash(1), tx_hash(2)]);
        assert_eq!(harness.checkpoints.get(0).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_failed_observation_invalidates_batch() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1], vec![2]]).await;
        harness
            .gateway
            .push_block(0, 1, vec![observed(1, ObservedStatus::Fail)]);

        harness.watcher().tick().await;

        let stored = harness.stored("b1").await.unwrap();
        assert_eq!(stored.status, BatchStatus::Invalid);
        assert_eq!(stored.groups[0].items[0].status, ItemStatus::Invalid);
        assert_eq!(harness.gateway.submitted(), vec![tx_hash(1)]);
    }

    #[tokio::test]
    async fn test_pending_observation_keeps_entry() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness
            .gateway
            .push_block(0, 1, vec![observed(1, ObservedStatus::Pending)]);

        harness.watcher().tick().await;

        assert!(harness.correlation.get(&tx_hash(1)).await.unwrap().is_some());
        assert!(harness.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_transactions_are_ignored() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness
            .gateway
            .push_block(0, 1, vec![observed(40, ObservedStatus::Success)]);

        harness.watcher().tick().await;

        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Pending);
        assert!(harness.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_resumes_after_restart() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1, 2]]).await;
        harness.checkpoints.set(0, 3).await.unwrap();
        harness
            .gateway
            .push_block(0, 4, vec![observed(1, ObservedStatus::Success)]);
        harness
            .gateway
            .push_block(0, 5, vec![observed(2, ObservedStatus::Success)]);

        harness.watcher().tick().await;
        assert_eq!(harness.checkpoints.get(0).await.unwrap(), Some(5));
        assert_eq!(harness.publisher.events().len(), 1);

        // A fresh watcher reads nothing twice
        harness.watcher().tick().await;
        assert_eq!(harness.publisher.events().len(), 1);
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Success);
    }

    #[tokio::test]
    async fn test_look_behind_bounds_catch_up() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1, 2]]).await;
        harness.checkpoints.set(0, 10).await.unwrap();
        harness
            .gateway
            .push_block(0, 350, vec![observed(1, ObservedStatus::Success)]);
        harness
            .gateway
            .push_block(0, 450, vec![observed(2, ObservedStatus::Success)]);
        harness.gateway.set_latest(0, 500);

        harness.watcher().tick().await;

        assert_eq!(harness.checkpoints.get(0).await.unwrap(), Some(500));
        assert!(harness.correlation.get(&tx_hash(1)).await.unwrap().is_some());
        assert!(harness.correlation.get(&tx_hash(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_tick_starts_at_latest_block() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness
            .gateway
            .push_block(0, 7, vec![observed(1, ObservedStatus::Success)]);
        harness.gateway.set_latest(0, 8);

        harness.watcher().tick().await;

        assert_eq!(harness.checkpoints.get(0).await.unwrap(), Some(8));
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let harness = Harness::new();
        let watcher = harness.watcher();

        let guard = watcher.try_begin().unwrap();
        assert!(!watcher.tick().await);
        assert!(watcher.try_begin().is_none());

        drop(guard);
        assert!(watcher.tick().await);
    }

    #[tokio::test]
    async fn test_failing_shard_does_not_advance_checkpoint() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness.checkpoints.set(0, 1).await.unwrap();
        harness
            .gateway
            .push_block(0, 2, vec![observed(1, ObservedStatus::Success)]);

        harness.cache.fail_on("pendingtransaction:");
        assert!(harness.watcher().tick().await);
        assert_eq!(harness.checkpoints.get(0).await.unwrap(), Some(1));

        *harness.cache.failing_prefix.lock().unwrap() = None;
        harness.watcher().tick().await;
        assert_eq!(harness.checkpoints.get(0).await.unwrap(), Some(2));
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Success);
    }

    #[tokio::test]
    async fn test_drop_threshold_boundary() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        let submitted = submitted_at(&harness, 1).await;
        let reaper = harness.reaper();

        let early = submitted + Duration::minutes(9) + Duration::seconds(59);
        assert_eq!(reaper.sweep_at(early).await, Some(0));
        assert!(harness.correlation.get(&tx_hash(1)).await.unwrap().is_some());

        assert_eq!(reaper.sweep_at(submitted + Duration::minutes(10)).await, Some(1));
        let stored = harness.stored("b1").await.unwrap();
        assert_eq!(stored.status, BatchStatus::Dropped);
        assert_eq!(stored.groups[0].items[0].status, ItemStatus::Dropped);
        assert!(harness.correlation.get(&tx_hash(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drops_are_grouped_per_batch() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1, 2], vec![3]]).await;
        let later = submitted_at(&harness, 1).await + Duration::minutes(15);

        harness.reaper().sweep_at(later).await;

        let events = harness.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tx_hashes.len(), 2);
        assert!(!harness.gateway.submitted().contains(&tx_hash(3)));
    }

    #[tokio::test]
    async fn test_missed_final_transaction_is_reconciled() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness.gateway.know(observed(1, ObservedStatus::Success));
        let later = submitted_at(&harness, 1).await + Duration::minutes(11);

        assert_eq!(harness.reaper().sweep_at(later).await, Some(1));
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Success);
    }

    #[tokio::test]
    async fn test_known_but_unfinished_transaction_is_kept() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness.gateway.know(observed(1, ObservedStatus::Pending));
        let later = submitted_at(&harness, 1).await + Duration::minutes(11);

        assert_eq!(harness.reaper().sweep_at(later).await, Some(0));
        assert!(harness.correlation.get(&tx_hash(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_entry() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        *harness.gateway.fail_lookups.lock().unwrap() = true;
        let later = submitted_at(&harness, 1).await + Duration::minutes(11);

        assert_eq!(harness.reaper().sweep_at(later).await, Some(0));
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_held_lease_skips_sweep() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        harness
            .cache
            .set("lock:dropped-reaper", "other-instance", Some(StdDuration::from_secs(60)))
            .await
            .unwrap();
        let later = submitted_at(&harness, 1).await + Duration::minutes(11);

        assert_eq!(harness.reaper().sweep_at(later).await, None);
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_leaked_entry_of_terminal_item_is_cleaned() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1, 2]]).await;
        let hash = tx_hash(1);
        harness
            .orchestrator
            .reconcile(&hash, "b1", SENDER, ItemStatus::Success)
            .await
            .unwrap();
        let entry = CorrelationEntry {
            batch_id: "b1".to_string(),
            address: SENDER.to_string(),
            submitted_at: Utc::now() - Duration::hours(1),
        };
        harness.correlation.insert(&hash, &entry).await.unwrap();

        harness.reaper().sweep_at(Utc::now()).await;

        let stored = harness.stored("b1").await.unwrap();
        assert_eq!(stored.groups[0].items[0].status, ItemStatus::Success);
        assert!(harness.correlation.get(&hash).await.unwrap().is_none());
        assert!(harness.publisher.events().iter().all(|event| !event.tx_hashes.contains(&hash)));
    }

    #[tokio::test]
    async fn test_entry_without_timestamp_is_eligible() {
        let harness = Harness::new();
        submit(&harness, "b1", vec![vec![1]]).await;
        let key = CorrelationIndex::key(&tx_hash(1));
        harness.cache.set(&key, &format!("b1;{SENDER}"), None).await.unwrap();

        assert_eq!(harness.reaper().sweep_at(Utc::now()).await, Some(1));
        assert_eq!(harness.stored("b1").await.unwrap().status, BatchStatus::Dropped);
    }
}
