//! Tick publishing tests over the in-memory queue provider.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;

use harvest_broker::QueueManager;
use harvest_core::traits::queue::QueueProvider;
use harvest_pipeline::TickPublisher;

use common::{WORK_QUEUE, pop_envelope, rig};

#[tokio::test]
async fn three_ticks_publish_three_distinct_jobs() -> Result<()> {
    let rig = rig();
    let publisher = TickPublisher::new(Arc::clone(&rig.queue), WORK_QUEUE, "collect");

    let mut ids = HashSet::new();
    for _ in 0..3 {
        ids.insert(publisher.publish_tick().await?);
    }

    assert_eq!(ids.len(), 3);
    assert_eq!(rig.provider.len(WORK_QUEUE), 3);

    for _ in 0..3 {
        let envelope = pop_envelope(&rig.provider, WORK_QUEUE).await;
        assert_eq!(envelope.attempt, 0);
        assert_eq!(envelope.job.job_type, "collect");
        assert!(ids.remove(&envelope.job.id));
    }
    Ok(())
}

#[tokio::test]
async fn failed_tick_is_lost_not_queued_client_side() -> Result<()> {
    let inner = Arc::new(harvest_broker::memory::MemoryQueueProvider::new());
    let outage = Arc::new(common::OutageProvider::new(Arc::clone(&inner)));
    let queue = Arc::new(QueueManager::from_provider(
        Arc::clone(&outage) as Arc<dyn QueueProvider>
    ));
    let publisher = TickPublisher::new(queue, WORK_QUEUE, "collect");

    outage.set_publishes_down(true);
    assert!(publisher.publish_tick().await.is_err());

    // When the broker comes back only the new tick lands; the failed one
    // was never buffered.
    outage.set_publishes_down(false);
    publisher.publish_tick().await?;

    assert_eq!(inner.len(WORK_QUEUE), 1);
    Ok(())
}

#[tokio::test]
async fn job_ids_carry_a_monotonic_sequence() -> Result<()> {
    let rig = rig();
    let publisher = TickPublisher::new(Arc::clone(&rig.queue), WORK_QUEUE, "collect");

    let first = publisher.publish_tick().await?;
    let second = publisher.publish_tick().await?;

    assert!(first.starts_with("job-1-"));
    assert!(second.starts_with("job-2-"));
    Ok(())
}
