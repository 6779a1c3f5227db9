// src/pipeline/backfill.rs

//! Scheduled `queue_id` backfill.

use chrono::Utc;
use tracing::info;

use crate::clients::ClientFactory;
use crate::error::Result;
use crate::models::BackfillConfig;
use crate::services::{BackfillSummary, QueueIdBackfill};

/// Run one backfill pass with the function's own credentials.
pub async fn run_backfill(
    clients: &dyn ClientFactory,
    config: &BackfillConfig,
) -> Result<BackfillSummary> {
    let start_time = Utc::now();
    info!(
        "Starting queue_id backfill over {} (last {} days)",
        config.call_details_index, config.number_of_days
    );

    let search = clients.service_search_index().await?;
    let objects = clients.object_store();
    let summary = QueueIdBackfill::new(search.as_ref(), objects.as_ref(), config)
        .run()
        .await?;

    let elapsed = Utc::now() - start_time;
    info!("queue_id backfill finished in {} ms", elapsed.num_milliseconds());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClients, FakeSearch};

    #[tokio::test]
    async fn test_backfill_with_nothing_to_do() {
        let clients = FakeClients::new(FakeSearch::with_hits(vec![]), vec![]);
        let config = BackfillConfig {
            call_details_index: "call-details".into(),
            ..Default::default()
        };

        let summary = run_backfill(&clients, &config).await.unwrap();

        assert_eq!(summary, BackfillSummary::default());
        let requests = clients.search.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, "call-details/_search");
    }
}
