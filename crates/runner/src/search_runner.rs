use anyhow::Result;
use futures::future::join_all;
use mailharvest_core::Domain;
use mailharvest_fetch::PageFetcher;
use mailharvest_storage::Storage;
use tracing::{error, info};

/// Fans a search's pending domains out across a concurrency pool and drives
/// search-level state transitions.
pub async fn run_search(
    storage: &Storage,
    fetcher: &PageFetcher,
    search_id: i64,
    worker_id: &str,
    max_concurrent: usize,
    max_depth: u32,
) -> Result<()> {
    match run(storage, fetcher, search_id, worker_id, max_concurrent, max_depth).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(search_id, error = %e, "search failed");
            storage.fail_search(search_id).await?;
            Ok(())
        }
    }
}

async fn run(
    storage: &Storage,
    fetcher: &PageFetcher,
    search_id: i64,
    worker_id: &str,
    max_concurrent: usize,
    max_depth: u32,
) -> Result<()> {
    storage.start_search(search_id).await?;

    let domains = storage.pending_domains_for_search(search_id).await?;
    if domains.is_empty() {
        info!(search_id, "no pending domains; leaving search in_progress");
        return Ok(());
    }

    info!(search_id, domains = domains.len(), "starting search");

    for batch in domains.chunks(max_concurrent) {
        let crawls = batch
            .iter()
            .map(|domain: &Domain| crawl_one(storage, fetcher, domain, worker_id, max_depth));
        join_all(crawls).await;
    }

    storage.complete_search(search_id).await?;
    info!(search_id, "search completed");
    Ok(())
}

async fn crawl_one(
    storage: &Storage,
    fetcher: &PageFetcher,
    domain: &Domain,
    worker_id: &str,
    max_depth: u32,
) {
    mailharvest_crawler::crawl(
        storage,
        fetcher,
        domain.id,
        &domain.url,
        &domain.domain,
        worker_id,
        max_depth,
    )
    .await;
}
