use std::time::Duration;

use mailharvest_fetch::PageFetcher;
use mailharvest_storage::Storage;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::search_runner;

/// Long-lived loop that claims the next pending search and hands it to the
/// Search Runner. Never terminates except on a shutdown signal.
pub async fn run(
    storage: Storage,
    fetcher: PageFetcher,
    worker_id: String,
    poll_interval: Duration,
    max_concurrent: usize,
    max_depth: u32,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!(worker_id, "worker loop starting");
    loop {
        if shutdown.try_recv().is_ok() {
            info!("shutdown signal received, stopping worker loop");
            break;
        }

        match storage.claim_next_search_id().await {
            Ok(Some(search_id)) => {
                info!(search_id, worker_id, "claimed search");
                if let Err(e) = search_runner::run_search(
                    &storage,
                    &fetcher,
                    search_id,
                    &worker_id,
                    max_concurrent,
                    max_depth,
                )
                .await
                {
                    error!(search_id, error = %e, "search runner error");
                    sleep_with_shutdown(poll_interval, &mut shutdown).await;
                    continue;
                }
                sleep_with_shutdown(Duration::from_secs(1), &mut shutdown).await;
            }
            Ok(None) => {
                sleep_with_shutdown(poll_interval, &mut shutdown).await;
            }
            Err(e) => {
                error!(error = %e, "worker loop poll error");
                sleep_with_shutdown(poll_interval, &mut shutdown).await;
            }
        }
    }
}

async fn sleep_with_shutdown(duration: Duration, shutdown: &mut broadcast::Receiver<()>) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shutdown.recv() => {}
    }
}
