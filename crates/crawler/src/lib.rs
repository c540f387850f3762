use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;
use futures::future::join_all;
use mailharvest_core::PRIORITY_PATH_TOKENS;
use mailharvest_fetch::PageFetcher;
use mailharvest_storage::Storage;
use tracing::{debug, error, warn};
use url::Url;

/// Entries popped from the BFS queue in one go.
const BATCH_SIZE: usize = 50;

struct StepOutcome {
    priority_links: Vec<String>,
    other_links: Vec<String>,
    emails: Vec<(String, String, i64)>,
}

/// Crawls one domain with a bounded BFS. Never propagates an error: on any
/// uncaught failure inside claim/BFS/flush, the domain is marked `failed`
/// with a truncated message instead.
pub async fn crawl(
    storage: &Storage,
    fetcher: &PageFetcher,
    domain_id: i64,
    start_url: &str,
    base_host: &str,
    worker_id: &str,
    max_depth: u32,
) {
    match run(storage, fetcher, domain_id, start_url, base_host, worker_id, max_depth).await {
        Ok((pages_crawled, emails_found)) => {
            if let Err(e) = storage
                .complete_domain(domain_id, pages_crawled, emails_found)
                .await
            {
                error!(domain_id, error = %e, "failed to record domain completion");
            }
        }
        Err(e) => {
            warn!(domain_id, error = %e, "domain crawl failed");
            if let Err(fail_err) = storage.fail_domain(domain_id, &e.to_string()).await {
                error!(domain_id, error = %fail_err, "failed to record domain failure");
            }
        }
    }
}

async fn run(
    storage: &Storage,
    fetcher: &PageFetcher,
    domain_id: i64,
    start_url: &str,
    base_host: &str,
    worker_id: &str,
    max_depth: u32,
) -> Result<(i64, i64)> {
    storage.claim_domain(domain_id, worker_id).await?;

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(u32, String)> = VecDeque::new();
    queue.push_back((0, start_url.to_string()));
    let mut emails: HashMap<String, (String, String, i64)> = HashMap::new();

    while !queue.is_empty() {
        let mut to_process = Vec::with_capacity(BATCH_SIZE);
        while to_process.len() < BATCH_SIZE {
            let Some((depth, url)) = queue.pop_front() else {
                break;
            };
            if depth > max_depth || visited.contains(&url) {
                continue;
            }
            visited.insert(url.clone());
            to_process.push((depth, url));
        }
        if to_process.is_empty() {
            continue;
        }

        let depths: Vec<u32> = to_process.iter().map(|(depth, _)| *depth).collect();
        let futures = to_process.into_iter().map(|(depth, url)| {
            process_one(storage, fetcher, domain_id, base_host, depth, url, max_depth)
        });
        let results = join_all(futures).await;

        for (depth, outcome) in depths.into_iter().zip(results) {
            let child_depth = depth + 1;
            for (normalized, raw, page_id) in outcome.emails {
                emails.entry(normalized).or_insert((raw, String::new(), page_id));
            }
            for link in outcome.priority_links {
                if !visited.contains(&link) {
                    queue.push_back((child_depth, link));
                }
            }
            for link in outcome.other_links {
                if !visited.contains(&link) {
                    queue.push_back((child_depth, link));
                }
            }
        }
    }

    let flush_entries: Vec<(String, String, i64)> = emails
        .into_iter()
        .map(|(normalized, (raw, _page_url, page_id))| (normalized, raw, page_id))
        .collect();
    let emails_found = flush_entries.len() as i64;

    if let Err(e) = storage.insert_emails_batch(domain_id, &flush_entries).await {
        error!(domain_id, error = %e, "email batch insert failed");
    }

    Ok((visited.len() as i64, emails_found))
}

async fn process_one(
    storage: &Storage,
    fetcher: &PageFetcher,
    domain_id: i64,
    base_host: &str,
    depth: u32,
    url: String,
    max_depth: u32,
) -> StepOutcome {
    let empty = StepOutcome {
        priority_links: Vec::new(),
        other_links: Vec::new(),
        emails: Vec::new(),
    };

    let Ok(parsed_url) = Url::parse(&url) else {
        debug!(%url, "not a valid URL, skipping");
        return empty;
    };

    let outcome = fetcher.fetch(&parsed_url).await;
    let error_message = if outcome.body.is_some() {
        None
    } else {
        Some("Failed to fetch")
    };

    let page_id = match storage
        .insert_page(
            domain_id,
            &url,
            outcome.status as i32,
            outcome.content_type.as_deref(),
            error_message,
        )
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(%url, error = %e, "page insert failed");
            return empty;
        }
    };

    let Some(body) = outcome.body else {
        return empty;
    };

    let parsed = mailharvest_parser::parse_page(&body, &parsed_url, base_host);
    let entry_emails: Vec<(String, String, i64)> = parsed
        .emails
        .into_iter()
        .map(|(normalized, raw)| (normalized, raw, page_id))
        .collect();

    if depth >= max_depth {
        return StepOutcome {
            priority_links: Vec::new(),
            other_links: Vec::new(),
            emails: entry_emails,
        };
    }

    let (priority_links, other_links) = partition_links(parsed.links);

    StepOutcome {
        priority_links,
        other_links,
        emails: entry_emails,
    }
}

/// Splits discovered links into priority-path and other links, preserving
/// relative order within each group.
fn partition_links(links: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut priority_links = Vec::new();
    let mut other_links = Vec::new();
    for link in links {
        let lower = link.to_ascii_lowercase();
        if PRIORITY_PATH_TOKENS.iter().any(|token| lower.contains(token)) {
            priority_links.push(link);
        } else {
            other_links.push(link);
        }
    }
    (priority_links, other_links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_links_puts_priority_paths_first() {
        let links = vec![
            "https://a.test/blog/2024".to_string(),
            "https://a.test/contact".to_string(),
            "https://a.test/about".to_string(),
        ];
        let (priority, other) = partition_links(links);
        assert_eq!(
            priority,
            vec![
                "https://a.test/contact".to_string(),
                "https://a.test/about".to_string()
            ]
        );
        assert_eq!(other, vec!["https://a.test/blog/2024".to_string()]);
    }

    #[test]
    fn partition_links_matches_substrings_case_insensitively() {
        let links = vec!["https://a.test/Abouts-Of-Us".to_string()];
        let (priority, other) = partition_links(links);
        assert_eq!(priority, vec!["https://a.test/Abouts-Of-Us".to_string()]);
        assert!(other.is_empty());
    }
}
