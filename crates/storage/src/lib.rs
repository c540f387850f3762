use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tracing::info;

use mailharvest_core::{
    truncate_chars, Domain, DomainStatus, Search, SearchStatus, MAX_ERROR_LEN, MAX_URL_LEN,
};

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

/// Transactional facade over `searches`/`domains`/`pages`/`emails`.
/// Auto-commit, pool of up to 100 connections, utf8mb4.
#[derive(Clone)]
pub struct Storage {
    pool: MySqlPool,
}

impl Storage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "connected to mysql");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await?;
        info!("migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    // ---- Searches ----------------------------------------------------

    /// Creates a search with one Domain row per submitted domain,
    /// un-deduplicated, `url = "https://" + domain`.
    pub async fn create_search(&self, batch_name: Option<&str>, domains: &[String]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO searches (batch_name, total_domains, status) VALUES (?, ?, 'pending')",
        )
        .bind(batch_name)
        .bind(domains.len() as i64)
        .execute(&mut *tx)
        .await?;
        let search_id = result.last_insert_id() as i64;

        for domain in domains {
            let url = format!("https://{domain}");
            sqlx::query(
                "INSERT INTO domains (search_id, domain, url, status) VALUES (?, ?, ?, 'pending')",
            )
            .bind(search_id)
            .bind(domain)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(search_id)
    }

    pub async fn get_search(&self, search_id: i64) -> Result<Option<Search>> {
        let row = sqlx::query_as::<_, SearchRow>(
            "SELECT id, batch_name, total_domains, status, created_at, started_at, completed_at
             FROM searches WHERE id = ?",
        )
        .bind(search_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_searches(
        &self,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Search>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, SearchRow>(
                    "SELECT id, batch_name, total_domains, status, created_at, started_at, completed_at
                     FROM searches WHERE status = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
                )
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SearchRow>(
                    "SELECT id, batch_name, total_domains, status, created_at, started_at, completed_at
                     FROM searches ORDER BY created_at DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Prefers the oldest `pending` search; else the oldest `in_progress`
    /// search that still has a `pending` domain.
    pub async fn claim_next_search_id(&self) -> Result<Option<i64>> {
        let pending: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM searches WHERE status = 'pending' ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        if let Some((id,)) = pending {
            return Ok(Some(id));
        }

        let in_progress: Option<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT s.id FROM searches s
             JOIN domains d ON d.search_id = s.id
             WHERE s.status = 'in_progress' AND d.status = 'pending'
             ORDER BY s.created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(in_progress.map(|(id,)| id))
    }

    pub async fn start_search(&self, search_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE searches SET status = 'in_progress', started_at = NOW() WHERE id = ?",
        )
        .bind(search_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn complete_search(&self, search_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE searches SET status = 'completed', completed_at = NOW() WHERE id = ?",
        )
        .bind(search_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail_search(&self, search_id: i64) -> Result<()> {
        sqlx::query("UPDATE searches SET status = 'failed' WHERE id = ?")
            .bind(search_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `true` if the row existed and the transition applied.
    pub async fn pause_search(&self, search_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE searches SET status = 'paused' WHERE id = ? AND status = 'in_progress'",
        )
        .bind(search_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn resume_search(&self, search_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE searches SET status = 'in_progress' WHERE id = ? AND status = 'paused'",
        )
        .bind(search_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Forces the search to `cancelled` and clears locks on any `crawling`
    /// domain. Returns `false` if the search didn't exist (404).
    pub async fn cancel_search(&self, search_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE searches SET status = 'cancelled' WHERE id = ?")
            .bind(search_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE domains SET worker_id = NULL, locked_at = NULL
             WHERE search_id = ? AND status = 'crawling'",
        )
        .bind(search_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn search_statistics(&self, search_id: i64) -> Result<Option<SearchStatistics>> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            "SELECT
                s.id AS search_id,
                s.status AS status,
                s.total_domains AS total_domains,
                COUNT(DISTINCT d.id) AS domains_created,
                SUM(CASE WHEN d.status = 'completed' THEN 1 ELSE 0 END) AS domains_completed,
                SUM(CASE WHEN d.status = 'failed' THEN 1 ELSE 0 END) AS domains_failed,
                SUM(CASE WHEN d.status = 'pending' THEN 1 ELSE 0 END) AS domains_pending,
                SUM(CASE WHEN d.status = 'crawling' THEN 1 ELSE 0 END) AS domains_crawling,
                COALESCE(SUM(d.pages_crawled), 0) AS total_pages,
                COALESCE(SUM(d.emails_found), 0) AS total_emails,
                TIMESTAMPDIFF(SECOND, s.started_at, COALESCE(s.completed_at, NOW())) AS duration_secs
             FROM searches s
             LEFT JOIN domains d ON d.search_id = s.id
             WHERE s.id = ?
             GROUP BY s.id, s.status, s.total_domains, s.started_at, s.completed_at",
        )
        .bind(search_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    // ---- Domains -------------------------------------------------------

    pub async fn pending_domains_for_search(&self, search_id: i64) -> Result<Vec<Domain>> {
        let rows = sqlx::query_as::<_, DomainRow>(
            "SELECT id, search_id, domain, url, status, pages_crawled, emails_found,
                    error_message, worker_id, locked_at, updated_at
             FROM domains WHERE search_id = ? AND status = 'pending' ORDER BY id ASC",
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_domains_for_search(
        &self,
        search_id: i64,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Domain>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, DomainRow>(
                    "SELECT id, search_id, domain, url, status, pages_crawled, emails_found,
                            error_message, worker_id, locked_at, updated_at
                     FROM domains WHERE search_id = ? AND status = ? ORDER BY id ASC LIMIT ? OFFSET ?",
                )
                .bind(search_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DomainRow>(
                    "SELECT id, search_id, domain, url, status, pages_crawled, emails_found,
                            error_message, worker_id, locked_at, updated_at
                     FROM domains WHERE search_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
                )
                .bind(search_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Transitions a Domain to `crawling`, setting `worker_id`/`locked_at`.
    /// Optimistic: does not re-check current status.
    pub async fn claim_domain(&self, domain_id: i64, worker_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE domains SET status = 'crawling', worker_id = ?, locked_at = NOW()
             WHERE id = ?",
        )
        .bind(worker_id)
        .bind(domain_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn complete_domain(
        &self,
        domain_id: i64,
        pages_crawled: i64,
        emails_found: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE domains SET status = 'completed', pages_crawled = ?, emails_found = ?,
                    worker_id = NULL, locked_at = NULL
             WHERE id = ?",
        )
        .bind(pages_crawled)
        .bind(emails_found)
        .bind(domain_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail_domain(&self, domain_id: i64, error: &str) -> Result<()> {
        let truncated = truncate_chars(error, MAX_ERROR_LEN);
        sqlx::query(
            "UPDATE domains SET status = 'failed', error_message = ?,
                    worker_id = NULL, locked_at = NULL
             WHERE id = ?",
        )
        .bind(truncated)
        .bind(domain_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- Pages -----------------------------------------------------------

    pub async fn insert_page(
        &self,
        domain_id: i64,
        url: &str,
        status_code: i32,
        content_type: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<i64> {
        let url = truncate_chars(url, MAX_URL_LEN);
        let result = sqlx::query(
            "INSERT INTO pages (domain_id, url, status_code, content_type, error_message)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(domain_id)
        .bind(url)
        .bind(status_code)
        .bind(content_type)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id() as i64)
    }

    // ---- Emails ------------------------------------------------------

    /// Batch inserts with duplicate suppression on `(domain_id,
    /// normalized_email)` — re-insertions must not error.
    pub async fn insert_emails_batch(
        &self,
        domain_id: i64,
        entries: &[(String, String, i64)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for (normalized, raw, page_id) in entries {
            let raw = truncate_chars(raw, mailharvest_core::MAX_EMAIL_LEN);
            let normalized = truncate_chars(normalized, mailharvest_core::MAX_EMAIL_LEN);
            sqlx::query(
                "INSERT IGNORE INTO emails (domain_id, page_id, raw_email, normalized_email)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(domain_id)
            .bind(page_id)
            .bind(raw)
            .bind(normalized)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_emails_for_search(
        &self,
        search_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EmailWithContext>> {
        let rows = sqlx::query_as::<_, EmailWithContextRow>(
            "SELECT e.id, d.domain, p.url AS page_url, e.raw_email, e.normalized_email, e.extracted_at
             FROM emails e
             JOIN domains d ON d.id = e.domain_id
             JOIN pages p ON p.id = e.page_id
             WHERE d.search_id = ?
             ORDER BY e.extracted_at DESC LIMIT ? OFFSET ?",
        )
        .bind(search_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn list_emails_for_domain(&self, domain_id: i64) -> Result<Vec<EmailWithContext>> {
        let rows = sqlx::query_as::<_, EmailWithContextRow>(
            "SELECT e.id, d.domain, p.url AS page_url, e.raw_email, e.normalized_email, e.extracted_at
             FROM emails e
             JOIN domains d ON d.id = e.domain_id
             JOIN pages p ON p.id = e.page_id
             WHERE e.domain_id = ?
             ORDER BY e.extracted_at DESC",
        )
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    id: i64,
    batch_name: Option<String>,
    total_domains: i64,
    status: String,
    created_at: NaiveDateTime,
    started_at: Option<NaiveDateTime>,
    completed_at: Option<NaiveDateTime>,
}

impl From<SearchRow> for Search {
    fn from(r: SearchRow) -> Self {
        Search {
            id: r.id,
            batch_name: r.batch_name,
            total_domains: r.total_domains,
            status: SearchStatus::from_str(&r.status).unwrap_or(SearchStatus::Pending),
            created_at: to_utc(r.created_at),
            started_at: r.started_at.map(to_utc),
            completed_at: r.completed_at.map(to_utc),
        }
    }
}

#[derive(sqlx::FromRow)]
struct DomainRow {
    id: i64,
    search_id: i64,
    domain: String,
    url: String,
    status: String,
    pages_crawled: i64,
    emails_found: i64,
    error_message: Option<String>,
    worker_id: Option<String>,
    locked_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}

impl From<DomainRow> for Domain {
    fn from(r: DomainRow) -> Self {
        Domain {
            id: r.id,
            search_id: r.search_id,
            domain: r.domain,
            url: r.url,
            status: DomainStatus::from_str(&r.status).unwrap_or(DomainStatus::Pending),
            pages_crawled: r.pages_crawled,
            emails_found: r.emails_found,
            error_message: r.error_message,
            worker_id: r.worker_id,
            locked_at: r.locked_at.map(to_utc),
            updated_at: to_utc(r.updated_at),
        }
    }
}

/// Email joined with its owning domain name and source page URL, matching
/// the original API's flattened email response shape.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EmailWithContext {
    pub id: i64,
    pub domain: String,
    pub page_url: String,
    pub raw_email: String,
    pub normalized_email: String,
    pub extracted_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct EmailWithContextRow {
    id: i64,
    domain: String,
    page_url: String,
    raw_email: String,
    normalized_email: String,
    extracted_at: NaiveDateTime,
}

impl From<EmailWithContextRow> for EmailWithContext {
    fn from(r: EmailWithContextRow) -> Self {
        EmailWithContext {
            id: r.id,
            domain: r.domain,
            page_url: r.page_url,
            raw_email: r.raw_email,
            normalized_email: r.normalized_email,
            extracted_at: to_utc(r.extracted_at),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchStatistics {
    pub search_id: i64,
    pub status: String,
    pub total_domains: i64,
    pub domains_created: i64,
    pub domains_completed: i64,
    pub domains_failed: i64,
    pub domains_pending: i64,
    pub domains_crawling: i64,
    pub total_pages: i64,
    pub total_emails: i64,
    pub duration_secs: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct StatisticsRow {
    search_id: i64,
    status: String,
    total_domains: i64,
    domains_created: i64,
    domains_completed: Option<i64>,
    domains_failed: Option<i64>,
    domains_pending: Option<i64>,
    domains_crawling: Option<i64>,
    total_pages: i64,
    total_emails: i64,
    duration_secs: Option<i64>,
}

impl From<StatisticsRow> for SearchStatistics {
    fn from(r: StatisticsRow) -> Self {
        SearchStatistics {
            search_id: r.search_id,
            status: r.status,
            total_domains: r.total_domains,
            domains_created: r.domains_created,
            domains_completed: r.domains_completed.unwrap_or(0),
            domains_failed: r.domains_failed.unwrap_or(0),
            domains_pending: r.domains_pending.unwrap_or(0),
            domains_crawling: r.domains_crawling.unwrap_or(0),
            total_pages: r.total_pages,
            total_emails: r.total_emails,
            duration_secs: r.duration_secs,
        }
    }
}
