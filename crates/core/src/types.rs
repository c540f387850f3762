use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path substrings that bump a discovered link ahead of others at the same
/// depth. Matched as a plain substring of the full link, so e.g. `/about`
/// also matches `/abouts-of-us` — kept as-is, not narrowed to path segments.
pub const PRIORITY_PATH_TOKENS: &[&str] = &[
    "/contact",
    "/about",
    "/team",
    "/careers",
    "/jobs",
    "/faq",
    "/privacy",
    "/support",
    "/legal",
    "/terms",
    "/company",
    "/staff",
    "/people",
    "/leadership",
    "/contact-us",
    "/about-us",
    "/our-team",
    "/meet-the-team",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl SearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStatus::Pending => "pending",
            SearchStatus::InProgress => "in_progress",
            SearchStatus::Paused => "paused",
            SearchStatus::Completed => "completed",
            SearchStatus::Failed => "failed",
            SearchStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => SearchStatus::Pending,
            "in_progress" => SearchStatus::InProgress,
            "paused" => SearchStatus::Paused,
            "completed" => SearchStatus::Completed,
            "failed" => SearchStatus::Failed,
            "cancelled" => SearchStatus::Cancelled,
            other => return Err(format!("unknown search status: {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Pending,
    Crawling,
    Completed,
    Failed,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Pending => "pending",
            DomainStatus::Crawling => "crawling",
            DomainStatus::Completed => "completed",
            DomainStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => DomainStatus::Pending,
            "crawling" => DomainStatus::Crawling,
            "completed" => DomainStatus::Completed,
            "failed" => DomainStatus::Failed,
            other => return Err(format!("unknown domain status: {other}")),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Search {
    pub id: i64,
    pub batch_name: Option<String>,
    pub total_domains: i64,
    pub status: SearchStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub search_id: i64,
    pub domain: String,
    pub url: String,
    pub status: DomainStatus,
    pub pages_crawled: i64,
    pub emails_found: i64,
    pub error_message: Option<String>,
    pub worker_id: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub domain_id: i64,
    pub url: String,
    pub status_code: i32,
    pub content_type: Option<String>,
    pub error_message: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub id: i64,
    pub domain_id: i64,
    pub page_id: i64,
    pub raw_email: String,
    pub normalized_email: String,
    pub extracted_at: DateTime<Utc>,
}

/// Column size limits enforced in Rust before a row ever reaches storage,
/// mirroring the original's `url[:1000]` / `raw[:255]` truncation.
pub const MAX_URL_LEN: usize = 1000;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_ERROR_LEN: usize = 500;

pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            SearchStatus::Pending,
            SearchStatus::InProgress,
            SearchStatus::Paused,
            SearchStatus::Completed,
            SearchStatus::Failed,
            SearchStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<SearchStatus>().unwrap(), s);
        }
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate_chars(s, 5);
        assert_eq!(t.chars().count(), 5);
    }
}
