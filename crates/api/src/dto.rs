use serde::{Deserialize, Serialize};

/// Body for `POST /api/searches`. Mirrors the original `SearchCreate`
/// Pydantic model: caps the raw batch at 10000 entries, then strips blanks.
#[derive(Debug, Deserialize)]
pub struct CreateSearchRequest {
    pub batch_name: Option<String>,
    pub domains: Vec<String>,
}

impl CreateSearchRequest {
    /// Returns the cleaned domain list, or an error message if the raw batch
    /// is over the cap or ends up empty once blanks are stripped.
    pub fn cleaned_domains(&self) -> Result<Vec<String>, String> {
        if self.domains.len() > 10_000 {
            return Err("maximum 10000 domains per batch".to_string());
        }
        let cleaned: Vec<String> = self
            .domains
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if cleaned.is_empty() {
            return Err("at least one domain is required".to_string());
        }
        Ok(cleaned)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ListSearchesQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListDomainsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListEmailsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn default_limit(q: Option<i64>, default: i64) -> i64 {
    q.unwrap_or(default)
}

pub fn default_offset(q: Option<i64>) -> i64 {
    q.unwrap_or(0)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub message: String,
    pub search_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_domains_strips_blanks_and_whitespace() {
        let req = CreateSearchRequest {
            batch_name: None,
            domains: vec!["  example.com ".to_string(), "".to_string(), "  ".to_string()],
        };
        assert_eq!(req.cleaned_domains().unwrap(), vec!["example.com".to_string()]);
    }

    #[test]
    fn cleaned_domains_rejects_empty_batch() {
        let req = CreateSearchRequest {
            batch_name: None,
            domains: vec!["   ".to_string()],
        };
        assert!(req.cleaned_domains().is_err());
    }

    #[test]
    fn cleaned_domains_rejects_over_cap() {
        let req = CreateSearchRequest {
            batch_name: None,
            domains: (0..10_001).map(|i| format!("d{i}.com")).collect(),
        };
        assert!(req.cleaned_domains().is_err());
    }
}
