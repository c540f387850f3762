use url::Url;

/// Case-insensitive path suffixes that are never worth fetching.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".css", ".js", ".ico", ".svg", ".zip", ".mp4",
    ".mp3", ".avi", ".mov", ".wmv", ".flv", ".webm", ".doc", ".docx", ".xls", ".xlsx", ".ppt",
    ".pptx", ".exe", ".dmg", ".apk", ".deb", ".rpm",
];

/// Normalizes a URL string: prepends `https://` if no scheme is present,
/// lowercases the host, strips a leading `www.`, strips a trailing slash
/// from the path (substituting `/` if the path becomes empty), and discards
/// query and fragment. Returns the input unchanged if it doesn't parse.
pub fn canonicalize(raw: &str) -> String {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let Ok(mut url) = Url::parse(&with_scheme) else {
        return raw.to_string();
    };

    let Some(host) = url.host_str() else {
        return raw.to_string();
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if url.set_host(Some(&host)).is_err() {
        return raw.to_string();
    }

    let path = url.path();
    let trimmed = path.trim_end_matches('/');
    let new_path = if trimmed.is_empty() { "/" } else { trimmed };
    url.set_path(new_path);

    url.set_query(None);
    url.set_fragment(None);

    url.to_string()
}

/// Lowercase host with a leading `www.` removed; empty string on failure.
pub fn host_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => match u.host_str() {
            Some(h) => {
                let h = h.to_ascii_lowercase();
                h.strip_prefix("www.").unwrap_or(&h).to_string()
            }
            None => String::new(),
        },
        Err(_) => String::new(),
    }
}

/// `true` iff `url` parses, has a scheme and host, its host equals
/// `base_host` or is a subdomain of it, and its path isn't an excluded
/// asset extension.
pub fn in_scope(url: &str, base_host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme().is_empty() {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let base_host = base_host.to_ascii_lowercase();

    let host_matches = host == base_host || host.ends_with(&format!(".{base_host}"));
    if !host_matches {
        return false;
    }

    let path = parsed.path().to_ascii_lowercase();
    !EXCLUDED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Resolves a possibly-relative `href` against `base`, skipping schemes that
/// are never crawlable. Returns the resolved absolute URL string.
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("mailto:") || lower.starts_with("tel:") || lower.starts_with("javascript:")
    {
        return None;
    }
    let resolved = base.join(trimmed).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    Some(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_prepends_scheme() {
        assert_eq!(canonicalize("example.com"), "https://example.com/");
    }

    #[test]
    fn canonicalize_strips_www_and_trailing_slash() {
        assert_eq!(
            canonicalize("https://WWW.Example.com/foo/"),
            "https://example.com/foo"
        );
    }

    #[test]
    fn canonicalize_empty_path_becomes_slash() {
        assert_eq!(canonicalize("https://example.com"), "https://example.com/");
    }

    #[test]
    fn canonicalize_discards_query_and_fragment() {
        assert_eq!(
            canonicalize("https://example.com/page?x=1#frag"),
            "https://example.com/page"
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let once = canonicalize("HTTPS://WWW.Example.com/Foo/?q=1#x");
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn canonicalize_returns_input_unchanged_on_parse_failure() {
        assert_eq!(canonicalize("not a url at all ::::"), "not a url at all ::::");
    }

    #[test]
    fn in_scope_accepts_base_host_and_subdomains() {
        assert!(in_scope("https://example.com/x", "example.com"));
        assert!(in_scope("https://sub.example.com/x", "example.com"));
        assert!(!in_scope("https://other.com/x", "example.com"));
    }

    #[test]
    fn in_scope_rejects_excluded_extensions() {
        assert!(!in_scope("https://example.com/logo.PNG", "example.com"));
    }

    #[test]
    fn resolve_href_skips_non_http_schemes() {
        let base = Url::parse("https://example.com/page").unwrap();
        assert!(resolve_href(&base, "mailto:a@example.com").is_none());
        assert!(resolve_href(&base, "tel:+15551234567").is_none());
        assert!(resolve_href(&base, "javascript:void(0)").is_none());
        assert!(resolve_href(&base, "#section").is_none());
    }

    #[test]
    fn resolve_href_resolves_relative_links() {
        let base = Url::parse("https://example.com/sub/page.html").unwrap();
        assert_eq!(
            resolve_href(&base, "../about").unwrap(),
            "https://example.com/about"
        );
    }
}
