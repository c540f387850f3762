use std::str::FromStr;

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{Html, Selector};

/// The canonical email token: `user` starts alphanumeric, `host` starts
/// alphanumeric, at least a two-letter TLD. Unanchored with word-boundary
/// behavior so it can be found anywhere in running text.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9][A-Za-z0-9._%+\-]*@[A-Za-z0-9][A-Za-z0-9.\-]*\.[A-Za-z]{2,}\b")
        .unwrap()
});

/// De-obfuscation rewrites, applied in order. Each captures a user/host/tld
/// triple and reassembles it as `user@host.tld`; later patterns then run
/// over the already-rewritten text.
static OBFUSCATIONS: &[fn(&str) -> String] = &[
    rewrite_at_dot_brackets,
    rewrite_at_dot_parens,
    rewrite_at_dot_brackets_upper,
    rewrite_spaced_at,
    rewrite_a_dot_parens,
];

const USER: &str = r"[A-Za-z0-9][A-Za-z0-9._%+\-]*";
const HOST: &str = r"[A-Za-z0-9][A-Za-z0-9.\-]*";
const TLD: &str = r"[A-Za-z]{2,}";

fn rewrite_with(re: &Regex, text: &str) -> String {
    re.replace_all(text, |caps: &Captures| {
        format!("{}@{}.{}", &caps[1], &caps[2], &caps[3])
    })
    .into_owned()
}

fn rewrite_at_dot_brackets(text: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"(?i)({USER})\s*\[at\]\s*({HOST})\s*\[dot\]\s*({TLD})"
        ))
        .unwrap()
    });
    rewrite_with(&RE, text)
}

fn rewrite_at_dot_parens(text: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"(?i)({USER})\s*\(at\)\s*({HOST})\s*\(dot\)\s*({TLD})"
        ))
        .unwrap()
    });
    rewrite_with(&RE, text)
}

fn rewrite_at_dot_brackets_upper(text: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(r"({USER})\s*\[AT\]\s*({HOST})\s*\[DOT\]\s*({TLD})")).unwrap()
    });
    rewrite_with(&RE, text)
}

fn rewrite_spaced_at(text: &str) -> String {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(&format!(r"({USER})\s*@\s*({HOST})\s*\.\s*({TLD})")).unwrap());
    rewrite_with(&RE, text)
}

fn rewrite_a_dot_parens(text: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(
            r"(?i)({USER})\s*\(a\)\s*({HOST})\s*\(dot\)\s*({TLD})"
        ))
        .unwrap()
    });
    rewrite_with(&RE, text)
}

/// Collects every `mailto:` anchor's address: the substring after
/// `mailto:`, stopping at the first `?`, trimmed.
pub fn mailto_addresses(document: &Html) -> Vec<String> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| {
            let rest = href.strip_prefix("mailto:").or_else(|| href.strip_prefix("MAILTO:"))?;
            let addr = rest.split('?').next().unwrap_or("").trim();
            if addr.is_empty() {
                None
            } else {
                Some(addr.to_string())
            }
        })
        .collect()
}

/// Finds every raw email candidate in visible text: direct matches plus
/// matches surfaced by de-obfuscation rewrites.
pub fn find_candidates(text: &str) -> Vec<String> {
    let mut rewritten = text.to_string();
    for rewrite in OBFUSCATIONS {
        rewritten = rewrite(&rewritten);
    }
    EMAIL_RE
        .find_iter(&rewritten)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Lowercases and trims, strips trailing punctuation and enclosing
/// brackets/quotes, then validates syntactically (no DNS/SMTP check).
/// Returns the validator's canonical form, used as the dedup key.
pub fn normalize(raw: &str) -> Option<String> {
    let mut s = raw.trim().to_ascii_lowercase();

    while matches!(s.chars().last(), Some(c) if ".,;:!?".contains(c)) {
        s.pop();
    }

    loop {
        let before = s.clone();
        s = s
            .trim_matches(|c: char| "<>()[]{}\"' ".contains(c))
            .to_string();
        if s == before {
            break;
        }
    }

    if s.is_empty() {
        return None;
    }

    EmailAddress::from_str(&s).ok().map(|addr| addr.to_string())
}

/// Extracts, de-obfuscates, normalizes and deduplicates every email found
/// via `mailto:` anchors and visible text. Returns `(normalized, raw)`
/// pairs, one per distinct normalized address, first-seen raw form kept.
pub fn extract_emails(document: &Html, visible_text: &str) -> Vec<(String, String)> {
    let mut raw_candidates = mailto_addresses(document);
    raw_candidates.extend(find_candidates(visible_text));

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for raw in raw_candidates {
        if let Some(normalized) = normalize(&raw) {
            if seen.insert(normalized.clone()) {
                out.push((normalized, raw));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailto_anchor_is_extracted_and_subject_stripped() {
        let html =
            Html::parse_document(r#"<a href="mailto:Alice@Example.COM?subject=x">mail</a>"#);
        let addrs = mailto_addresses(&html);
        assert_eq!(addrs, vec!["Alice@Example.COM".to_string()]);
        assert_eq!(normalize(&addrs[0]).unwrap(), "alice@example.com");
    }

    #[test]
    fn bracket_obfuscation_is_rewritten() {
        let candidates = find_candidates("contact: bob [at] sample [dot] org");
        assert_eq!(candidates, vec!["bob@sample.org".to_string()]);
    }

    #[test]
    fn spaced_at_obfuscation_is_rewritten() {
        let candidates = find_candidates("Reach us at Carol @ foo . io please");
        assert_eq!(candidates, vec!["Carol@foo.io".to_string()]);
        assert_eq!(normalize(&candidates[0]).unwrap(), "carol@foo.io");
    }

    #[test]
    fn bracket_obfuscation_handles_multi_level_host() {
        let candidates = find_candidates("contact: bob [at] mail.sample [dot] org");
        assert_eq!(candidates, vec!["bob@mail.sample.org".to_string()]);
    }

    #[test]
    fn direct_email_is_found() {
        let candidates = find_candidates("Email dave@example.com for help");
        assert_eq!(candidates, vec!["dave@example.com".to_string()]);
    }

    #[test]
    fn normalize_strips_enclosing_punctuation() {
        assert_eq!(
            normalize(" <Erin@Example.com>. ").unwrap(),
            "erin@example.com"
        );
    }

    #[test]
    fn normalize_rejects_invalid_candidates() {
        assert!(normalize("not-an-email").is_none());
    }

    #[test]
    fn extract_emails_dedupes_case_insensitively() {
        let html = Html::parse_fragment("<p>dave@example.com and DAVE@EXAMPLE.COM</p>");
        let text = "dave@example.com and DAVE@EXAMPLE.COM";
        let found = extract_emails(&html, text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "dave@example.com");
    }
}
