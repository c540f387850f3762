use scraper::{Html, Selector};
use url::Url;

use mailharvest_core::{canonicalize, in_scope, resolve_href};

/// Parses an `<a href>`/`<area href>` from `document`, resolves it against
/// `base`, canonicalizes it, and keeps it only if it's in-scope for
/// `base_host`. Dedupes while preserving first-seen order.
pub fn extract_links(document: &Html, base: &Url, base_host: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for sel_str in ["a[href]", "area[href]"] {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in document.select(&sel) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let Some(resolved) = resolve_href(base, href) else {
                continue;
            };
            let canon = canonicalize(&resolved);
            if !in_scope(&canon, base_host) {
                continue;
            }
            if seen.insert(canon.clone()) {
                out.push(canon);
            }
        }
    }
    out
}

/// Extracts the document's visible text (the `<body>` contents, whitespace
/// collapsed) used by the Email Recognizer.
pub fn visible_text(document: &Html) -> String {
    let Ok(sel) = Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| {
            el.text()
                .collect::<Vec<_>>()
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_links_keeps_only_in_scope_links() {
        let html = Html::parse_document(
            r#"<html><body>
                <a href="/contact">contact</a>
                <a href="https://other.test/x">other</a>
                <a href="mailto:a@example.com">mail</a>
                <a href="#frag">frag</a>
            </body></html>"#,
        );
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract_links(&html, &base, "example.com");
        assert_eq!(links, vec!["https://example.com/contact".to_string()]);
    }

    #[test]
    fn extract_links_dedupes() {
        let html = Html::parse_document(
            r#"<html><body>
                <a href="/a">x</a>
                <a href="/a/">x again</a>
            </body></html>"#,
        );
        let base = Url::parse("https://example.com/").unwrap();
        let links = extract_links(&html, &base, "example.com");
        assert_eq!(links, vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn visible_text_collapses_whitespace() {
        let html = Html::parse_document("<html><body>  hello \n   world  </body></html>");
        assert_eq!(visible_text(&html), "hello world");
    }
}
