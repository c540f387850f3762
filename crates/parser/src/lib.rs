pub mod email;
pub mod links;

use scraper::Html;
use url::Url;

/// Everything extracted from one fetched page: in-scope links to enqueue
/// and `(normalized, raw)` email pairs found on it.
pub struct ParsedPage {
    pub links: Vec<String>,
    pub emails: Vec<(String, String)>,
}

/// Parses a page's HTML body against its fetched URL and the domain's base
/// host, combining the Link Extractor and Email Recognizer. Matches the
/// teacher's `parse_response` orchestration, minus the dark-web-specific
/// metadata it also used to collect.
pub fn parse_page(html_str: &str, base_url: &Url, base_host: &str) -> ParsedPage {
    let document = Html::parse_document(html_str);
    let text = links::visible_text(&document);

    let emails = email::extract_emails(&document, &text);
    let links = links::extract_links(&document, base_url, base_host);

    ParsedPage { links, emails }
}
