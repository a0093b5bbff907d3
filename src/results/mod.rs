//! Search result type and the link post-processing that applies to it

mod blacklist;
mod clean;
mod rewrite;

pub use blacklist::Blacklist;
pub use clean::clean_url;
pub use rewrite::{RewriteRule, UrlRewriter};

use serde::Serialize;

/// A single search result from an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// Title of the webpage.
    pub title: String,

    /// Snippet of text from the webpage, usually containing a portion of
    /// the query. May be empty; some upstream cards carry no description.
    pub description: String,

    /// URL of this result.
    pub link: String,

    /// Names of the engines that returned this result. Engines fill in a
    /// single entry; the merger appends the rest.
    pub sources: Vec<String>,

    /// Number of times this result was seen across engines. Filled in by
    /// the merger, not by engines.
    pub score: f64,
}

impl SearchResult {
    /// Create a result tagged with the engine it came from.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            sources: vec![source.into()],
            ..Default::default()
        }
    }

    /// The link with its `http://` or `https://` prefix stripped, for
    /// display purposes.
    pub fn fancy_url(&self) -> &str {
        self.link
            .strip_prefix("https://")
            .or_else(|| self.link.strip_prefix("http://"))
            .unwrap_or(&self.link)
    }
}

/// Truncate a string to `n` characters, appending an ellipsis if anything
/// was cut off. Characters are counted as Unicode scalars, not bytes.
pub fn truncate(s: String, n: usize) -> String {
    match s.char_indices().nth(n) {
        None => s,
        Some((pos, _)) => {
            let mut out = String::with_capacity(pos + '…'.len_utf8());
            out.push_str(&s[..pos]);
            out.push('…');
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("hello".to_string(), 5), "hello");
        assert_eq!(truncate("hello".to_string(), 100), "hello");
        assert_eq!(truncate(String::new(), 0), "");
    }

    #[test]
    fn truncate_cuts_long_strings() {
        assert_eq!(truncate("hello world".to_string(), 5), "hello…");
        assert_eq!(truncate("hello".to_string(), 4), "hell…");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        // Each of these is more than one byte in UTF-8.
        assert_eq!(truncate("äöüäöü".to_string(), 3), "äöü…");
        assert_eq!(truncate("日本語テキスト".to_string(), 7), "日本語テキスト");
        assert_eq!(truncate("日本語テキスト".to_string(), 3), "日本語…");
    }

    #[test]
    fn truncated_strings_have_n_plus_one_characters() {
        let out = truncate("a".repeat(300), 100);
        assert_eq!(out.chars().count(), 101);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn fancy_url_strips_scheme() {
        let mut r = SearchResult::new("wiby");
        r.link = "https://example.com/a".to_string();
        assert_eq!(r.fancy_url(), "example.com/a");

        r.link = "http://example.com".to_string();
        assert_eq!(r.fancy_url(), "example.com");

        r.link = "gopher://example.com".to_string();
        assert_eq!(r.fancy_url(), "gopher://example.com");
    }
}
