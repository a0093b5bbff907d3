//! Tracking parameter removal
//!
//! Upstreams decorate result links with referral and campaign parameters.
//! Stripping them both protects the user and normalizes links so the merger
//! can recognize duplicates across engines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Parameter names to remove. `hl` is included purely for normalization.
const STRIP_PARAMS: &[&str] = &[
    "ref",
    "refid",
    "ref_[a-z]*",
    "referrer",
    "utm_[a-z_]*",
    "hl",
];

static CLEANING_REGEXPS: Lazy<Vec<Regex>> = Lazy::new(|| {
    STRIP_PARAMS
        .iter()
        .map(|name| Regex::new(&format!("[?&]{name}=[^&]*")).unwrap())
        .collect()
});

/// Remove tracking parameters and the fragment from a URL.
///
/// Idempotent: cleaning an already-clean URL is a no-op.
pub fn clean_url(url: &str) -> String {
    // The fragment never survives; it cannot affect what the server returns.
    let mut url = match url.find('#') {
        Some(pos) => url[..pos].to_string(),
        None => url.to_string(),
    };

    for re in CLEANING_REGEXPS.iter() {
        // A parameter can appear more than once; every occurrence goes.
        while let Some(m) = re.find(&url) {
            if url.as_bytes()[m.start()] == b'?' && m.end() < url.len() {
                // The parameter led the query string but was not alone in
                // it; keep the `?` and consume the `&` of the next one.
                url = format!("{}?{}", &url[..m.start()], &url[m.end() + 1..]);
            } else {
                url = format!("{}{}", &url[..m.start()], &url[m.end()..]);
            }
        }
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_urls() {
        let tests = [
            ("http://example.com", "http://example.com"),
            ("http://example.com/test", "http://example.com/test"),
            ("http://example.com/test?ref=123", "http://example.com/test"),
            (
                "http://example.com/test?ref=123&number=42",
                "http://example.com/test?number=42",
            ),
            (
                "http://example.com/test?number=42&ref=123",
                "http://example.com/test?number=42",
            ),
            ("http://example.com/test#abc", "http://example.com/test"),
            ("http://example.com/?hl=en_US", "http://example.com/"),
            (
                "http://example.com/?utm_source=feed&utm_medium=email",
                "http://example.com/",
            ),
            (
                "http://example.com/a?x=1&ref_src=twsrc&y=2",
                "http://example.com/a?x=1&y=2",
            ),
        ];

        for (input, want) in tests {
            assert_eq!(clean_url(input), want, "cleaning {input:?}");
        }
    }

    #[test]
    fn cleaning_is_idempotent() {
        let urls = [
            "http://example.com/test?ref=123&number=42",
            "http://example.com/test?number=42&ref=123&utm_campaign=x",
            "http://example.com/test#abc",
            "http://example.com/plain",
        ];

        for url in urls {
            let once = clean_url(url);
            assert_eq!(clean_url(&once), once, "cleaning {url:?} twice");
        }
    }
}
