//! Link blacklist
//!
//! Rules come from uBlacklist-format files: one rule per line, either a raw
//! regular expression wrapped in slashes, a WebExtension-style match pattern
//! (`scheme://host/path` with `*` wildcards), or a bare domain.

use crate::results::SearchResult;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// An ordered set of compiled link filters. Immutable after startup.
#[derive(Debug, Default)]
pub struct Blacklist {
    regexps: Vec<Regex>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rules loaded.
    pub fn len(&self) -> usize {
        self.regexps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regexps.is_empty()
    }

    /// Add a bare domain; expands to `*://domain/*`.
    pub fn add_domain(&mut self, domain: &str) -> Result<()> {
        self.add_pattern(&format!("*://{domain}/*"))
    }

    /// Add a WebExtension-style match pattern.
    ///
    /// `*` in the scheme matches anything except `:`; `*` in the host
    /// matches zero or more dot-terminated labels; `*` in a non-final path
    /// segment matches anything except `/`; `*` in the final segment matches
    /// anything. A trailing `/*` also matches an empty path, so a domain
    /// rule catches `https://example.com` itself.
    pub fn add_pattern(&mut self, rule: &str) -> Result<()> {
        if !rule.contains("://") {
            return self.add_domain(rule);
        }

        // A trailing "/*" matches any path including none at all; compile
        // the rest of the pattern and bolt the optional group on.
        if let Some(prefix) = rule.strip_suffix("/*") {
            let mut exp = compile_pattern(prefix);
            exp.push_str("(/.*)?");
            return self.add_regexp_anchored(&exp);
        }

        self.add_regexp_anchored(&compile_pattern(rule))
    }

    /// Add a raw regular expression.
    pub fn add_regexp(&mut self, rule: &str) -> Result<()> {
        let re = Regex::new(rule)
            .with_context(|| format!("invalid blacklist regex {rule:?}"))?;
        self.regexps.push(re);
        Ok(())
    }

    fn add_regexp_anchored(&mut self, body: &str) -> Result<()> {
        self.add_regexp(&format!("^{body}$"))
    }

    /// Returns true if the link should be filtered out.
    pub fn contains(&self, link: &str) -> bool {
        let link = link.trim_end_matches('/');
        self.regexps.iter().any(|re| re.is_match(link))
    }

    /// Filter results in place, preserving order.
    ///
    /// Returns the surviving results and the number dropped. The input
    /// vector is consumed; callers must not rely on it afterwards.
    pub fn filter(&self, mut results: Vec<SearchResult>) -> (Vec<SearchResult>, usize) {
        let before = results.len();
        results.retain(|r| !self.contains(&r.link));
        let dropped = before - results.len();
        (results, dropped)
    }

    /// Load a uBlacklist ruleset from disk.
    ///
    /// Blank lines and `#` comments are skipped; `/regex/` lines add a raw
    /// regex; everything else is a match pattern or bare domain. Returns the
    /// number of rules added.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read blacklist {}", path.display()))?;

        let mut n = 0;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(re) = line.strip_prefix('/') {
                self.add_regexp(re.strip_suffix('/').unwrap_or(re))?;
            } else {
                self.add_pattern(line)?;
            }
            n += 1;
        }

        Ok(n)
    }
}

/// Translate a match pattern into a regular expression body.
fn compile_pattern(rule: &str) -> String {
    let mut exp = String::new();
    let bytes = rule.as_bytes();
    let mut stage = 0; // 0 = scheme, 1 = host, 2 = path

    for (i, &b) in bytes.iter().enumerate() {
        let r = b as char;
        match stage {
            0 => {
                if r == ':' {
                    exp.push(':');
                    stage = 1;
                } else if r == '*' {
                    exp.push_str("[^:]*");
                } else {
                    exp.push_str(&regex::escape(&r.to_string()));
                }
            }
            1 => {
                let prev = bytes[i - 1] as char;
                let prev2 = if i >= 2 { bytes[i - 2] as char } else { '\0' };
                if prev2 != ':' && prev != ':' && prev != '/' && r == '/' {
                    exp.push('/');
                    stage = 2;
                } else if r == '*' {
                    exp.push_str(r"([^\.]*\.)*");
                } else if prev != '*' {
                    // The label separator after a host wildcard is part of
                    // the wildcard's own expansion.
                    exp.push_str(&regex::escape(&r.to_string()));
                }
            }
            _ => {
                if r == '*' {
                    if bytes[i..].iter().skip(1).any(|&b| b == b'/') {
                        // More path components follow.
                        exp.push_str("[^/]*");
                    } else {
                        exp.push_str(".*");
                    }
                } else {
                    exp.push_str(&regex::escape(&r.to_string()));
                }
            }
        }
    }

    exp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_matches(b: &Blacklist, links: &[&str]) {
        for link in links {
            assert!(b.contains(link), "rule does not match {link:?}");
        }
    }

    fn assert_rejects(b: &Blacklist, links: &[&str]) {
        for link in links {
            assert!(!b.contains(link), "rule matches {link:?} when it shouldn't");
        }
    }

    #[test]
    fn domain_rules() {
        let mut b = Blacklist::new();
        b.add_domain("example.com").unwrap();

        assert_matches(
            &b,
            &[
                "https://example.com",
                "http://example.com",
                "http://example.com/",
                "http://example.com/cbde",
            ],
        );
        assert_rejects(&b, &["https://example.co"]);
    }

    #[test]
    fn simple_patterns() {
        let mut b = Blacklist::new();
        b.add_pattern("*://example.com/*").unwrap();

        assert_matches(
            &b,
            &[
                "https://example.com",
                "http://example.com",
                "http://example.com/",
                "http://example.com/cbde",
            ],
        );
        assert_rejects(&b, &["https://example.co"]);
    }

    #[test]
    fn hostname_wildcards() {
        let mut b = Blacklist::new();
        b.add_pattern("*://*.example.com/*").unwrap();

        assert_matches(
            &b,
            &[
                "http://example.com",
                "http://www.example.com",
                "http://aaaaaa.www.example.com",
            ],
        );
        assert_rejects(&b, &["https://example.co", "http://wwwexample.com"]);
    }

    #[test]
    fn non_root_paths() {
        let mut b = Blacklist::new();
        b.add_pattern("*://example.com/abc/*").unwrap();

        assert_matches(
            &b,
            &["https://example.com/abc/", "https://example.com/abc/def"],
        );
        assert_rejects(&b, &["https://example.com/", "https://example.com/def"]);
    }

    #[test]
    fn path_component_wildcards() {
        let mut b = Blacklist::new();
        b.add_pattern("*://example.com/*/b/*").unwrap();

        assert_matches(
            &b,
            &[
                "https://example.com/a/b/c",
                "https://example.com/a/b/c/",
                "https://example.com/d/b/f",
                "https://example.com/d/b/f/",
            ],
        );
        assert_rejects(
            &b,
            &[
                "https://example.com/",
                "https://example.com/def",
                "https://example.com/c/a/b",
                "https://example.com/c/a/b/",
            ],
        );
    }

    #[test]
    fn scheme_wildcards_stop_at_the_colon() {
        let mut b = Blacklist::new();
        b.add_pattern("http://example.com/*").unwrap();

        assert_matches(&b, &["http://example.com/a"]);
        assert_rejects(&b, &["https://example.com/a"]);
    }

    #[test]
    fn filter_preserves_order() {
        let mut b = Blacklist::new();
        b.add_pattern("*://example.com/*").unwrap();

        let results: Vec<SearchResult> = [
            "https://example.com",
            "https://example.com/abc",
            "https://coolwebsite.com/",
            "https://example.com/abc/def",
            "https://coolwebsite.com/abc",
        ]
        .iter()
        .map(|link| {
            let mut r = SearchResult::new("test");
            r.link = link.to_string();
            r
        })
        .collect();

        let (kept, dropped) = b.filter(results);

        assert_eq!(dropped, 3);
        let links: Vec<&str> = kept.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://coolwebsite.com/", "https://coolwebsite.com/abc"]
        );
    }

    #[test]
    fn loads_rule_files() {
        let path = std::env::temp_dir().join("scour-blacklist-test.txt");
        std::fs::write(
            &path,
            "# comment\n\nexample.com\n*://tracker.example.org/*\n/ads[0-9]+\\.example/\n",
        )
        .unwrap();

        let mut b = Blacklist::new();
        let n = b.load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(n, 3);
        assert!(b.contains("https://example.com/anything"));
        assert!(b.contains("http://tracker.example.org/pixel"));
        assert!(b.contains("https://ads01.example/banner"));
        assert!(!b.contains("https://coolwebsite.com/"));
    }
}
