//! Result link rewriting
//!
//! Rules are scanned in definition order and the first one that matches
//! wins. A rule with an empty replacement drops the result entirely.

use crate::config::RewriteRuleConfig;
use anyhow::{Context, Result};
use regex::Regex;
use url::Url;

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub enum RewriteRule {
    /// Replace every match of the regex in the link.
    Find { find: Regex, replace: String },

    /// Swap out the hostname when it matches exactly.
    Hostname { hostname: String, replace: String },
}

impl RewriteRule {
    /// Compile a rule from its config representation.
    ///
    /// The config layer has already checked that exactly one of `find` and
    /// `hostname` is set.
    pub fn compile(cfg: &RewriteRuleConfig) -> Result<Self> {
        if let Some(find) = &cfg.find {
            let find = Regex::new(find)
                .with_context(|| format!("invalid rewrite regex {find:?}"))?;
            return Ok(Self::Find {
                find,
                replace: cfg.replace.clone(),
            });
        }

        Ok(Self::Hostname {
            hostname: cfg.hostname.clone().unwrap_or_default(),
            replace: cfg.replace.clone(),
        })
    }
}

/// An ordered list of rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct UrlRewriter {
    rules: Vec<RewriteRule>,
}

impl UrlRewriter {
    /// Compile all rules from the configuration.
    pub fn compile(rules: &[RewriteRuleConfig]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(RewriteRule::compile)
            .collect::<Result<_>>()?;
        Ok(Self { rules })
    }

    /// Attempt to rewrite a URL, stopping at the first rule that matches.
    ///
    /// Returns an empty string when the matching rule has an empty
    /// replacement, which callers treat as "drop this result". A URL that
    /// matches nothing is returned unchanged.
    pub fn rewrite(&self, link: &str) -> String {
        // The URL is parsed lazily, at most once; a parse failure is cached
        // so hostname rules are skipped without retrying.
        let mut parsed: Option<Result<Url, ()>> = None;

        for rule in &self.rules {
            match rule {
                RewriteRule::Find { find, replace } => {
                    if find.is_match(link) {
                        if replace.is_empty() {
                            return String::new();
                        }
                        return find.replace_all(link, replace.as_str()).into_owned();
                    }
                }
                RewriteRule::Hostname { hostname, replace } => {
                    let url = parsed
                        .get_or_insert_with(|| Url::parse(link).map_err(|_| ()));
                    let Ok(url) = url else { continue };

                    if url.host_str() == Some(hostname.as_str()) {
                        if replace.is_empty() {
                            return String::new();
                        }

                        let mut url = url.clone();
                        if url.set_host(Some(replace.as_str())).is_err() {
                            continue;
                        }
                        return url.to_string();
                    }
                }
            }
        }

        link.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(rules: &[RewriteRuleConfig]) -> UrlRewriter {
        UrlRewriter::compile(rules).unwrap()
    }

    fn find_rule(find: &str, replace: &str) -> RewriteRuleConfig {
        RewriteRuleConfig {
            find: Some(find.to_string()),
            hostname: None,
            replace: replace.to_string(),
        }
    }

    fn hostname_rule(hostname: &str, replace: &str) -> RewriteRuleConfig {
        RewriteRuleConfig {
            find: None,
            hostname: Some(hostname.to_string()),
            replace: replace.to_string(),
        }
    }

    #[test]
    fn regex_rules_rewrite_matches() {
        let r = rewriter(&[find_rule(
            r"^https?://old\.example\.com/(.*)",
            "https://new.example.com/$1",
        )]);

        assert_eq!(
            r.rewrite("http://old.example.com/a/b"),
            "https://new.example.com/a/b"
        );
        assert_eq!(
            r.rewrite("https://other.example.com/a"),
            "https://other.example.com/a"
        );
    }

    #[test]
    fn empty_regex_replacement_drops() {
        let r = rewriter(&[find_rule("^https://spam\\.example\\.com", "")]);
        assert_eq!(r.rewrite("https://spam.example.com/x"), "");
    }

    #[test]
    fn hostname_rules_swap_the_host() {
        let r = rewriter(&[hostname_rule("m.wikipedia.org", "en.wikipedia.org")]);
        assert_eq!(
            r.rewrite("https://m.wikipedia.org/wiki/Rust"),
            "https://en.wikipedia.org/wiki/Rust"
        );
        assert_eq!(
            r.rewrite("https://de.wikipedia.org/wiki/Rust"),
            "https://de.wikipedia.org/wiki/Rust"
        );
    }

    #[test]
    fn empty_hostname_replacement_drops() {
        let r = rewriter(&[hostname_rule("ads.example.com", "")]);
        assert_eq!(r.rewrite("https://ads.example.com/click"), "");
        assert_eq!(r.rewrite("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn first_matching_rule_wins() {
        let r = rewriter(&[
            hostname_rule("example.com", "first.example.com"),
            hostname_rule("example.com", "second.example.com"),
        ]);
        assert_eq!(
            r.rewrite("https://example.com/"),
            "https://first.example.com/"
        );
    }

    #[test]
    fn unparsable_urls_skip_hostname_rules() {
        let r = rewriter(&[hostname_rule("example.com", "other.example.com")]);
        assert_eq!(r.rewrite("not a url"), "not a url");
    }

    #[test]
    fn no_rules_is_a_no_op() {
        let r = UrlRewriter::default();
        assert_eq!(r.rewrite("https://example.com/x"), "https://example.com/x");
    }
}
