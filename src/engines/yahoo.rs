//! Yahoo
//!
//! Yahoo is slowly rolling out a new result layout; both the old and the
//! new shape are handled here. Links route through a `r.search.yahoo.com`
//! redirector that buries the destination in an `/RU=…/` path segment.

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::Arc;

pub struct Yahoo {
    name: String,
    http: HttpClient,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(Yahoo {
        name: cfg.name.clone(),
        http: HttpClient::from_settings(cfg)?,
    }))
}

/// Extract the destination from a `/RU=…/` redirector link.
fn decode_href(href: &str) -> String {
    let Some(idx) = href.find("/RU=") else {
        return href.to_string();
    };

    let encoded = &href[idx + 4..];
    let Some(end) = encoded.find('/') else {
        return href.to_string();
    };

    match percent_decode_str(&encoded[..end]).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(_) => href.to_string(),
    }
}

/// Title anchors wrap the displayed URL in a span; only the rest is the
/// title.
fn text_skipping_spans(el: ElementRef) -> String {
    let mut out = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(e) if e.name() != "span" => {
                if let Some(child) = ElementRef::wrap(child) {
                    out.push_str(&text_skipping_spans(child));
                }
            }
            _ => {}
        }
    }
    out
}

impl Yahoo {
    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let row = Selector::parse(".algo").unwrap();
        let title_old = Selector::parse("h3.title > a").unwrap();
        let title_new = Selector::parse(r#"a[data-matarget="algo"]"#).unwrap();
        let desc_sel = Selector::parse(".compText > p").unwrap();

        doc.select(&row)
            .map(|e| {
                let mut v = SearchResult::new(&self.name);

                if let Some(a) = e
                    .select(&title_old)
                    .next()
                    .or_else(|| e.select(&title_new).next())
                {
                    let href = a.value().attr("href").unwrap_or_default();
                    v.link = clean_url(&decode_href(href));
                    v.title = text_skipping_spans(a).trim().to_string();
                }

                if let Some(d) = e.select(&desc_sel).next() {
                    v.description = d.text().collect::<String>().trim().to_string();
                }

                v
            })
            .collect()
    }
}

#[async_trait]
impl Engine for Yahoo {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![("p", query.to_string()), ("nojs", "1".to_string())];
        if page >= 1 {
            pairs.push(("b", (1 + 7 * page).to_string()));
            pairs.push(("pz", "7".to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let doc = self
            .http
            .get_html(&format!("https://search.yahoo.com/search?{qs}"))
            .await?;

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get("https://search.yahoo.com/").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yahoo() -> Yahoo {
        Yahoo {
            name: "yahoo".to_string(),
            http: HttpClient::from_settings(&EngineSettings::default()).unwrap(),
        }
    }

    #[test]
    fn decodes_redirector_hrefs() {
        assert_eq!(
            decode_href(
                "https://r.search.yahoo.com/_ylt=abc/RU=https%3A%2F%2Fexample.com%2Fpage/RK=2/RS=xyz"
            ),
            "https://example.com/page"
        );
        assert_eq!(
            decode_href("https://example.com/direct"),
            "https://example.com/direct"
        );
    }

    #[test]
    fn parses_old_layout() {
        let doc = Html::parse_document(
            r#"
            <div class="algo">
              <h3 class="title">
                <a href="https://r.search.yahoo.com/_ylt=a/RU=https%3A%2F%2Fexample.com%2Fone/RK=2">
                  <span>example.com</span>First result
                </a>
              </h3>
              <div class="compText"><p>Description one.</p></div>
            </div>
            "#,
        );

        let res = yahoo().parse(&doc);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].link, "https://example.com/one");
        assert_eq!(res[0].title, "First result");
        assert_eq!(res[0].description, "Description one.");
        assert_eq!(res[0].sources, vec!["yahoo"]);
    }

    #[test]
    fn parses_new_layout() {
        let doc = Html::parse_document(
            r#"
            <div class="algo">
              <a data-matarget="algo" href="https://example.org/two">Second result</a>
              <div class="compText"><p>Description two.</p></div>
            </div>
            "#,
        );

        let res = yahoo().parse(&doc);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].link, "https://example.org/two");
        assert_eq!(res[0].title, "Second result");
    }
}
