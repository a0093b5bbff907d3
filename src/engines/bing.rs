//! Bing

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::Arc;

pub struct Bing {
    name: String,
    http: HttpClient,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(Bing {
        name: cfg.name.clone(),
        http: HttpClient::from_settings(cfg)?,
    }))
}

impl Bing {
    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let row = Selector::parse(".b_algo").unwrap();
        let title = Selector::parse("h2 > a").unwrap();
        let desc = Selector::parse("div > p").unwrap();

        // Bing results are laid out like this:
        // h2 > a: title and link
        // div > p: desc, with an .algoSlug_icon span that prepends "Web"
        // to every description unless it is skipped.
        doc.select(&row)
            .map(|e| {
                let mut v = SearchResult::new(&self.name);

                if let Some(t) = e.select(&title).next() {
                    v.link = clean_url(t.value().attr("href").unwrap_or_default());
                    v.title = t.text().collect::<String>().trim().to_string();
                }

                if let Some(d) = e.select(&desc).next() {
                    v.description = text_skipping_class(d, "algoSlug_icon")
                        .trim()
                        .to_string();
                }

                v
            })
            .collect()
    }
}

/// Collect the text of an element, skipping any descendant element that
/// carries the given class.
fn text_skipping_class(el: ElementRef, class: &str) -> String {
    let mut out = String::new();
    collect(el, class, &mut out);
    out
}

fn collect(el: ElementRef, class: &str, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else { continue };
                if child.value().classes().any(|c| c == class) {
                    continue;
                }
                collect(child, class, out);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Engine for Bing {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![("q", query.to_string())];
        if page >= 1 {
            pairs.push(("first", (10 * page).to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let doc = self
            .http
            .get_html(&format!("https://www.bing.com/search?{qs}"))
            .await?;

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get("https://www.bing.com/").await.map(|_| ())
    }
}
