//! Google
//!
//! Sending a text-browser user agent gets us the `udm=14` web-only layout
//! with stable class names, which is much friendlier to scrape than what
//! Google serves to a full browser.

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

pub struct Google {
    name: String,
    http: HttpClient,
    debug: bool,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    let mut http = HttpClient::from_settings(cfg)?;
    if cfg.user_agent.is_empty() {
        http.set_user_agent("Links");
    }

    Ok(Arc::new(Google {
        name: cfg.name.clone(),
        http,
        debug: cfg.debug,
    }))
}

/// Unwrap Google's `/url?q=…` redirector.
fn decode_href(href: &str) -> Cow<'_, str> {
    let Some(query) = href.strip_prefix("/url?") else {
        return Cow::Borrowed(href);
    };

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "q")
        .map(|(_, v)| Cow::Owned(v.into_owned()))
        .unwrap_or(Cow::Borrowed(href))
}

impl Google {
    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let row = Selector::parse(".ezO2md").unwrap();
        let link_sel = Selector::parse("a.fuLhoc").unwrap();
        let title_sel = Selector::parse(".CVA68e").unwrap();
        let desc_sel = Selector::parse("td.udTCfd .FrIlee").unwrap();

        let mut results = Vec::new();

        for e in doc.select(&row) {
            let mut v = SearchResult::new(&self.name);

            if let Some(a) = e.select(&link_sel).next() {
                let href = a.value().attr("href").unwrap_or_default();
                v.link = clean_url(&decode_href(href));
            }

            if let Some(t) = e.select(&title_sel).next() {
                v.title = t.text().collect::<String>().trim().to_string();
            }

            // Rows without a title are knowledge panels and similar
            // furniture, not results.
            if v.title.is_empty() {
                if self.debug {
                    debug!(html = %e.html(), "google: skipping row with no title");
                }
                continue;
            }

            if let Some(d) = e.select(&desc_sel).next() {
                v.description = d.text().collect::<String>().trim().to_string();
            }

            results.push(v);
        }

        results
    }
}

#[async_trait]
impl Engine for Google {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![
            ("q", query.to_string()),
            ("ie", "UTF-8".to_string()),
            // Web results only; no knowledge graph, no AI overview.
            ("udm", "14".to_string()),
        ];
        if page >= 1 {
            pairs.push(("start", (10 * page).to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let doc = self
            .http
            .get_html(&format!("https://www.google.com/search?{qs}"))
            .await?;

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get("https://www.google.com/").await.map(|_| ())
    }
}
