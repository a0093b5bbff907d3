//! Yandex
//!
//! Not in the default set; Yandex is quick to serve captchas. Pretending
//! to be curl rather than Chrome somehow makes that happen less often.

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;

pub struct Yandex {
    name: String,
    http: HttpClient,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    let mut http = HttpClient::from_settings(cfg)?;
    http.set_user_agent("curl/8.7.1");
    http.set_base_headers(vec![("Accept", "*/*".to_string())]);

    Ok(Arc::new(Yandex {
        name: cfg.name.clone(),
        http,
    }))
}

fn is_captcha(doc: &Html) -> bool {
    let title = Selector::parse("title").unwrap();
    doc.select(&title)
        .next()
        .map(|t| t.text().collect::<String>() == "Are you not a robot?")
        .unwrap_or(false)
}

impl Yandex {
    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let row = Selector::parse(".b-serp-item").unwrap();
        let link_sel = Selector::parse(".b-serp-item__title-link").unwrap();
        let title_sel = Selector::parse(".b-serp-item__title").unwrap();
        let desc_sel = Selector::parse(".b-serp-item__text").unwrap();

        doc.select(&row)
            .map(|e| {
                let mut v = SearchResult::new(&self.name);

                if let Some(a) = e.select(&link_sel).next() {
                    v.link = clean_url(a.value().attr("href").unwrap_or_default());
                }
                if let Some(t) = e.select(&title_sel).next() {
                    v.title = t.text().collect::<String>().trim().to_string();
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
impl Engine for Yandex {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![
            ("text", query.to_string()),
            // Site-search box number one, which appears to cover the whole
            // web when combined with web=1.
            ("searchid", "1".to_string()),
            ("web", "1".to_string()),
            ("lr", "87".to_string()),
            ("frame", "1".to_string()),
        ];
        if page >= 1 {
            pairs.push(("p", (page - 1).to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let doc = self
            .http
            .get_html(&format!("https://yandex.com/sitesearch?{qs}"))
            .await?;

        if is_captcha(&doc) {
            return Err(EngineError::Captcha);
        }

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get("https://yandex.com/").await.map(|_| ())
    }
}
