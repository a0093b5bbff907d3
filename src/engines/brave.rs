//! Brave Search

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;

pub struct Brave {
    name: String,
    http: HttpClient,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(Brave {
        name: cfg.name.clone(),
        http: HttpClient::from_settings(cfg)?,
    }))
}

impl Brave {
    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let row = Selector::parse("#results .snippet[data-type]").unwrap();
        let link = Selector::parse("a.heading-serpresult").unwrap();
        // Product cards and inline question/answer blocks use a plain
        // anchor around the heading instead.
        let link_fallback = Selector::parse("a[href]").unwrap();
        let title = Selector::parse(".title").unwrap();
        let title_fallback = Selector::parse(".snippet-title").unwrap();
        let desc = Selector::parse(".snippet-description").unwrap();
        let desc_fallback = Selector::parse(".snippet-content").unwrap();

        doc.select(&row)
            .map(|e| {
                let mut v = SearchResult::new(&self.name);

                if let Some(a) = e
                    .select(&link)
                    .next()
                    .or_else(|| e.select(&link_fallback).next())
                {
                    v.link = clean_url(a.value().attr("href").unwrap_or_default());
                }

                if let Some(t) = e
                    .select(&title)
                    .next()
                    .or_else(|| e.select(&title_fallback).next())
                {
                    v.title = t.text().collect::<String>().trim().to_string();
                }

                if let Some(d) = e
                    .select(&desc)
                    .next()
                    .or_else(|| e.select(&desc_fallback).next())
                {
                    v.description = d.text().collect::<String>().trim().to_string();
                }

                v
            })
            .collect()
    }
}

#[async_trait]
impl Engine for Brave {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![("q", query.to_string())];
        if page >= 1 {
            pairs.push(("offset", page.to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let doc = self
            .http
            .get_html(&format!("https://search.brave.com/search?{qs}"))
            .await?;

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get("https://search.brave.com/").await.map(|_| ())
    }
}
