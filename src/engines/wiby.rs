//! Wiby
//!
//! Wiby has a native JSON API, so no scraping is needed. Its fields arrive
//! pre-escaped for direct inclusion in HTML and have to be unescaped here,
//! or `&amp;` and friends leak into the rendered results.

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::SearchResult;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub struct Wiby {
    name: String,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct WibyResult {
    #[serde(rename = "URL", default)]
    url: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Snippet", default)]
    snippet: String,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(Wiby {
        name: cfg.name.clone(),
        http: HttpClient::from_settings(cfg)?,
    }))
}

impl Wiby {
    fn to_native(&self, r: WibyResult) -> SearchResult {
        let mut v = SearchResult::new(&self.name);
        v.link = html_escape::decode_html_entities(&r.url).into_owned();
        v.title = html_escape::decode_html_entities(&r.title).into_owned();
        v.description = html_escape::decode_html_entities(&r.snippet).into_owned();
        v
    }
}

#[async_trait]
impl Engine for Wiby {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![("q", query.to_string())];
        if page > 1 {
            pairs.push(("p", (page + 1).to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let res = self
            .http
            .get(&format!("https://wiby.me/json?{qs}"))
            .await?;

        let raw: Vec<WibyResult> = res
            .json()
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        Ok(raw.into_iter().map(|r| self.to_native(r)).collect())
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get("https://wiby.me/").await.map(|_| ())
    }
}
