//! MediaWiki OpenSearch
//!
//! Works against any MediaWiki installation, which is why this engine is
//! not in the default set: it needs an `endpoint` in its configuration,
//! e.g. `https://en.wikipedia.org/w/api.php`.

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::SearchResult;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct MediaWiki {
    name: String,
    endpoint: String,
    http: HttpClient,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    let Some(endpoint) = cfg.extra_str("endpoint") else {
        bail!("mediawiki engine {:?} has no endpoint configured", cfg.name);
    };

    Ok(Arc::new(MediaWiki {
        name: cfg.name.clone(),
        endpoint: endpoint.to_string(),
        http: HttpClient::from_settings(cfg)?,
    }))
}

impl MediaWiki {
    /// The opensearch response is four parallel arrays:
    /// `[query, titles, descriptions, links]`.
    fn parse(&self, body: Value) -> Result<Vec<SearchResult>, EngineError> {
        let Some(arrays) = body.as_array() else {
            return Err(EngineError::Parse("expected a JSON array".to_string()));
        };
        if arrays.len() != 4 {
            return Err(EngineError::Parse(format!(
                "expected 4 arrays, got {}",
                arrays.len()
            )));
        }

        fn field(arrays: &[Value], i: usize) -> Result<&Vec<Value>, EngineError> {
            arrays[i].as_array().ok_or_else(|| {
                EngineError::Parse(format!("expected an array in field {i}"))
            })
        }
        let titles = field(arrays, 1)?;
        let descriptions = field(arrays, 2)?;
        let links = field(arrays, 3)?;

        let mut results = Vec::with_capacity(titles.len());
        for i in 0..titles.len() {
            let text = |v: Option<&Value>, what: &str| -> Result<String, EngineError> {
                v.and_then(|v| v.as_str()).map(|s| s.to_string()).ok_or_else(
                    || EngineError::Parse(format!("result {i} has an invalid {what}")),
                )
            };

            let mut v = SearchResult::new(&self.name);
            v.title = text(titles.get(i), "title")?;
            v.description = text(descriptions.get(i), "description")?;
            v.link = text(links.get(i), "link")?;
            results.push(v);
        }

        Ok(results)
    }
}

#[async_trait]
impl Engine for MediaWiki {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        if page > 1 {
            // The opensearch API has no offset parameter.
            return Ok(Vec::new());
        }

        let qs = query_string([
            ("action", "opensearch"),
            ("search", query),
            ("limit", "10"),
            ("profile", "fuzzy"),
            ("format", "json"),
            ("namespace", "0"),
        ]);

        let res = self.http.get(&format!("{}?{qs}", self.endpoint)).await?;
        let body: Value = res
            .json()
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        self.parse(body)
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get(&self.endpoint).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mediawiki() -> MediaWiki {
        MediaWiki {
            name: "my-wiki".to_string(),
            endpoint: "https://wiki.example.org/api.php".to_string(),
            http: HttpClient::from_settings(&EngineSettings::default()).unwrap(),
        }
    }

    #[test]
    fn parses_parallel_arrays() {
        let body: Value = serde_json::from_str(
            r#"["rust",
                ["Rust", "Rust (fungus)"],
                ["A systems language", "A plant disease"],
                ["https://wiki.example.org/Rust", "https://wiki.example.org/Rust_(fungus)"]]"#,
        )
        .unwrap();

        let res = mediawiki().parse(body).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].title, "Rust");
        assert_eq!(res[0].description, "A systems language");
        assert_eq!(res[0].link, "https://wiki.example.org/Rust");
        assert_eq!(res[0].sources, vec!["my-wiki"]);
    }

    #[test]
    fn rejects_malformed_responses() {
        let w = mediawiki();

        assert!(w.parse(serde_json::json!({"not": "an array"})).is_err());
        assert!(w.parse(serde_json::json!(["q", [], []])).is_err());
        assert!(w
            .parse(serde_json::json!(["q", "not-an-array", [], []]))
            .is_err());
        assert!(w.parse(serde_json::json!(["q", [1], ["d"], ["l"]])).is_err());
    }

    #[test]
    fn factory_requires_an_endpoint() {
        let mut cfg = EngineSettings::default();
        cfg.name = "my-wiki".to_string();
        cfg.engine_type = "mediawiki".to_string();
        assert!(factory(&cfg).is_err());
    }

    #[tokio::test]
    async fn searches_the_configured_endpoint() {
        use wiremock::matchers::{method, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "opensearch"))
            .and(query_param("search", "rust"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"["rust", ["Rust"], ["A language"], ["https://wiki.example.org/Rust"]]"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let w = MediaWiki {
            name: "my-wiki".to_string(),
            endpoint: server.uri(),
            http: HttpClient::from_settings(&EngineSettings::default()).unwrap(),
        };

        let res = w.search("rust", 0).await.unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].title, "Rust");

        // The opensearch API cannot page; anything past the second page is
        // empty without a request being made.
        assert!(w.search("rust", 2).await.unwrap().is_empty());
    }
}
