//! Marginalia

use super::{query_string, Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;

pub struct Marginalia {
    name: String,
    http: HttpClient,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(Marginalia {
        name: cfg.name.clone(),
        http: HttpClient::from_settings(cfg)?,
    }))
}

impl Marginalia {
    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        // Marginalia's markup carries no class names that are useful to us,
        // so results are addressed purely by position.
        let container = Selector::parse("body > div > div > main > div").unwrap();
        let title_sel = Selector::parse("h2 > a").unwrap();
        let desc_sel = Selector::parse("p").unwrap();

        let Some(list) = doc.select(&container).next() else {
            return Vec::new();
        };

        list.child_elements()
            .map(|e| {
                let mut v = SearchResult::new(&self.name);

                if let Some(a) = e.select(&title_sel).next() {
                    v.link = clean_url(a.value().attr("href").unwrap_or_default());
                    v.title = a.text().collect::<String>().trim().to_string();
                }

                if let Some(p) = e.select(&desc_sel).next() {
                    v.description = p.text().collect::<String>().trim().to_string();
                }

                v
            })
            .collect()
    }
}

#[async_trait]
impl Engine for Marginalia {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let mut pairs = vec![("query", query.to_string())];
        if page >= 1 {
            pairs.push(("page", (page + 1).to_string()));
        }

        let qs = query_string(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let doc = self
            .http
            .get_html(&format!("https://marginalia-search.com/search?{qs}"))
            .await?;

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http
            .get("https://marginalia-search.com")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_results() {
        let doc = Html::parse_document(
            r#"
            <body><div><div><main><div>
              <div>
                <h2><a href="https://old.example.net/page">Old Web Page</a></h2>
                <p>Some text from the page.</p>
              </div>
              <div>
                <h2><a href="https://other.example.net/">Another Page</a></h2>
                <p>More text.</p>
              </div>
            </div></main></div></div></body>
            "#,
        );

        let m = Marginalia {
            name: "marginalia".to_string(),
            http: HttpClient::from_settings(&EngineSettings::default()).unwrap(),
        };

        let res = m.parse(&doc);
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].link, "https://old.example.net/page");
        assert_eq!(res[0].title, "Old Web Page");
        assert_eq!(res[0].description, "Some text from the page.");
        assert_eq!(res[1].title, "Another Page");
    }
}
