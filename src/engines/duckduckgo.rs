//! DuckDuckGo, through the lite frontend
//!
//! The lite frontend is a plain HTML page meant for text browsers, which
//! makes it by far the easiest DuckDuckGo surface to scrape. It wants a
//! `vqd` token with every query past the first page; without one the bot
//! detection kicks in and answers 202.

use super::{Engine, EngineError};
use crate::config::EngineSettings;
use crate::network::HttpClient;
use crate::results::{clean_url, SearchResult};
use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const LITE_URL: &str = "https://lite.duckduckgo.com/lite/";

pub struct DuckDuckGo {
    name: String,
    http: HttpClient,

    // The vqd parameter is different for every query. Entries are written
    // on every successful response and live for the rest of the process;
    // last write wins if two queries race.
    vqd: RwLock<HashMap<String, String>>,
}

pub fn factory(cfg: &EngineSettings) -> Result<Arc<dyn Engine>> {
    Ok(Arc::new(DuckDuckGo {
        name: cfg.name.clone(),
        http: HttpClient::with_cookie_jar(cfg)?,
        vqd: RwLock::new(HashMap::new()),
    }))
}

/// Determines the `s` and `dc` parameters from a page number.
fn page_params(page: u32) -> (u32, u32) {
    match page {
        0 => (0, 0),
        // Page 1 carries 24 results for whatever reason; everything after
        // it carries 50.
        1 => (24, 25),
        n => (24 + (n - 1) * 50, 25 + (n - 1) * 50),
    }
}

/// Quote bang tokens so DuckDuckGo treats them as part of the query
/// instead of one of its own redirect operators.
fn encode_query(query: &str) -> String {
    if !query.contains('!') {
        return query.to_string();
    }

    query
        .split(' ')
        .map(|tok| {
            if tok.starts_with('!') {
                format!("'{tok}'")
            } else {
                tok.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl DuckDuckGo {
    fn lookup_vqd(&self, query: &str) -> Option<String> {
        self.vqd.read().unwrap().get(query).cloned()
    }

    fn set_vqd(&self, query: &str, val: String) {
        self.vqd.write().unwrap().insert(query.to_string(), val);
    }

    fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let table = Selector::parse(r#"div.filters > table[border="0"]"#).unwrap();
        let tr = Selector::parse("tr").unwrap();
        let link_sel = Selector::parse("a.result-link").unwrap();
        let snippet_sel = Selector::parse(".result-snippet").unwrap();

        // The third filter table holds the results, in groups of four rows:
        // 1. number, title and link
        // 2. description
        // 3. timestamp
        // 4. nothing
        let Some(results_table) = doc.select(&table).nth(2) else {
            return Vec::new();
        };

        let rows: Vec<_> = results_table.select(&tr).collect();
        let mut results = Vec::with_capacity(rows.len() / 4);

        for group in rows.chunks(4) {
            let mut v = SearchResult::new(&self.name);

            if let Some(link) = group[0].select(&link_sel).next() {
                v.link = link.value().attr("href").unwrap_or_default().to_string();
                v.title = link.text().collect::<String>().trim().to_string();
            }

            // Ads route through DuckDuckGo's click tracker; drop them along
            // with anything that has no link at all.
            if v.link.is_empty() || v.link.starts_with("https://duckduckgo.com/y.js") {
                continue;
            }
            v.link = clean_url(&v.link);

            if let Some(desc) = group.get(1).and_then(|row| row.select(&snippet_sel).next()) {
                v.description = desc.text().collect::<String>().trim().to_string();
            }

            results.push(v);
        }

        results
    }
}

#[async_trait]
impl Engine for DuckDuckGo {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError> {
        let body = {
            let mut ser = url::form_urlencoded::Serializer::new(String::new());
            ser.append_pair("q", &encode_query(query));
            if let Some(vqd) = self.lookup_vqd(query) {
                ser.append_pair("vqd", &vqd);
            }

            if page >= 1 {
                // These are not present in the initial request.
                ser.append_pair("api", "d.js");
                ser.append_pair("o", "json");
                ser.append_pair("v", "l");
                ser.append_pair("nextParams", "");

                let (s, dc) = page_params(page);
                ser.append_pair("s", &s.to_string());
                ser.append_pair("dc", &dc.to_string());
            }

            ser.finish()
        };
        let res = self.http.post_form(LITE_URL, body).await?;

        // 202 is how the lite frontend spells "please solve a captcha".
        // It counts as a success at the HTTP layer, so it has to be caught
        // here before the body gets mistaken for an empty result page.
        if res.status == 202 {
            return Err(EngineError::Captcha);
        }

        let doc = Html::parse_document(&res.text());

        let vqd = doc
            .select(&Selector::parse(r#"input[name="vqd"]"#).unwrap())
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap_or_default();
        self.set_vqd(query, vqd.to_string());

        Ok(self.parse(&doc))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        self.http.get(LITE_URL).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_match_the_lite_frontend() {
        let tests = [
            (0, 0, 0),
            (1, 24, 25),
            (2, 74, 75),
            (3, 124, 125),
            (4, 174, 175),
        ];

        for (page, s, dc) in tests {
            assert_eq!(page_params(page), (s, dc), "page {page}");
        }
    }

    #[test]
    fn bangs_are_quoted() {
        assert_eq!(encode_query("plain query"), "plain query");
        assert_eq!(encode_query("!g hello"), "'!g' hello");
        assert_eq!(encode_query("price !w test"), "price '!w' test");
    }

    fn ddg() -> DuckDuckGo {
        DuckDuckGo {
            name: "ddg".to_string(),
            http: HttpClient::from_settings(&EngineSettings::default()).unwrap(),
            vqd: RwLock::new(HashMap::new()),
        }
    }

    fn lite_page() -> &'static str {
        r#"
        <form><input name="vqd" value="4-12345"></form>
        <div class="filters">
          <table border="0"><tr><td>header</td></tr></table>
          <table border="0"><tr><td>nav</td></tr></table>
          <table border="0">
            <tr><td><a class="result-link" href="https://example.com/one">One</a></td></tr>
            <tr><td class="result-snippet">First snippet.</td></tr>
            <tr><td>2021-01-01</td></tr>
            <tr></tr>
            <tr><td><a class="result-link" href="https://duckduckgo.com/y.js?ad">Ad</a></td></tr>
            <tr><td class="result-snippet">Ad snippet.</td></tr>
            <tr><td></td></tr>
            <tr></tr>
            <tr><td><a class="result-link" href="https://example.org/two?ref=ddg">Two</a></td></tr>
            <tr><td class="result-snippet">Second snippet.</td></tr>
            <tr><td>2021-01-02</td></tr>
            <tr></tr>
          </table>
        </div>
        "#
    }

    #[test]
    fn parses_result_groups_and_skips_ads() {
        let doc = Html::parse_document(lite_page());
        let res = ddg().parse(&doc);

        assert_eq!(res.len(), 2);
        assert_eq!(res[0].link, "https://example.com/one");
        assert_eq!(res[0].title, "One");
        assert_eq!(res[0].description, "First snippet.");
        assert_eq!(res[1].link, "https://example.org/two");
        assert_eq!(res[1].sources, vec!["ddg"]);
    }

    #[test]
    fn vqd_cache_round_trips() {
        let d = ddg();
        assert_eq!(d.lookup_vqd("rust"), None);
        d.set_vqd("rust", "4-678".to_string());
        assert_eq!(d.lookup_vqd("rust"), Some("4-678".to_string()));
    }
}
