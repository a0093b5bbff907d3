//! Engine adapters
//!
//! Every upstream search provider gets one adapter that shapes the request
//! the way that provider expects and digs results out of whatever comes
//! back, HTML or JSON.

mod registry;

pub mod bing;
pub mod brave;
pub mod duckduckgo;
pub mod google;
pub mod marginalia;
pub mod mediawiki;
pub mod wiby;
pub mod yahoo;
pub mod yandex;

pub use registry::{builtin, Registry};

use crate::results::SearchResult;
use async_trait::async_trait;
use thiserror::Error;

/// Errors an engine can report for a single search or ping.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The upstream answered with a status code we will not touch.
    #[error("{method} {url:?} failed with status code {status}")]
    Status {
        status: u16,
        method: String,
        url: String,
    },

    /// The upstream challenged us with a captcha.
    #[error("engine wants you to solve a captcha")]
    Captcha,

    /// The response did not have the structure the adapter expects.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Connection, TLS, timeout or any other transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body could not be decompressed.
    #[error("failed to decode body: {0}")]
    Decode(#[from] std::io::Error),
}

/// The capability every engine adapter provides.
///
/// `page` is zero-indexed: page 0 is the first page of results.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Query the engine and return its results, tagged with this engine's
    /// name as the sole source.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, EngineError>;

    /// Check that the engine is reachable.
    async fn ping(&self) -> Result<(), EngineError>;
}

/// Build a query string out of key/value pairs.
pub(crate) fn query_string<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        ser.append_pair(k, v);
    }
    ser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_strings_are_urlencoded() {
        let qs = query_string([("q", "hello world"), ("p", "2")]);
        assert_eq!(qs, "q=hello+world&p=2");
    }

    #[test]
    fn status_errors_name_the_request() {
        let err = EngineError::Status {
            status: 429,
            method: "GET".to_string(),
            url: "https://example.com/search".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GET \"https://example.com/search\" failed with status code 429"
        );
    }
}
