//! Browser-mimicking HTTP client
//!
//! Each engine owns one [`HttpClient`]. Requests carry the header set of a
//! current Chrome desktop build; most upstreams refuse or degrade service for
//! anything that looks like a bot.

use super::decode_body;
use crate::config::EngineSettings;
use crate::engines::EngineError;
use anyhow::{Context, Result};
use reqwest::redirect::Policy;
use reqwest::{Method, Proxy};
use scraper::Html;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Headers sent with every request unless an engine overrides them.
///
/// The order mirrors what Chrome sends; the transport does not guarantee it
/// survives onto the wire, but it is preserved where the stack allows.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "sec-ch-ua",
        r#""Chromium";v="130", "Not)A;Brand";v="24", "Google Chrome";v="130""#,
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""Windows""#),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,\
         image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-User", "?1"),
    ("Sec-Fetch-Dest", "document"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Accept-Language", "en-US,en;q=0.9"),
];

/// HTTP client wrapper that handles request shaping, redirects, timeouts and
/// response decompression for engine adapters.
pub struct HttpClient {
    client: reqwest::Client,
    user_agent: String,
    /// Replaces [`BROWSER_HEADERS`] entirely when set. Yandex serves fewer
    /// captchas to clients that do not pretend to be Chrome.
    base_headers: Option<Vec<(&'static str, String)>>,
    quic: bool,
    debug: bool,
}

/// A decoded HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    body: Vec<u8>,
}

impl HttpResponse {
    /// The decompressed response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The response body as text.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

impl HttpClient {
    /// Create a client for an engine according to its configuration.
    pub fn from_settings(cfg: &EngineSettings) -> Result<Self> {
        Self::build(cfg, false)
    }

    /// Like [`HttpClient::from_settings`], but persists cookies between
    /// requests to the same host.
    pub fn with_cookie_jar(cfg: &EngineSettings) -> Result<Self> {
        Self::build(cfg, true)
    }

    fn build(cfg: &EngineSettings, cookies: bool) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .redirect(Policy::limited(5))
            .cookie_store(cookies);

        match cfg.http_proxy.as_str() {
            // `-` also suppresses the HTTP_PROXY environment variable, which
            // the client consults by default.
            "-" => builder = builder.no_proxy(),
            "" => {}
            proxy => {
                builder = builder.proxy(
                    Proxy::all(proxy)
                        .with_context(|| format!("invalid proxy {proxy:?}"))?,
                )
            }
        }

        #[cfg(feature = "http3")]
        if cfg.quic {
            builder = builder.http3_prior_knowledge();
            if cfg.quic_0rtt {
                // Safe to replay: every request scour sends is idempotent.
                builder = builder.tls_early_data(true);
            }
        }

        let client = builder
            .build()
            .context("failed to build the HTTP client")?;

        Ok(Self {
            client,
            user_agent: cfg.user_agent().to_string(),
            base_headers: None,
            quic: cfg.quic,
            debug: cfg.debug,
        })
    }

    /// Override the user agent after construction.
    pub fn set_user_agent(&mut self, ua: impl Into<String>) {
        self.user_agent = ua.into();
    }

    /// Replace the default browser header set.
    pub fn set_base_headers(&mut self, headers: Vec<(&'static str, String)>) {
        self.base_headers = Some(headers);
    }

    /// Perform a GET request.
    ///
    /// A response with a non-2xx status code is returned as
    /// [`EngineError::Status`]; its body is discarded.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, EngineError> {
        self.execute(Method::GET, url, None).await
    }

    /// Perform a GET request and parse the body as HTML.
    ///
    /// The returned document must be consumed before the caller suspends
    /// again; it cannot be carried across an await point.
    pub async fn get_html(&self, url: &str) -> Result<Html, EngineError> {
        let res = self.get(url).await?;
        Ok(Html::parse_document(&res.text()))
    }

    /// Perform a form-urlencoded POST request.
    pub async fn post_form(
        &self,
        url: &str,
        body: String,
    ) -> Result<HttpResponse, EngineError> {
        self.execute(Method::POST, url, Some(body)).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        form_body: Option<String>,
    ) -> Result<HttpResponse, EngineError> {
        if self.debug {
            debug!(%method, url, "sending request");
        }

        let res = match self.send(method.clone(), url, form_body.clone()).await {
            Ok(res) => res,
            // QUIC servers occasionally drop a connection with no
            // application error code; the request is idempotent, so one
            // immediate retry is allowed.
            Err(e) if self.quic && e.is_connect() => {
                self.send(method.clone(), url, form_body).await?
            }
            Err(e) => return Err(e.into()),
        };

        let status = res.status();
        let final_url = res.url().to_string();

        if !status.is_success() {
            return Err(EngineError::Status {
                status: status.as_u16(),
                method: method.as_str().to_string(),
                url: url.to_string(),
            });
        }

        let encoding = res
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let raw = res.bytes().await?;
        let body = decode_body(encoding.as_deref(), &raw)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            url: final_url,
            body,
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        form_body: Option<String>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut req = self.client.request(method, url);

        match &self.base_headers {
            Some(headers) => {
                req = req.header("User-Agent", &self.user_agent);
                for (name, value) in headers {
                    req = req.header(*name, value);
                }
            }
            None => {
                for (name, value) in BROWSER_HEADERS {
                    // The user agent slots in after the upgrade header to
                    // match Chrome's ordering.
                    if *name == "Upgrade-Insecure-Requests" {
                        req = req.header(*name, *value);
                        req = req.header("User-Agent", &self.user_agent);
                    } else {
                        req = req.header(*name, *value);
                    }
                }
            }
        }

        if let Some(body) = form_body {
            req = req.header("Content-Type", FORM_CONTENT_TYPE).body(body);
        }

        req.send().await
    }
}
