//! HTTP request handlers

use super::AppState;
use crate::engines;
use crate::results::SearchResult;
use crate::search::{SearchError, SearchOutcome};
use axum::extract::{Form, Query, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::Context;
use tracing::error;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub p: Option<u32>,
}

/// JSON shape of a search response, for `Accept: application/json`.
#[derive(Debug, Serialize)]
struct SearchApiResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    results: Vec<SearchResult>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    errors: HashMap<String, String>,
}

fn render(state: &AppState, template: &str, ctx: &mut Context) -> Response {
    render_with_status(state, template, ctx, StatusCode::OK)
}

fn render_with_status(
    state: &AppState,
    template: &str,
    ctx: &mut Context,
    status: StatusCode,
) -> Response {
    ctx.insert("base_url", &state.settings.base_url);
    ctx.insert("version", crate::VERSION);

    match state.templates.render(template, ctx) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("executing template {template:?} failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

/// The value of one cookie out of the Cookie header, if present.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

/// The engines the user asked for, from the settings cookie. A missing or
/// blank cookie means the default set.
fn wanted_engines(headers: &HeaderMap) -> Vec<String> {
    match cookie_value(headers, "engines") {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .split(',')
            .map(|s| s.to_string())
            .collect(),
        _ => engines::builtin().defaults().to_vec(),
    }
}

pub async fn index(State(state): State<AppState>) -> Response {
    render(&state, "index.html", &mut Context::new())
}

pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    do_search(state, headers, params).await
}

pub async fn search_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(params): Form<SearchParams>,
) -> Response {
    do_search(state, headers, params).await
}

async fn do_search(state: AppState, headers: HeaderMap, params: SearchParams) -> Response {
    let query = params.q.unwrap_or_default();
    let page = params.p.unwrap_or(0);
    let wanted = wanted_engines(&headers);

    let (status, results, errors, fatal) =
        match state.searcher.search(&query, page, &wanted).await {
            Ok(SearchOutcome { results, errors }) => {
                let status = if results.is_empty() {
                    // Nothing found, but nothing fatally wrong either.
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::OK
                };
                (status, results, stringify_errors(errors), None)
            }
            Err(e) => {
                let errors = match &e {
                    SearchError::AllEnginesFailed { errors } => errors
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_string()))
                        .collect(),
                    _ => HashMap::new(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Vec::new(),
                    errors,
                    Some(e.to_string()),
                )
            }
        };

    // Content negotiation is an exact match on Accept; browsers send a
    // long list and get HTML, API clients ask for JSON and get JSON.
    let is_api = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "application/json")
        .unwrap_or(false);

    if is_api {
        return (status, Json(SearchApiResponse { results, errors })).into_response();
    }

    let mut ctx = Context::new();
    ctx.insert("title", &query);
    ctx.insert("query", &query);
    ctx.insert("page", &page);
    ctx.insert("results", &results);
    ctx.insert("errors", &errors);
    ctx.insert("error", &fatal);

    render_with_status(&state, "search.html", &mut ctx, status)
}

fn stringify_errors(
    errors: HashMap<String, crate::engines::EngineError>,
) -> HashMap<String, String> {
    errors
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
}

pub async fn settings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut ctx = Context::new();
    ctx.insert("title", "Settings");
    ctx.insert("engines", &state.searcher.engine_names());
    ctx.insert("selected", &wanted_engines(&headers));
    render(&state, "settings.html", &mut ctx)
}

pub async fn save_settings(Form(fields): Form<Vec<(String, String)>>) -> Response {
    let wanted: Vec<String> = fields
        .into_iter()
        .filter(|(k, _)| k == "engine")
        .map(|(_, v)| v)
        .collect();

    if wanted.is_empty() {
        return (StatusCode::BAD_REQUEST, "invalid form submitted").into_response();
    }

    (
        StatusCode::FOUND,
        [
            (SET_COOKIE, format!("engines={}", wanted.join(","))),
            (LOCATION, "/settings".to_string()),
        ],
    )
        .into_response()
}

pub async fn stats(State(state): State<AppState>) -> Response {
    let names = state.searcher.engine_names();
    let snapshot = state.searcher.stats().snapshot(&names);

    let mut ctx = Context::new();
    ctx.insert("title", "Stats");
    ctx.insert("stats", &snapshot);
    render(&state, "stats.html", &mut ctx)
}

pub async fn opensearch(State(state): State<AppState>) -> Response {
    let mut ctx = Context::new();
    ctx.insert("base_url", &state.settings.base_url);
    ctx.insert("version", crate::VERSION);

    match state.templates.render("opensearch.xml", &ctx) {
        Ok(xml) => (
            [(CONTENT_TYPE, "application/opensearchdescription+xml")],
            xml,
        )
            .into_response(),
        Err(e) => {
            error!("executing template \"opensearch.xml\" failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

pub async fn robots_txt() -> &'static str {
    "User-agent: *\nDisallow: /search\n"
}

pub async fn stylesheet() -> Response {
    (
        [(CONTENT_TYPE, "text/css")],
        include_str!("../templates/style.css"),
    )
        .into_response()
}
