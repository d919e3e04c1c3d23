// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! PostgREST implementation of the table backend.
//!
//! Speaks the standard PostgREST URL grammar: filters as
//! `column=op.value` query pairs, `order=col.asc`, `limit=n`, and
//! `Prefer: return=representation` when the caller wants the affected
//! rows back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::client::{BackendError, TableBackend};
use super::request::{Action, Filter, FilterOp, Row, TableRequest};
use crate::config::Config;

/// Timeout for establishing the HTTP connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the whole request/response round-trip
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body shape PostgREST responds with on failures
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

pub struct PostgrestClient {
    http: reqwest::Client,
    base_url: String,
}

impl PostgrestClient {
    /// Build a client from configuration. The API key, when present, is
    /// sent both as `apikey` and as a bearer token, matching what the
    /// hosted PostgREST offerings expect from service-role callers.
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let base_url = config
            .url
            .as_deref()
            .ok_or_else(|| BackendError::Transport("no backend URL configured".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        if let Some(key) = config.key.as_deref() {
            let apikey = HeaderValue::from_str(key)
                .map_err(|e| BackendError::Transport(format!("invalid API key: {e}")))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| BackendError::Transport(format!("invalid API key: {e}")))?;
            headers.insert("apikey", apikey);
            headers.insert(reqwest::header::AUTHORIZATION, bearer);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }
}

#[async_trait]
impl TableBackend for PostgrestClient {
    async fn execute(&self, request: TableRequest) -> Result<Vec<Row>, BackendError> {
        let url = self.endpoint(&request.table);
        let pairs = query_pairs(&request);

        debug!(table = %request.table, url = %url, params = ?pairs, "dispatching table request");

        let builder = match &request.action {
            Action::Select => self.http.get(&url),
            Action::Insert(rows) => self.http.post(&url).json(rows),
            Action::Update(patch) => self.http.patch(&url).json(patch),
            Action::Delete => self.http.delete(&url),
        };

        let builder = if request.is_mutation() {
            let prefer = if request.returning {
                "return=representation"
            } else {
                "return=minimal"
            };
            builder.header("Prefer", prefer)
        } else {
            builder
        };

        let response = builder
            .query(&pairs)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str::<Vec<Row>>(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

fn api_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => BackendError::Api {
            status,
            code: parsed.code,
            message: parsed
                .message
                .unwrap_or_else(|| format!("http status {status}")),
            details: parsed.details,
            hint: parsed.hint,
        },
        Err(_) => BackendError::Api {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("http status {status}")
            } else {
                body.trim().to_string()
            },
            details: None,
            hint: None,
        },
    }
}

/// Render a request into PostgREST query-string pairs.
///
/// Kept free of I/O so the URL grammar is testable on its own.
fn query_pairs(request: &TableRequest) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    match &request.action {
        Action::Select => {
            let select = match &request.columns {
                Some(columns) if !columns.is_empty() => columns.join(","),
                _ => "*".to_string(),
            };
            pairs.push(("select".to_string(), select));
        }
        _ if request.returning => {
            pairs.push(("select".to_string(), "*".to_string()));
        }
        _ => {}
    }

    for filter in &request.filters {
        pairs.push((filter.column.clone(), render_filter(filter)));
    }

    if !request.order.is_empty() {
        let order = request
            .order
            .iter()
            .map(|term| {
                let dir = if term.ascending { "asc" } else { "desc" };
                format!("{}.{}", term.column, dir)
            })
            .collect::<Vec<_>>()
            .join(",");
        pairs.push(("order".to_string(), order));
    }

    if let Some(limit) = request.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }

    pairs
}

fn render_filter(filter: &Filter) -> String {
    format!(
        "{}.{}",
        filter.op.as_str(),
        render_filter_value(filter.op, &filter.value)
    )
}

fn render_filter_value(op: FilterOp, value: &Value) -> String {
    if op == FilterOp::In {
        let items = match value {
            Value::Array(items) => items.iter().map(render_in_item).collect::<Vec<_>>(),
            other => vec![render_in_item(other)],
        };
        return format!("({})", items.join(","));
    }

    render_scalar(value)
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Items inside `in.(...)` need quoting so embedded commas survive
fn render_in_item(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        other => other.to_string(),
    }
}
