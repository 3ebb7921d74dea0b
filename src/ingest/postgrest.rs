//! REST client for the hosted backend (PostgREST dialect).
//!
//! Issues the list query, the single-row query and per-table probes against
//! `{url}/rest/v1/{table}`. Every request carries the anon key both as the
//! `apikey` header and as a bearer token.
//!
//! API reference: https://postgrest.org/en/stable/references/api.html

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::BackendConfig;
use crate::ingest::{CompanyRow, RowSource};
use crate::logging::{self, Source};
use crate::model::BackendError;
use crate::tables::{self, PRIMARY_KEY, PRIMARY_TABLE};

// ============================================================================
// Client
// ============================================================================

pub struct RestClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

/// Result of probing one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableProbe {
    /// Rows returned by the `limit=1` probe (0 or 1).
    pub sample_rows: usize,
    /// Total row count from `Content-Range`, when the backend reports it.
    pub total_rows: Option<u64>,
}

impl RestClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: std::time::Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let (url, key) = config.credentials()?;
        Self::new(url, key, config.timeout())
    }

    /// REST endpoint for a table.
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn get(&self, table: &str) -> RequestBuilder {
        self.http
            .get(self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
    }

    /// Every company with its seven relations embedded.
    pub fn fetch_all_companies(&self) -> Result<Vec<CompanyRow>, BackendError> {
        let request = self
            .get(PRIMARY_TABLE)
            .query(&[("select", tables::build_select_clause())]);
        let rows: Vec<CompanyRow> = self.send_json(request, "fetch all companies")?;
        logging::debug(
            Source::Rest,
            Some(PRIMARY_TABLE),
            &format!("received {} rows", rows.len()),
        );
        Ok(rows)
    }

    /// One company by primary key; `None` when no row matches.
    pub fn fetch_company(&self, company_id: &str) -> Result<Option<CompanyRow>, BackendError> {
        let request = self.get(PRIMARY_TABLE).query(&[
            ("select", tables::build_select_clause()),
            (PRIMARY_KEY, format!("eq.{}", company_id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<CompanyRow> = self.send_json(request, "fetch company")?;
        Ok(rows.into_iter().next())
    }

    /// Reads one row of `table` and asks for an exact total count.
    pub fn probe_table(&self, table: &str) -> Result<TableProbe, BackendError> {
        let request = self
            .get(table)
            .header("Prefer", "count=exact")
            .query(&[("select", "*"), ("limit", "1")]);
        let response = self.send(request, table, "probe")?;
        let total_rows = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let sample: Vec<serde_json::Value> = decode(response, table, "probe")?;
        Ok(TableProbe {
            sample_rows: sample.len(),
            total_rows,
        })
    }

    fn send(&self, request: RequestBuilder, table: &str, operation: &str) -> Result<Response, BackendError> {
        let response = request.send().map_err(|e| {
            let err = BackendError::from(e);
            logging::log_backend_failure(Source::Rest, Some(table), operation, &err);
            err
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            let err = BackendError::Http { status, body };
            logging::log_backend_failure(Source::Rest, Some(table), operation, &err);
            return Err(err);
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, operation: &str) -> Result<T, BackendError> {
        let response = self.send(request, PRIMARY_TABLE, operation)?;
        decode(response, PRIMARY_TABLE, operation)
    }
}

fn decode<T: DeserializeOwned>(response: Response, table: &str, operation: &str) -> Result<T, BackendError> {
    let body = response.text()?;
    serde_json::from_str(&body).map_err(|e| {
        let err = BackendError::Parse(e.to_string());
        logging::log_backend_failure(Source::Rest, Some(table), operation, &err);
        err
    })
}

impl RowSource for RestClient {
    fn fetch_rows(&self) -> Result<Vec<CompanyRow>, BackendError> {
        self.fetch_all_companies()
    }

    fn fetch_row(&self, company_id: &str) -> Result<Option<CompanyRow>, BackendError> {
        self.fetch_company(company_id)
    }
}

/// Total from a `Content-Range` header: `0-0/42` → 42, `*/0` → 0,
/// `0-24/*` → unknown.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

// ============================================================================
// Tests
// ============================================================================
