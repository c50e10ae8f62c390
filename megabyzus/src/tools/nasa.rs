//! NASA Technology Transfer search tools: patents, software and spinoffs.
//!
//! The HTTP lookup sits behind [`TechTransferSearch`] so the executor can be driven by a
//! stub in tests. [`TechTransferClient`] is the real implementation; it calls
//! `GET {base}/{patent|software|spinoff}/{query}?page=N` and follows pagination.
//!
//! The API returns each hit as a positional array. [`format_results`] maps the columns to
//! named fields, filters by NASA center and truncates to `max_results`.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ToolError;

pub const TOOL_SEARCH_PATENTS: &str = "search_patents";
pub const TOOL_SEARCH_SOFTWARE: &str = "search_software";
pub const TOOL_SEARCH_SPINOFFS: &str = "search_spinoffs";

/// Default base URL of the NASA Technology Transfer query API.
pub const TECH_TRANSFER_API_BASE: &str = "http://technology.nasa.gov/api/query";

const DEFAULT_MAX_RESULTS: u32 = 10;
const DEFAULT_MAX_PAGES: u32 = 5;

/// Named fields for the positional columns of one API hit, in column order.
const RESULT_FIELDS: [&str; 10] = [
    "id",
    "case_number",
    "title",
    "description",
    "primary_contact",
    "category",
    "website",
    "status",
    "date",
    "center",
];
const CENTER_COLUMN: usize = 9;

/// Which Technology Transfer collection to search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchCategory {
    Patent,
    Software,
    Spinoff,
}

impl SearchCategory {
    /// Path segment used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patent => "patent",
            Self::Software => "software",
            Self::Spinoff => "spinoff",
        }
    }
}

/// Input shared by the three search tools.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SearchInput {
    pub query: String,
    #[serde(default)]
    pub center: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

pub(crate) fn search_schema(subject: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "minLength": 1,
                "description": format!("Search term or keywords to find relevant {}.", subject)
            },
            "center": {
                "type": "string",
                "description": "Filter by NASA center (e.g., 'JPL', 'GSFC', 'JSC')."
            },
            "max_results": {
                "type": "integer",
                "minimum": 1,
                "maximum": 50,
                "default": DEFAULT_MAX_RESULTS,
                "description": "Maximum number of results to return (1-50)."
            }
        },
        "required": ["query"],
        "additionalProperties": false
    })
}

/// Raw hits for one search, across all fetched pages.
#[derive(Clone, Debug, Default)]
pub struct RawResults {
    pub rows: Vec<Vec<Value>>,
    /// Total reported by the API (may exceed `rows.len()` when pagination was capped).
    pub total: u64,
}

/// Lookup against the Technology Transfer API.
#[async_trait]
pub trait TechTransferSearch: Send + Sync {
    /// `limit` is how many distinct hits the caller will keep; `None` means every page
    /// may matter (e.g. results are filtered afterwards).
    async fn search(
        &self,
        category: SearchCategory,
        query: &str,
        limit: Option<usize>,
    ) -> Result<RawResults, ToolError>;
}

#[derive(Deserialize)]
struct PageResponse {
    #[serde(default)]
    results: Vec<Vec<Value>>,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    perpage: Option<u64>,
}

/// reqwest-backed [`TechTransferSearch`].
pub struct TechTransferClient {
    base_url: String,
    client: reqwest::Client,
    max_pages: u32,
}

impl TechTransferClient {
    pub fn new() -> Self {
        Self::with_client(TECH_TRANSFER_API_BASE, reqwest::Client::new())
    }

    /// Custom base URL and client (timeouts, proxies, test servers).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Caps how many pages one search may fetch.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn page_url(&self, category: SearchCategory, query: &str) -> Result<reqwest::Url, ToolError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ToolError::Execution(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ToolError::Execution("base url cannot have path segments".to_string()))?
            .push(category.as_str())
            .push(query);
        Ok(url)
    }

    async fn fetch_page(
        &self,
        url: &reqwest::Url,
        page: u32,
    ) -> Result<PageResponse, ToolError> {
        let response = self
            .client
            .get(url.clone())
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "NASA API error {}: {}",
                status, body
            )));
        }

        response
            .json::<PageResponse>()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to parse response: {}", e)))
    }
}

impl Default for TechTransferClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TechTransferSearch for TechTransferClient {
    async fn search(
        &self,
        category: SearchCategory,
        query: &str,
        limit: Option<usize>,
    ) -> Result<RawResults, ToolError> {
        let url = self.page_url(category, query)?;
        let mut out = RawResults::default();
        let mut seen = HashSet::new();
        for page in 0..self.max_pages {
            tracing::debug!(category = category.as_str(), query, page, "NASA search page");
            let data = self.fetch_page(&url, page).await?;
            if page == 0 {
                out.total = data.total;
            }
            let per_page = data.perpage.unwrap_or(10).max(1);
            let fetched = data.results.len();
            seen.extend(data.results.iter().filter_map(|row| row_key(row)));
            out.rows.extend(data.results);
            let total_pages = (out.total + per_page - 1) / per_page;
            if fetched == 0 || u64::from(page) + 1 >= total_pages {
                break;
            }
            if limit.is_some_and(|n| seen.len() >= n) {
                break;
            }
        }
        Ok(out)
    }
}

fn row_key(row: &[Value]) -> Option<String> {
    row.first().filter(|id| !id.is_null()).map(Value::to_string)
}

/// Drops rows whose id (column 0) was already seen; rows without an id are kept.
pub fn remove_duplicates(rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| match row_key(row) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

fn format_row(row: &[Value]) -> Value {
    let mut obj = serde_json::Map::new();
    for (i, field) in RESULT_FIELDS.iter().enumerate() {
        let v = row
            .get(i)
            .cloned()
            .unwrap_or_else(|| Value::String("Unknown".to_string()));
        obj.insert(field.to_string(), v);
    }
    Value::Object(obj)
}

fn matches_center(row: &[Value], center: &str) -> bool {
    let needle = center.to_lowercase();
    row.get(CENTER_COLUMN)
        .and_then(Value::as_str)
        .map(|c| c.to_lowercase().contains(&needle))
        .unwrap_or(false)
}

/// Builds the tool output: `{status, query, total_found, returning, results}`.
pub fn format_results(input: &SearchInput, rows: Vec<Vec<Value>>) -> Value {
    let rows = remove_duplicates(rows);
    let total_found = rows.len();
    let center = input
        .center
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let results: Vec<Value> = rows
        .iter()
        .filter(|row| center.map(|c| matches_center(row, c)).unwrap_or(true))
        .take(input.max_results as usize)
        .map(|row| format_row(row))
        .collect();
    json!({
        "status": "success",
        "query": input.query,
        "total_found": total_found,
        "returning": results.len(),
        "results": results,
    })
}

/// Runs one search tool call.
pub async fn search(
    backend: &dyn TechTransferSearch,
    category: SearchCategory,
    input: &SearchInput,
) -> Result<Value, ToolError> {
    let query = input.query.trim();
    if query.is_empty() {
        return Err(ToolError::Execution("Search query is required".to_string()));
    }
    tracing::info!(category = category.as_str(), query, "searching NASA technology transfer");
    let has_center = input
        .center
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    let limit = (!has_center).then_some(input.max_results as usize);
    let raw = backend.search(category, query, limit).await?;
    Ok(format_results(input, raw.rows))
}
