//! HTTP client for the `RegionIQ` Data API observations endpoint.
//!
//! Queries use the `PxWeb`-style grammar of `POST /api/v1/observations/query`:
//! one selection per dimension (`metric`, `region`, `time_period`,
//! `scenario`, `measure`). Region codes are sent in chunks and truncated
//! responses are followed through `meta.next_cursor`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use regioniq_geofence_models::{MetricId, Scenario};
use serde::{Deserialize, Serialize};

use crate::measure::{Measure, ObservationValues, measure_for_scenario, pick_value};
use crate::{MetricError, MetricStore};

/// Path of the observations query endpoint, relative to the base URL.
pub const QUERY_PATH: &str = "/api/v1/observations/query";

/// Maximum number of region codes per request.
pub const REGION_CHUNK_SIZE: usize = 100;

/// Records requested per page.
pub const DEFAULT_LIMIT: usize = 50_000;

/// Retries for connection failures, HTTP 429, and HTTP 5xx.
const MAX_RETRIES: u32 = 3;

/// Upper bound on pages followed for one chunk.
const MAX_PAGES: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`MetricStore`] backed by the `RegionIQ` Data API.
pub struct DataApiMetricStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DataApiMetricStore {
    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, MetricError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Creates a client from `REGIONIQ_DATA_API_URL` and the optional
    /// `REGIONIQ_DATA_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::Config`] if the URL is not set.
    pub fn from_env() -> Result<Self, MetricError> {
        Self::from_config(
            std::env::var("REGIONIQ_DATA_API_URL").ok(),
            std::env::var("REGIONIQ_DATA_API_TOKEN").ok(),
        )
    }

    /// Creates a client from optional configuration values, treating
    /// blank values as unset.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::Config`] if `base_url` is missing.
    pub fn from_config(
        base_url: Option<String>,
        token: Option<String>,
    ) -> Result<Self, MetricError> {
        let non_blank = |s: String| {
            let s = s.trim().to_string();
            (!s.is_empty()).then_some(s)
        };
        let base_url = base_url
            .and_then(non_blank)
            .ok_or_else(|| MetricError::Config {
                message: "REGIONIQ_DATA_API_URL is not set".to_string(),
            })?;
        Self::new(base_url, token.and_then(non_blank))
    }

    fn query_url(&self) -> String {
        format!("{}{QUERY_PATH}", self.base_url)
    }

    /// Fetches every page for one chunk of region codes.
    async fn fetch_chunk(
        &self,
        codes: &[String],
        metric: MetricId,
        year: u16,
        scenario: Scenario,
    ) -> Result<Vec<ObservationRecord>, MetricError> {
        let measure = measure_for_scenario(scenario);
        let mut request = QueryRequest::new(codes, metric, year, scenario, measure);
        let mut records = Vec::new();

        for _ in 0..MAX_PAGES {
            let response = self.send(&request).await?;
            for warning in &response.meta.warnings {
                log::warn!("Data API warning for {metric}: {warning}");
            }
            records.extend(response.data);

            match response.meta.next_cursor {
                Some(cursor) if response.meta.truncated => request.cursor = Some(cursor),
                _ => return Ok(records),
            }
        }

        log::warn!("Stopped following Data API pages for {metric} after {MAX_PAGES} pages");
        Ok(records)
    }

    /// Sends one query with retry on transient failures.
    async fn send(&self, request: &QueryRequest) -> Result<QueryResponse, MetricError> {
        let url = self.query_url();
        let mut attempt = 0;

        loop {
            let mut builder = self.client.post(&url).json(request);
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token);
            }

            let retryable = match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    let text = response.text().await?;
                    return Ok(serde_json::from_str(&text)?);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let err = api_error(status.as_u16(), &body);
                    if !(status.is_server_error() || status.as_u16() == 429) {
                        return Err(err);
                    }
                    err
                }
                Err(e) if e.is_timeout() || e.is_connect() => MetricError::Http(e),
                Err(e) => return Err(MetricError::Http(e)),
            };

            if attempt >= MAX_RETRIES {
                return Err(retryable);
            }
            attempt += 1;
            let delay = Duration::from_millis(500 << attempt);
            log::warn!("Data API request failed (retry {attempt}/{MAX_RETRIES} in {delay:?}): {retryable}");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MetricStore for DataApiMetricStore {
    async fn get_metric(
        &self,
        unit_code: &str,
        metric: MetricId,
        year: u16,
        scenario: Scenario,
    ) -> Result<Option<f64>, MetricError> {
        let mut values = self
            .get_metrics(&[unit_code.to_string()], metric, year, scenario)
            .await?;
        Ok(values.remove(unit_code))
    }

    async fn get_metrics(
        &self,
        unit_codes: &[String],
        metric: MetricId,
        year: u16,
        scenario: Scenario,
    ) -> Result<BTreeMap<String, f64>, MetricError> {
        let measure = measure_for_scenario(scenario);
        let mut values = BTreeMap::new();

        for chunk in unit_codes.chunks(REGION_CHUNK_SIZE) {
            let records = self.fetch_chunk(chunk, metric, year, scenario).await?;
            values.extend(values_from_records(&records, metric, year, scenario, measure));
        }

        log::debug!(
            "Data API returned {metric} for {}/{} units ({year}, {scenario})",
            values.len(),
            unit_codes.len()
        );
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct QueryRequest {
    query: Vec<QueryDim>,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<u64>,
}

impl QueryRequest {
    fn new(
        codes: &[String],
        metric: MetricId,
        year: u16,
        scenario: Scenario,
        measure: Measure,
    ) -> Self {
        let item = |code, values: Vec<String>| QueryDim {
            code,
            selection: Selection::Item { values },
        };
        Self {
            query: vec![
                item("metric", vec![metric.to_string()]),
                item("region", codes.to_vec()),
                QueryDim {
                    code: "time_period",
                    selection: Selection::Range {
                        from: year.to_string(),
                        to: year.to_string(),
                    },
                },
                item("scenario", vec![scenario.to_string()]),
                item("measure", vec![measure.to_string()]),
            ],
            limit: DEFAULT_LIMIT,
            cursor: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryDim {
    code: &'static str,
    selection: Selection,
}

#[derive(Debug, Serialize)]
#[serde(tag = "filter", rename_all = "lowercase")]
enum Selection {
    Item { values: Vec<String> },
    Range { from: String, to: String },
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    meta: ResponseMeta,
    data: Vec<ObservationRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMeta {
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    next_cursor: Option<u64>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    metric_id: String,
    region_code: String,
    time_period: i32,
    scenario: String,
    value: Option<f64>,
    data_type: Option<String>,
    confidence_lower: Option<f64>,
    confidence_upper: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

/// Maps a non-success response body to [`MetricError::Api`].
fn api_error(status: u16, body: &str) -> MetricError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) => MetricError::Api {
            status,
            code: error.code,
            message: error.message,
        },
        Err(_) => MetricError::Api {
            status,
            code: format!("HTTP_{status}"),
            message: body.chars().take(500).collect(),
        },
    }
}

/// Extracts finite values for one metric/year/scenario, keyed by region.
fn values_from_records(
    records: &[ObservationRecord],
    metric: MetricId,
    year: u16,
    scenario: Scenario,
    measure: Measure,
) -> BTreeMap<String, f64> {
    records
        .iter()
        .filter(|r| {
            r.metric_id == metric.as_ref()
                && r.time_period == i32::from(year)
                && r.scenario.eq_ignore_ascii_case(scenario.as_ref())
        })
        .filter_map(|r| {
            let row = ObservationValues {
                value: r.value,
                ci_lower: r.confidence_lower,
                ci_upper: r.confidence_upper,
                historical: r.data_type.as_deref() == Some("historical"),
            };
            pick_value(row, measure)
                .filter(|v| v.is_finite())
                .map(|v| (r.region_code.clone(), v))
        })
        .collect()
}
