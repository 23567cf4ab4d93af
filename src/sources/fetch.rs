//! Paginated fetcher
//!
//! Issues authenticated GETs against the primary or roster API, follows
//! page continuation and honours the upstream rate-limit headers.

use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::config::api::ApiEndpoints;
use crate::error::{ReportError, Result};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::oauth2::{TokenManager, TokenOrigin};
use crate::sources::rate_limit::RateLimitState;
use crate::utils::constants::{
    DEFAULT_MAX_PAGES, MAX_RATE_LIMITED_REPLAYS, PAGE_NUMBER_HEADER, PAGE_SIZE_HEADER,
};

/// Which API an endpoint lives on. The two differ in base URL and in
/// how a page body is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    /// `{ "data": [...] }` envelope
    Primary,
    /// OneRoster document, no envelope
    Roster,
}

impl ApiMode {
    pub fn label(&self) -> &'static str {
        match self {
            ApiMode::Primary => "primary",
            ApiMode::Roster => "roster",
        }
    }

    /// Split a page body into records and the item count used for the
    /// continuation check.
    ///
    /// Roster answers are either an array of records or a single document.
    /// The roster API pages by `offset` and ignores the page-number header,
    /// so a document counts as one item and never asks for another page.
    pub fn unwrap_page(&self, endpoint: &str, body: Value) -> Result<(Vec<Value>, usize)> {
        match (self, body) {
            (ApiMode::Primary, Value::Object(mut map)) => match map.remove("data") {
                Some(Value::Array(items)) => {
                    let count = items.len();
                    Ok((items, count))
                }
                _ => Err(ReportError::Decode {
                    endpoint: endpoint.to_owned(),
                    reason: "response has no `data` array".to_string(),
                }),
            },
            (ApiMode::Primary, _) => Err(ReportError::Decode {
                endpoint: endpoint.to_owned(),
                reason: "expected a JSON object with a `data` array".to_string(),
            }),
            (ApiMode::Roster, Value::Array(items)) => {
                let count = items.len();
                Ok((items, count))
            }
            (ApiMode::Roster, Value::Object(map)) => Ok((vec![Value::Object(map)], 1)),
            (ApiMode::Roster, _) => Err(ReportError::Decode {
                endpoint: endpoint.to_owned(),
                reason: "expected a JSON object or array".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaginatedFetcher {
    client: Client,
    tokens: TokenManager,
    endpoints: ApiEndpoints,
    page_size: usize,
    low_water: u64,
    max_pages: u32,
    retry: RetrySettings,
}

impl PaginatedFetcher {
    pub fn new(
        client: Client,
        tokens: TokenManager,
        endpoints: ApiEndpoints,
        page_size: usize,
        low_water: u64,
        retry: RetrySettings,
    ) -> Self {
        Self {
            client,
            tokens,
            endpoints,
            page_size: page_size.max(1),
            low_water,
            max_pages: DEFAULT_MAX_PAGES,
            retry,
        }
    }

    /// Upper bound on pages per endpoint before the fetch is abandoned.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Start a sequence of fetches that share one rate-limit window.
    pub fn session(&self) -> FetchSession<'_> {
        FetchSession {
            fetcher: self,
            rate_limit: RateLimitState::default(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn url_for(&self, endpoint: &str, mode: ApiMode) -> String {
        let base = match mode {
            ApiMode::Primary => &self.endpoints.api_base_url,
            ApiMode::Roster => &self.endpoints.roster_base_url,
        };
        format!("{}{}", base, endpoint.trim_start_matches('/'))
    }

    async fn send_page(
        &self,
        url: &str,
        endpoint: &str,
        token: &Token,
        page: u32,
    ) -> Result<(HeaderMap, Value)> {
        debug!(endpoint, page, "GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, token.bearer())
            .header(PAGE_SIZE_HEADER, self.page_size.to_string())
            .header(PAGE_NUMBER_HEADER, page.to_string())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let mut window = RateLimitState::default();
            window.observe(response.headers(), Utc::now());
            return Err(ReportError::RateLimited {
                endpoint: endpoint.to_owned(),
                retry_after: window.until_reset(Utc::now()),
            });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ReportError::Auth(format!(
                "'{}' answered 401 (missing scope or invalid token)",
                endpoint
            )));
        }
        if status != StatusCode::OK {
            return Err(ReportError::Status {
                endpoint: endpoint.to_owned(),
                status,
            });
        }

        let headers = response.headers().clone();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ReportError::Decode {
                endpoint: endpoint.to_owned(),
                reason: e.to_string(),
            })?;
        Ok((headers, body))
    }
}

/// Fetch state owned by one lookup or rebuild. Throttling only ever delays
/// the session that observed the low rate-limit window.
#[derive(Debug)]
pub struct FetchSession<'a> {
    fetcher: &'a PaginatedFetcher,
    rate_limit: RateLimitState,
}

impl FetchSession<'_> {
    pub fn rate_limit(&self) -> &RateLimitState {
        &self.rate_limit
    }

    /// Fetch every page of `endpoint` and concatenate the records.
    ///
    /// Paging continues while a page holds at least `page_size` items, so a
    /// full last page costs one extra request. Any non-200 answer fails the
    /// whole endpoint.
    pub async fn fetch(&mut self, endpoint: &str, mode: ApiMode) -> Result<Vec<Value>> {
        let fetcher = self.fetcher;
        let url = fetcher.url_for(endpoint, mode);
        let (mut token, mut origin) = fetcher.tokens.acquire().await?;

        let mut records: Vec<Value> = Vec::new();
        let mut page: u32 = 1;
        let mut replays: u32 = 0;
        loop {
            if page > fetcher.max_pages {
                return Err(ReportError::Pipeline {
                    endpoint: endpoint.to_owned(),
                    reason: format!("still paging after {} pages", fetcher.max_pages),
                });
            }

            let (headers, body) = match self.get_page(&url, endpoint, mode, &token, page).await {
                Err(ReportError::Auth(reason)) if origin == TokenOrigin::Cached => {
                    // upstream invalidated a token we still considered valid
                    warn!(endpoint, "cached token rejected ({}), refreshing once", reason);
                    token = fetcher.tokens.refresh().await?;
                    origin = TokenOrigin::Fresh;
                    continue;
                }
                Err(ReportError::RateLimited { retry_after: Some(wait), .. })
                    if replays < MAX_RATE_LIMITED_REPLAYS =>
                {
                    replays += 1;
                    get_metrics().await.rate_limit_waits.inc();
                    warn!(
                        endpoint,
                        page,
                        wait_ms = wait.as_millis() as u64,
                        "upstream answered 429, waiting for the window to reset"
                    );
                    sleep(wait).await;
                    continue;
                }
                other => other?,
            };

            let (items, count) = mode.unwrap_page(endpoint, body)?;
            debug!(endpoint, page, count, "page received");
            records.extend(items);

            self.observe_rate_limit(&headers).await;

            if count < fetcher.page_size {
                break;
            }
            page += 1;
        }

        info!(endpoint, mode = mode.label(), pages = page, records = records.len(), "fetched");
        Ok(records)
    }

    /// Like [`FetchSession::fetch`], deserializing each record into `T`.
    pub async fn fetch_as<T: DeserializeOwned>(&mut self, endpoint: &str, mode: ApiMode) -> Result<Vec<T>> {
        self.fetch(endpoint, mode)
            .await?
            .into_iter()
            .map(|record| {
                serde_json::from_value(record).map_err(|e| ReportError::Decode {
                    endpoint: endpoint.to_owned(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    async fn get_page(
        &self,
        url: &str,
        endpoint: &str,
        mode: ApiMode,
        token: &Token,
        page: u32,
    ) -> Result<(HeaderMap, Value)> {
        let fetcher = self.fetcher;
        let metrics = get_metrics().await;
        fetcher
            .retry
            .run_with_retry(
                move || async move {
                    let start = get_instant();
                    metrics.upstream_requests.with_label_values(&[mode.label()]).inc();
                    let result = fetcher.send_page(url, endpoint, token, page).await;
                    metrics
                        .upstream_duration
                        .with_label_values(&[mode.label()])
                        .observe(start.elapsed().as_secs_f64());
                    if let Err(e) = &result {
                        metrics
                            .upstream_failures
                            .with_label_values(&[mode.label(), e.kind()])
                            .inc();
                    }
                    result
                },
                ReportError::is_transient,
            )
            .await
    }

    /// Record the window and pause here when it is nearly spent.
    async fn observe_rate_limit(&mut self, headers: &HeaderMap) {
        let now = Utc::now();
        if !self.rate_limit.observe(headers, now) {
            return;
        }
        let metrics = get_metrics().await;
        if let Some(remaining) = self.rate_limit.remaining {
            metrics.rate_limit_remaining.set(remaining.min(i64::MAX as u64) as i64);
        }
        if let Some(wait) = self.rate_limit.wait_duration(self.fetcher.low_water, now) {
            metrics.rate_limit_waits.inc();
            warn!(
                remaining = ?self.rate_limit.remaining,
                wait_ms = wait.as_millis() as u64,
                "rate limit nearly exhausted, pausing until reset"
            );
            sleep(wait).await;
        }
    }
}
