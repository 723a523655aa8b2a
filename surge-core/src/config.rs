use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::latency::LatencyTracking;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const API_KEY_HEADER: &str = "x-api-key";
pub const PATH_INGEST: &str = "/ingest";
pub const PATH_INGEST_BATCH: &str = "/ingest/batch";

/// Which ingestion endpoint a scenario talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum IngestMode {
    /// One event object per request, `POST /ingest`.
    Single,
    /// A batch envelope per request, `POST /ingest/batch`.
    Batch,
}

impl IngestMode {
    /// Unit size 1 means single-event mode; anything larger is batched.
    pub fn for_unit_size(work_unit_size: u64) -> Self {
        if work_unit_size <= 1 {
            Self::Single
        } else {
            Self::Batch
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Single => PATH_INGEST,
            Self::Batch => PATH_INGEST_BATCH,
        }
    }
}

/// One load-test run: how many events, how they are grouped, and how many may be in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub name: String,
    /// Events per dispatch (1 = single-event mode).
    pub work_unit_size: u64,
    /// Events to send over the whole scenario.
    pub total_units: u64,
    /// Maximum simultaneously in-flight dispatches.
    pub concurrency_limit: usize,
}

impl ScenarioConfig {
    pub fn new(
        name: impl Into<String>,
        work_unit_size: u64,
        total_units: u64,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            name: name.into(),
            work_unit_size,
            total_units,
            concurrency_limit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.work_unit_size == 0 {
            return Err(Error::InvalidWorkUnitSize);
        }
        if self.concurrency_limit == 0 {
            return Err(Error::InvalidConcurrency);
        }
        Ok(())
    }

    pub fn mode(&self) -> IngestMode {
        IngestMode::for_unit_size(self.work_unit_size)
    }

    /// Number of dispatches the runner will issue.
    pub fn planned_dispatches(&self) -> u64 {
        if self.work_unit_size == 0 {
            return 0;
        }
        self.total_units.div_ceil(self.work_unit_size)
    }
}

/// Everything a dispatcher needs to know about the target. Built once and passed down.
#[derive(Clone)]
pub struct DispatchSettings {
    base_url: url::Url,
    api_key: String,
    request_timeout: Duration,
    latency_tracking: LatencyTracking,
}

impl fmt::Debug for DispatchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSettings")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("latency_tracking", &self.latency_tracking)
            .finish()
    }
}

impl DispatchSettings {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let parsed =
            url::Url::parse(base_url).map_err(|_| Error::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }

        let api_key = api_key.into();
        if http::HeaderValue::from_str(&api_key).is_err() {
            return Err(Error::InvalidApiKey);
        }

        Ok(Self {
            base_url: parsed,
            api_key,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            latency_tracking: LatencyTracking::default(),
        })
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_latency_tracking(mut self, tracking: LatencyTracking) -> Self {
        self.latency_tracking = tracking;
        self
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn latency_tracking(&self) -> LatencyTracking {
        self.latency_tracking
    }

    /// Full URL of the endpoint used for `mode`, keeping any path prefix of the base URL.
    pub fn endpoint_url(&self, mode: IngestMode) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}{}", mode.path())
    }

    pub(crate) fn endpoint_uri(&self, mode: IngestMode) -> Result<http::Uri> {
        let url = self.endpoint_url(mode);
        url.parse().map_err(|_| Error::InvalidBaseUrl(url))
    }

    pub(crate) fn request_headers(&self) -> Result<http::HeaderMap> {
        let mut headers = http::HeaderMap::new();
        let key = http::HeaderValue::from_str(&self.api_key).map_err(|_| Error::InvalidApiKey)?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }
}
