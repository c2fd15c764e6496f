//! [Doc](https://docs.github.com/en/rest/copilot/copilot-metrics)

use core::time::Duration;

use chrono::{DateTime, Utc};
use http::{header, HeaderMap, Method, Request, Response, StatusCode};

use crate::endpoint::{api_request, body_lossy, Body, Endpoint, Respond, TransportError};

//
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsTarget {
    Enterprise(Box<str>),
    Organization(Box<str>),
}

impl MetricsTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Enterprise(slug) => slug,
            Self::Organization(org) => org,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Enterprise(slug) => format!("/enterprises/{slug}/copilot/metrics"),
            Self::Organization(org) => format!("/orgs/{org}/copilot/metrics"),
        }
    }
}

impl core::fmt::Display for MetricsTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Enterprise(slug) => write!(f, "enterprise {slug}"),
            Self::Organization(org) => write!(f, "organization {org}"),
        }
    }
}

//
#[derive(Clone)]
pub struct MetricsEndpoint {
    api_base: Box<str>,
    installation_token: Box<str>,
    target: MetricsTarget,
}

impl MetricsEndpoint {
    pub fn new(
        api_base: impl AsRef<str>,
        installation_token: impl AsRef<str>,
        target: MetricsTarget,
    ) -> Self {
        Self {
            api_base: api_base.as_ref().into(),
            installation_token: installation_token.as_ref().into(),
            target,
        }
    }
}

impl Endpoint for MetricsEndpoint {
    // Passed through unmodified.
    type Output = Body;
    type Error = MetricsError;

    fn render_request(&self) -> Result<Request<Body>, http::Error> {
        api_request(
            Method::GET,
            &self.api_base,
            &self.target.path(),
            &self.installation_token,
        )
        .body(vec![])
    }

    fn parse_response(&self, response: Response<Body>) -> Result<Self::Output, Self::Error> {
        if !response.status().is_success() {
            return Err(MetricsError::Rejected(MetricsFetchError::from_response(
                &response,
                Utc::now(),
            )));
        }

        Ok(response.into_body())
    }
}

pub fn fetch(
    client: impl Respond,
    api_base: impl AsRef<str>,
    installation_token: impl AsRef<str>,
    target: MetricsTarget,
) -> Result<Body, MetricsError> {
    client.respond_endpoint(&MetricsEndpoint::new(
        api_base,
        installation_token,
        target,
    ))
}

//
#[derive(Debug)]
pub enum MetricsError {
    MakeRequestFailed(http::Error),
    RespondFailed(TransportError),
    Rejected(MetricsFetchError),
}

impl From<http::Error> for MetricsError {
    fn from(err: http::Error) -> Self {
        Self::MakeRequestFailed(err)
    }
}

impl From<TransportError> for MetricsError {
    fn from(err: TransportError) -> Self {
        Self::RespondFailed(err)
    }
}

impl core::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for MetricsError {}

//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsFetchErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Other,
}

/// A non-2xx answer from a metrics or usage report endpoint.
#[derive(Debug, Clone)]
pub struct MetricsFetchError {
    pub status: StatusCode,
    pub body: String,
    pub retry_after: Option<Duration>,
    rate_limit_exhausted: bool,
}

impl MetricsFetchError {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
            rate_limit_exhausted: false,
        }
    }

    pub fn from_response(response: &Response<Body>, now: DateTime<Utc>) -> Self {
        let headers = response.headers();
        let rate_limit_exhausted = header_str(headers, "x-ratelimit-remaining") == Some("0");

        Self {
            status: response.status(),
            body: body_lossy(response),
            retry_after: retry_after(headers, rate_limit_exhausted, now),
            rate_limit_exhausted,
        }
    }

    pub fn kind(&self) -> MetricsFetchErrorKind {
        match self.status {
            StatusCode::TOO_MANY_REQUESTS => MetricsFetchErrorKind::RateLimited,
            // GitHub signals primary rate limits with a 403.
            StatusCode::FORBIDDEN if self.rate_limit_exhausted => {
                MetricsFetchErrorKind::RateLimited
            }
            StatusCode::FORBIDDEN => MetricsFetchErrorKind::Forbidden,
            StatusCode::UNAUTHORIZED => MetricsFetchErrorKind::Unauthorized,
            StatusCode::NOT_FOUND => MetricsFetchErrorKind::NotFound,
            _ => MetricsFetchErrorKind::Other,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == MetricsFetchErrorKind::RateLimited
    }
}

impl core::fmt::Display for MetricsFetchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind() {
            MetricsFetchErrorKind::RateLimited => {
                write!(f, "metrics request was rate limited ({})", self.status)?;
                match self.retry_after {
                    Some(dur) => write!(f, ", retry after {}s", dur.as_secs())?,
                    None => write!(f, ", no retry hint given")?,
                }
            }
            MetricsFetchErrorKind::Unauthorized => {
                write!(f, "metrics request was not authorized ({})", self.status)?
            }
            MetricsFetchErrorKind::Forbidden => write!(
                f,
                "metrics request was forbidden, check the app's Copilot permissions ({})",
                self.status
            )?,
            MetricsFetchErrorKind::NotFound => write!(
                f,
                "metrics not found, check the enterprise or organization name ({})",
                self.status
            )?,
            MetricsFetchErrorKind::Other => {
                write!(f, "metrics request failed ({})", self.status)?
            }
        }
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}
impl std::error::Error for MetricsFetchError {}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

// `x-ratelimit-reset` marks the end of the primary window, so it only counts once that window is used up.
fn retry_after(
    headers: &HeaderMap,
    rate_limit_exhausted: bool,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if let Some(value) = header_str(headers, header::RETRY_AFTER.as_str()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }
        if let Ok(at) = DateTime::parse_from_rfc2822(value) {
            let secs = (at.with_timezone(&Utc) - now).num_seconds().max(0);
            return Some(Duration::from_secs(secs as u64));
        }
    }

    if !rate_limit_exhausted {
        return None;
    }
    let reset = header_str(headers, "x-ratelimit-reset")?.parse::<i64>().ok()?;
    Some(Duration::from_secs((reset - now.timestamp()).max(0) as u64))
}
