//! Enterprise 28-day Copilot usage report.
//!
//! The API answers with a set of pre-signed download links; each link is fetched
//! without an `Authorization` header.

use core::time::Duration;

use chrono::Utc;
use http::{header, Method, Request, Response, StatusCode};
use isahc::config::Configurable as _;
use serde::Serialize;
use serde_json::Value;

use crate::{
    endpoint::{api_request, Body, Endpoint, Respond, TransportError, USER_AGENT},
    metrics::MetricsFetchError,
};

pub const REPORT_KIND: &str = "enterprise-28-day";
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

//
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLinks {
    pub document: Value,
    pub download_links: Vec<String>,
}

impl ReportLinks {
    pub fn from_document(document: Value) -> Self {
        let download_links = document
            .get("download_links")
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            document,
            download_links,
        }
    }
}

//
#[derive(Clone)]
pub struct ReportLinksEndpoint {
    api_base: Box<str>,
    installation_token: Box<str>,
    enterprise: Box<str>,
}

impl ReportLinksEndpoint {
    pub fn new(
        api_base: impl AsRef<str>,
        installation_token: impl AsRef<str>,
        enterprise: impl AsRef<str>,
    ) -> Self {
        Self {
            api_base: api_base.as_ref().into(),
            installation_token: installation_token.as_ref().into(),
            enterprise: enterprise.as_ref().into(),
        }
    }
}

impl Endpoint for ReportLinksEndpoint {
    type Output = ReportLinks;
    type Error = ReportError;

    fn render_request(&self) -> Result<Request<Body>, http::Error> {
        api_request(
            Method::GET,
            &self.api_base,
            &format!(
                "/enterprises/{}/copilot/metrics/reports/{REPORT_KIND}/latest",
                self.enterprise
            ),
            &self.installation_token,
        )
        .body(vec![])
    }

    fn parse_response(&self, response: Response<Body>) -> Result<Self::Output, Self::Error> {
        if !response.status().is_success() {
            return Err(ReportError::LinksRejected(MetricsFetchError::from_response(
                &response,
                Utc::now(),
            )));
        }

        let document = serde_json::from_slice(response.body())
            .map_err(ReportError::DeResponseBodyFailed)?;

        Ok(ReportLinks::from_document(document))
    }
}

//
#[derive(Clone)]
pub struct ReportDownloadEndpoint {
    url: Box<str>,
}

impl ReportDownloadEndpoint {
    pub fn new(url: impl AsRef<str>) -> Self {
        Self {
            url: url.as_ref().into(),
        }
    }
}

impl Endpoint for ReportDownloadEndpoint {
    type Output = Value;
    type Error = ReportError;

    fn render_request(&self) -> Result<Request<Body>, http::Error> {
        Request::builder()
            .method(Method::GET)
            .uri(self.url.as_ref())
            .header(header::USER_AGENT, USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .body(vec![])
    }

    fn parse_response(&self, response: Response<Body>) -> Result<Self::Output, Self::Error> {
        let status = response.status();
        if !status.is_success() {
            // The signed URL is a credential, keep it out of the error.
            return Err(ReportError::DownloadRejected { status });
        }

        serde_json::from_slice(response.body()).map_err(ReportError::DeResponseBodyFailed)
    }
}

pub fn fetch_links(
    client: impl Respond,
    api_base: impl AsRef<str>,
    installation_token: impl AsRef<str>,
    enterprise: impl AsRef<str>,
) -> Result<ReportLinks, ReportError> {
    client.respond_endpoint(&ReportLinksEndpoint::new(
        api_base,
        installation_token,
        enterprise,
    ))
}

pub fn download_all(client: impl Respond, links: &ReportLinks) -> Result<Vec<Value>, ReportError> {
    links
        .download_links
        .iter()
        .enumerate()
        .map(|(i, url)| {
            tracing::debug!(index = i, total = links.download_links.len(), "downloading report");
            client.respond_endpoint(&ReportDownloadEndpoint::new(url))
        })
        .collect()
}

//
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ReportBundle {
    pub report_links: Value,
    pub reports: Vec<Value>,
}

impl ReportBundle {
    pub fn new(links: ReportLinks, reports: Vec<Value>) -> Self {
        Self {
            report_links: links.document,
            reports,
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self).map(|mut s| {
            s.push('\n');
            s
        })
    }
}

//
#[derive(Debug)]
pub enum ReportError {
    MakeRequestFailed(http::Error),
    RespondFailed(TransportError),
    LinksRejected(MetricsFetchError),
    DownloadRejected { status: StatusCode },
    DeResponseBodyFailed(serde_json::Error),
}

impl From<http::Error> for ReportError {
    fn from(err: http::Error) -> Self {
        Self::MakeRequestFailed(err)
    }
}

impl From<TransportError> for ReportError {
    fn from(err: TransportError) -> Self {
        Self::RespondFailed(err)
    }
}

impl core::fmt::Display for ReportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
impl std::error::Error for ReportError {}
