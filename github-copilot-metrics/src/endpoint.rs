use core::time::Duration;
use std::io::Read as _;

use http::{header, request::Builder as RequestBuilder, Method, Request, Response};
use isahc::{config::Configurable as _, HttpClient};

pub type Body = Vec<u8>;

pub const API_BASE_DEFAULT: &str = "https://api.github.com";
pub const API_VERSION: &str = "2022-11-28";
pub const MEDIA_TYPE: &str = "application/vnd.github+json";
pub const USER_AGENT: &str = "github-copilot-metrics";
pub const TIMEOUT_DEFAULT: Duration = Duration::from_secs(30);

//
pub trait Endpoint {
    type Output;
    type Error: From<http::Error> + From<TransportError>;

    fn render_request(&self) -> Result<Request<Body>, http::Error>;

    fn parse_response(&self, response: Response<Body>) -> Result<Self::Output, Self::Error>;
}

pub trait Respond {
    fn respond(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;

    fn respond_endpoint<EP: Endpoint>(&self, endpoint: &EP) -> Result<EP::Output, EP::Error> {
        let request = endpoint.render_request()?;
        let response = self.respond(request)?;
        endpoint.parse_response(response)
    }
}

impl<T: Respond + ?Sized> Respond for &T {
    fn respond(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        (**self).respond(request)
    }
}

/// A request builder carrying the headers GitHub's REST API expects.
pub fn api_request(
    method: Method,
    api_base: &str,
    path: &str,
    bearer: &str,
) -> RequestBuilder {
    Request::builder()
        .method(method)
        .uri(format!("{}{path}", api_base.trim_end_matches('/')))
        .header(header::ACCEPT, MEDIA_TYPE)
        .header(header::USER_AGENT, USER_AGENT)
        .header("X-GitHub-Api-Version", API_VERSION)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
}

/// True when `value` can be placed in a URL path without changing which resource it names.
pub fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
}

pub fn body_lossy(response: &Response<Body>) -> String {
    String::from_utf8_lossy(response.body()).into_owned()
}

//
#[derive(Debug)]
pub enum TransportError {
    SendFailed(isahc::Error),
    ReadBodyFailed(std::io::Error),
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SendFailed(err) => write!(f, "sending request failed: {err}"),
            Self::ReadBodyFailed(err) => write!(f, "reading response body failed: {err}"),
            Self::Other(err) => write!(f, "{err}"),
        }
    }
}
impl std::error::Error for TransportError {}

//
#[derive(Debug, Clone)]
pub struct IsahcClient {
    inner: HttpClient,
    timeout: Duration,
}

impl IsahcClient {
    /// A zero timeout would disable curl's timeout, so it falls back to [`TIMEOUT_DEFAULT`].
    pub fn new(timeout: impl Into<Option<Duration>>) -> Result<Self, isahc::Error> {
        let timeout = timeout
            .into()
            .filter(|dur| !dur.is_zero())
            .unwrap_or(TIMEOUT_DEFAULT);
        let inner = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self { inner, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Respond for IsahcClient {
    fn respond(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let response = self
            .inner
            .send(request)
            .map_err(TransportError::SendFailed)?;

        let (parts, mut body) = response.into_parts();
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)
            .map_err(TransportError::ReadBodyFailed)?;

        Ok(Response::from_parts(parts, buf))
    }
}
