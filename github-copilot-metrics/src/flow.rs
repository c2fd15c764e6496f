//! The per-invocation pipeline:
//! `Unauthenticated -> AssertionBuilt -> TokenAcquired -> MetricsFetched -> Done`.
//!
//! Every step needs the previous step's output, so they run strictly in order. Any
//! failure ends the run. Retries happen only when the [`RetryPolicy`] allows more than
//! one attempt, and only for transport errors and rate limits.

use core::time::Duration;

use chrono::{DateTime, Utc};
use github_app_jwt::Claims;
use tracing::{debug, info, warn};

use crate::{
    access_token::{self, InstallationToken},
    endpoint::{is_path_segment, Body, Respond},
    error::Error,
    metrics::{self, MetricsTarget},
    report::{self, ReportBundle},
    retry::RetryPolicy,
};

// An assertion this close to `exp` is rebuilt before it is presented again.
pub const ASSERTION_REFRESH_MARGIN: Duration = Duration::from_secs(60);

//
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unauthenticated,
    AssertionBuilt,
    TokenAcquired,
    MetricsFetched,
    Done,
}

//
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: Box<str>,
    pub installation_id: Box<str>,
    private_key_pem: Vec<u8>,
}

impl AppCredentials {
    pub fn new(
        app_id: impl AsRef<str>,
        installation_id: impl AsRef<str>,
        private_key_pem: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            app_id: app_id.as_ref().trim().into(),
            installation_id: installation_id.as_ref().trim().into(),
            private_key_pem: private_key_pem.into(),
        }
    }
}

impl core::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

//
#[derive(Clone)]
pub struct Assertion {
    token: String,
    claims: Claims,
}

impl Assertion {
    pub fn build(
        credentials: &AppCredentials,
        now: impl Into<Option<DateTime<Utc>>>,
    ) -> Result<Self, Error> {
        let claims = Claims::new(credentials.app_id.as_ref(), now, None)?;
        let token = github_app_jwt::sign(&claims, &credentials.private_key_pem)?;

        Ok(Self { token, claims })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

impl core::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Assertion")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

//
#[derive(Debug, Clone)]
pub struct Flow<C> {
    client: C,
    api_base: Box<str>,
    retry_policy: RetryPolicy,
}

impl<C: Respond> Flow<C> {
    pub fn new(client: C, api_base: impl AsRef<str>) -> Self {
        Self {
            client,
            api_base: api_base.as_ref().trim_end_matches('/').into(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn authenticate(&self, credentials: &AppCredentials) -> Result<InstallationToken, Error> {
        debug!(stage = ?Stage::Unauthenticated, app_id = %credentials.app_id);
        check_path_segment("installation id", &credentials.installation_id)?;

        let mut assertion = Assertion::build(credentials, None)?;
        info!(
            stage = ?Stage::AssertionBuilt,
            app_id = %credentials.app_id,
            expires_at = %assertion.claims().exp,
            "built app assertion"
        );

        let token = self.retrying("installation token exchange", || {
            if assertion
                .claims()
                .expires_within(Utc::now(), ASSERTION_REFRESH_MARGIN)
            {
                debug!("assertion is about to expire, rebuilding");
                assertion = Assertion::build(credentials, None)?;
            }

            access_token::exchange(
                &self.client,
                &self.api_base,
                assertion.token(),
                &credentials.installation_id,
            )
            .map_err(Error::from)
        })?;
        info!(
            stage = ?Stage::TokenAcquired,
            installation_id = %credentials.installation_id,
            expires_at = %token.expires_at,
            "acquired installation token"
        );

        Ok(token)
    }

    /// Returns the metrics body exactly as the API sent it.
    pub fn fetch_metrics(
        &self,
        credentials: &AppCredentials,
        target: &MetricsTarget,
    ) -> Result<Body, Error> {
        check_path_segment("enterprise or organization", target.name())?;
        let token = self.authenticate(credentials)?;

        let body = self.retrying("metrics request", || {
            metrics::fetch(&self.client, &self.api_base, &token.token, target.clone())
                .map_err(Error::from)
        })?;
        info!(
            stage = ?Stage::MetricsFetched,
            metrics_target = %target,
            bytes = body.len(),
            "fetched copilot metrics"
        );

        Ok(body)
    }

    pub fn fetch_report(
        &self,
        credentials: &AppCredentials,
        enterprise: &str,
    ) -> Result<ReportBundle, Error> {
        check_path_segment("enterprise", enterprise)?;
        let token = self.authenticate(credentials)?;

        let links = self.retrying("usage report request", || {
            report::fetch_links(&self.client, &self.api_base, &token.token, enterprise)
                .map_err(Error::from)
        })?;
        info!(
            enterprise,
            links = links.download_links.len(),
            "fetched usage report links"
        );

        let reports = self.retrying("usage report download", || {
            report::download_all(&self.client, &links).map_err(Error::from)
        })?;
        info!(
            stage = ?Stage::MetricsFetched,
            enterprise,
            reports = reports.len(),
            "downloaded usage reports"
        );

        Ok(ReportBundle::new(links, reports))
    }

    fn retrying<T>(
        &self,
        what: &str,
        mut f: impl FnMut() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut attempt = 1;
        loop {
            let err = match f() {
                Ok(x) => return Ok(x),
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            let delay = match self.retry_policy.delay_after(attempt, err.retry_after()) {
                Some(delay) => delay,
                None => return Err(err),
            };
            warn!(
                attempt,
                delay_secs = delay.as_secs(),
                error = %err,
                "{what} failed, retrying"
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

fn check_path_segment(what: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::invalid_argument(format!("{what} must not be empty")));
    }
    if !is_path_segment(value) {
        return Err(Error::invalid_argument(format!(
            "{what} {value:?} is not a valid name"
        )));
    }
    Ok(())
}
