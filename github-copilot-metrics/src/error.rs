use core::time::Duration;
use std::{io, path::PathBuf};

use github_app_jwt::CreateError;
use http::StatusCode;

use crate::{
    access_token::AccessTokenError, endpoint::TransportError, metrics::MetricsError,
    metrics::MetricsFetchError, report::ReportError,
};

//
#[derive(Debug)]
pub enum Error {
    InvalidArgument(Box<str>),
    InvalidKey(CreateError),
    AuthExchange { status: StatusCode, body: String },
    MetricsFetch(MetricsFetchError),
    ReportDownload { status: StatusCode },
    UnexpectedResponse(serde_json::Error),
    Transport(TransportError),
    Io { path: PathBuf, source: io::Error },
}

impl Error {
    pub fn invalid_argument(msg: impl Into<Box<str>>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Transport failures and rate limits may succeed on a later attempt; rejections never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::MetricsFetch(err) => err.is_rate_limited(),
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::MetricsFetch(err) => err.retry_after,
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::InvalidKey(err) => write!(f, "invalid private key: {err}"),
            Self::AuthExchange { status, body } => {
                write!(f, "installation token exchange was rejected ({status})")?;
                if !body.is_empty() {
                    write!(f, ": {body}")?;
                }
                Ok(())
            }
            Self::MetricsFetch(err) => write!(f, "{err}"),
            Self::ReportDownload { status } => {
                write!(f, "downloading usage report failed ({status})")
            }
            Self::UnexpectedResponse(err) => write!(f, "unexpected response body: {err}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidKey(err) => Some(err),
            Self::MetricsFetch(err) => Some(err),
            Self::UnexpectedResponse(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<CreateError> for Error {
    fn from(err: CreateError) -> Self {
        match err {
            CreateError::AppIdEmpty => Self::invalid_argument("app id must not be empty"),
            CreateError::ExpirationTimeDurationZero => {
                Self::invalid_argument("assertion lifetime must not be zero")
            }
            err => Self::InvalidKey(err),
        }
    }
}

impl From<AccessTokenError> for Error {
    fn from(err: AccessTokenError) -> Self {
        match err {
            AccessTokenError::MakeRequestFailed(err) => {
                Self::invalid_argument(format!("cannot build token request: {err}"))
            }
            AccessTokenError::RespondFailed(err) => Self::Transport(err),
            AccessTokenError::Rejected { status, body } => Self::AuthExchange { status, body },
            AccessTokenError::DeResponseBodyFailed(err) => Self::UnexpectedResponse(err),
        }
    }
}

impl From<MetricsError> for Error {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::MakeRequestFailed(err) => {
                Self::invalid_argument(format!("cannot build metrics request: {err}"))
            }
            MetricsError::RespondFailed(err) => Self::Transport(err),
            MetricsError::Rejected(err) => Self::MetricsFetch(err),
        }
    }
}

impl From<ReportError> for Error {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::MakeRequestFailed(err) => {
                Self::invalid_argument(format!("cannot build report request: {err}"))
            }
            ReportError::RespondFailed(err) => Self::Transport(err),
            ReportError::LinksRejected(err) => Self::MetricsFetch(err),
            ReportError::DownloadRejected { status } => Self::ReportDownload { status },
            ReportError::DeResponseBodyFailed(err) => Self::UnexpectedResponse(err),
        }
    }
}
