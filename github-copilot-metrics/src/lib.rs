//! Authenticates as a GitHub App and downloads Copilot usage metrics.
//!
//! [App authentication](https://docs.github.com/en/apps/creating-github-apps/authenticating-with-a-github-app/authenticating-as-a-github-app-installation)
//! | [Copilot metrics](https://docs.github.com/en/rest/copilot/copilot-metrics)

pub use github_app_jwt;

//
pub mod access_token;
pub mod endpoint;
pub mod error;
pub mod flow;
pub mod metrics;
pub mod output;
pub mod report;
pub mod retry;
pub mod timeseries;

pub use endpoint::{IsahcClient, Respond, API_BASE_DEFAULT};
pub use error::Error;
pub use flow::{AppCredentials, Flow, Stage};
pub use metrics::MetricsTarget;
pub use retry::RetryPolicy;
