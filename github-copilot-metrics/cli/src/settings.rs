//! Command-line flags, environment variables and the optional env file.
//!
//! A non-empty value under a setting's primary key in the env file wins over the flag.
//! Alias keys (`AppID`, `PemPath`, ...) are only consulted when the flag is not given.

use core::time::Duration;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use clap::Parser;
use github_copilot_metrics::{MetricsTarget, API_BASE_DEFAULT};

pub const ENV_FILE_DEFAULT: &str = "test.env";
pub const TIMEOUT_SECS_DEFAULT: u64 = 30;

/// Generate a GitHub App JWT and call the Copilot metrics API.
#[derive(Parser, Debug, Clone)]
#[command(name = "github_copilot_metrics", version)]
pub struct Args {
    /// GitHub App ID
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<String>,

    /// Path to the GitHub App private key PEM file
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    pub private_key: Option<PathBuf>,

    /// GitHub App installation ID
    #[arg(long, env = "GITHUB_INSTALLATION_ID")]
    pub installation_id: Option<String>,

    /// GitHub enterprise slug (used for the enterprise metrics endpoint)
    #[arg(long, env = "GITHUB_ENTERPRISE")]
    pub enterprise: Option<String>,

    /// GitHub organization, instead of an enterprise
    #[arg(long, env = "GITHUB_ORG")]
    pub org: Option<String>,

    /// GitHub API base URL [default: https://api.github.com]
    #[arg(long, env = "GITHUB_API_BASE")]
    pub api_base: Option<String>,

    /// Where to write the JSON response (default: stdout, or metrics-YYYY-MM-DD.json with --report)
    #[arg(long, short, env = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Download the latest enterprise 28-day usage report instead of the metrics endpoint
    #[arg(long)]
    pub report: bool,

    /// With --report, also write pr-summary-YYYY-MM-DD.json
    #[arg(long, requires = "report")]
    pub pr_summary: bool,

    /// Timeout for each API request, in seconds
    #[arg(long, default_value_t = TIMEOUT_SECS_DEFAULT, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Extra attempts on rate limits and network errors
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=2))]
    pub retries: u32,

    /// Env file read for settings
    #[arg(long, default_value = ENV_FILE_DEFAULT)]
    pub env_file: PathBuf,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key: None,
            installation_id: None,
            enterprise: None,
            org: None,
            api_base: None,
            output: None,
            report: false,
            pr_summary: false,
            timeout_secs: TIMEOUT_SECS_DEFAULT,
            retries: 0,
            env_file: ENV_FILE_DEFAULT.into(),
        }
    }
}

//
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Metrics(MetricsTarget),
    Report { enterprise: String, pr_summary: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_id: String,
    pub installation_id: String,
    pub private_key: PathBuf,
    pub api_base: String,
    pub output: Option<PathBuf>,
    pub mode: Mode,
    pub timeout: Duration,
    pub retries: u32,
}

impl Settings {
    pub fn resolve(args: Args, env: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let from_env = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();
        let pick = |key: &str, aliases: &[&str], arg: Option<String>| -> Option<String> {
            from_env(key)
                .or_else(|| arg.filter(|v| !v.trim().is_empty()))
                .or_else(|| aliases.iter().find_map(|k| from_env(*k)))
        };

        let app_id = pick("APP_ID", &["AppID"], args.app_id);
        let installation_id = pick("INSTALLATION_ID", &["InstallationID"], args.installation_id);
        let private_key = pick(
            "PRIVATE_KEY",
            &["PemPath", "PRIVATE_KEY_PATH"],
            args.private_key.map(|p| p.to_string_lossy().into_owned()),
        );
        let enterprise = pick("ENTERPRISE", &[], args.enterprise);
        let org = pick("ORG", &[], args.org);
        let api_base = pick("API_BASE", &[], args.api_base);
        let output = pick(
            "OUTPUT",
            &[],
            args.output.map(|p| p.to_string_lossy().into_owned()),
        );

        let target_given = enterprise.is_some() || org.is_some();
        let missing: Vec<&'static str> = [
            ("--app-id", app_id.is_some()),
            ("--private-key", private_key.is_some()),
            ("--installation-id", installation_id.is_some()),
            ("--enterprise", target_given),
        ]
        .into_iter()
        .filter_map(|(name, given)| (!given).then_some(name))
        .collect();

        let (app_id, installation_id, private_key) = match (app_id, installation_id, private_key) {
            (Some(a), Some(i), Some(p)) if missing.is_empty() => (a, i, p),
            _ => {
                return Err(SettingsError::Missing {
                    names: missing,
                    env_file: args.env_file,
                })
            }
        };

        let mode = match (enterprise, org) {
            (Some(_), Some(_)) => return Err(SettingsError::EnterpriseAndOrg),
            (Some(enterprise), None) if args.report => Mode::Report {
                enterprise,
                pr_summary: args.pr_summary,
            },
            (None, Some(_)) if args.report => return Err(SettingsError::ReportNeedsEnterprise),
            (Some(enterprise), None) => {
                Mode::Metrics(MetricsTarget::Enterprise(enterprise.into()))
            }
            (None, Some(org)) => Mode::Metrics(MetricsTarget::Organization(org.into())),
            (None, None) => {
                return Err(SettingsError::Missing {
                    names: vec!["--enterprise"],
                    env_file: args.env_file,
                })
            }
        };

        Ok(Self {
            app_id,
            installation_id,
            private_key: private_key.into(),
            api_base: api_base.unwrap_or_else(|| API_BASE_DEFAULT.to_owned()),
            output: output.map(Into::into),
            mode,
            timeout: Duration::from_secs(args.timeout_secs),
            retries: args.retries,
        })
    }
}

/// Reads `KEY=value` pairs; a missing file yields no values.
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    dotenvy::from_path_iter(path)
        .and_then(|iter| iter.collect())
        .map_err(|err| SettingsError::ReadEnvFileFailed(path.to_owned(), err))
}

//
#[derive(Debug)]
pub enum SettingsError {
    Missing {
        names: Vec<&'static str>,
        env_file: PathBuf,
    },
    EnterpriseAndOrg,
    ReportNeedsEnterprise,
    ReadEnvFileFailed(PathBuf, dotenvy::Error),
}

impl core::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Missing { names, env_file } => write!(
                f,
                "Missing required settings: {}. Provide args or set them in {}.",
                names.join(", "),
                env_file.display()
            ),
            Self::EnterpriseAndOrg => write!(f, "Use either --enterprise or --org, not both."),
            Self::ReportNeedsEnterprise => {
                write!(f, "--report is only available for an --enterprise.")
            }
            Self::ReadEnvFileFailed(path, err) => write!(f, "{}: {err}", path.display()),
        }
    }
}
impl std::error::Error for SettingsError {}
