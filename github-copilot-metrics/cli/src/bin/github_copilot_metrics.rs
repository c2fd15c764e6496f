/*
cargo run -p github-copilot-metrics-cli --bin github_copilot_metrics -- \
    --app-id 'app_id' --private-key '/path/private-key.pem' \
    --installation-id 'installation_id' --enterprise 'enterprise'

Or

cargo install github-copilot-metrics-cli
github_copilot_metrics --app-id 'app_id' --private-key '/path/private-key.pem' \
    --installation-id 'installation_id' --enterprise 'enterprise' --report --pr-summary
*/

use std::{fs, process::ExitCode};

use chrono::Local;
use clap::Parser as _;
use github_copilot_metrics::{
    output::{default_pr_summary_path, default_report_path, write_payload},
    retry::BASE_DELAY_DEFAULT,
    timeseries::{build_pr_timeseries, summarize},
    AppCredentials, Error, Flow, IsahcClient, RetryPolicy, Stage,
};
use github_copilot_metrics_cli::settings::{load_env_file, Args, Mode, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let env = load_env_file(&args.env_file)?;
    let settings = Settings::resolve(args, &env)?;

    info!(path = %settings.private_key.display(), "loading private key");
    let private_key_pem =
        fs::read(&settings.private_key).map_err(|err| Error::io(&settings.private_key, err))?;
    let credentials =
        AppCredentials::new(&settings.app_id, &settings.installation_id, private_key_pem);

    let client = IsahcClient::new(settings.timeout)?;
    let flow = Flow::new(client, &settings.api_base).with_retry_policy(RetryPolicy::new(
        settings.retries + 1,
        BASE_DELAY_DEFAULT,
    ));

    match settings.mode {
        Mode::Metrics(target) => {
            let body = flow.fetch_metrics(&credentials, &target)?;
            write_payload(&body, settings.output.as_deref())?;
        }
        Mode::Report {
            enterprise,
            pr_summary,
        } => {
            let bundle = flow.fetch_report(&credentials, &enterprise)?;

            let today = Local::now().date_naive();
            let path = settings
                .output
                .unwrap_or_else(|| default_report_path(today));
            info!(path = %path.display(), "writing output");
            write_payload(bundle.to_json_pretty()?.as_bytes(), Some(&path))?;

            if pr_summary {
                let timeseries = build_pr_timeseries(&bundle.reports);
                if timeseries.is_empty() {
                    return Err("No pull request data found in reports.".into());
                }

                let path = default_pr_summary_path(today);
                info!(path = %path.display(), days = timeseries.len(), "writing pull request summary");
                let mut json = serde_json::to_string_pretty(&summarize(timeseries))?;
                json.push('\n');
                write_payload(json.as_bytes(), Some(&path))?;
            }
        }
    }

    info!(stage = ?Stage::Done, "done");

    Ok(())
}
