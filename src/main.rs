mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands, FetchArgs};
use grabbox::config::{Config, WorkerCount};
use grabbox::ledger::StatusReport;
use grabbox::worker::{self, YtDlpFetcher, YtDlpOptions};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<ExitCode, AnyError> {
    grabbox::observability::init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load_with(cli.config)?;

    match cli.command {
        Commands::Server(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            grabbox::api::run(config).await?;
        }
        Commands::Fetch(args) => return Ok(fetch(config, args).await),
        Commands::Config => print!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(ExitCode::SUCCESS)
}

async fn fetch(mut config: Config, args: FetchArgs) -> ExitCode {
    if let Some(workers) = args.workers {
        config.workers.max_workers = WorkerCount::or_default(workers);
    }

    let fetcher = YtDlpFetcher::new(YtDlpOptions::from(&config.fetcher));
    if fetcher.probe().await.is_none() {
        eprintln!("warning: {} is not runnable, every URL will fail", config.fetcher.binary);
    }

    let report = worker::run_batch(
        &config.workers,
        Arc::new(fetcher),
        &args.urls,
        grabbox::api::shutdown_signal(),
    )
    .await;

    print_report(&report);

    if report.failed.is_empty() && report.queued.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &StatusReport) {
    for url in &report.completed {
        println!("done     {url}");
    }
    for entry in &report.failed {
        println!("failed   {}: {}", entry.url, entry.error);
    }
    for url in &report.queued {
        println!("skipped  {url}");
    }
    println!(
        "{} completed, {} failed, {} not started",
        report.completed.len(),
        report.failed.len(),
        report.queued.len()
    );
}
