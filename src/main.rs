//! CLI entry point for the Bookscan downloader.

use anyhow::Result;
use bookscan_core::driver::ChromiumDriver;
use bookscan_core::{Credentials, Crawler, PageDriver, RunConfig, RunSummary, Session};
use clap::Parser;
use tracing::{debug, info, trace, warn};

mod cli;

use cli::{Args, Command, DownloadArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file is optional; real environment variables win.
    dotenvy::dotenv().ok();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    match args.command {
        Command::Download(download) => run_download(&download).await,
    }
}

async fn run_download(args: &DownloadArgs) -> Result<()> {
    // Fails before any navigation when the variables are unset.
    let credentials = Credentials::from_env()?;

    let driver = ChromiumDriver::launch(&args.download_dir).await?;
    let result = crawl(&driver, &credentials, args).await;
    driver.close().await;

    let summary = result?;
    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        last_page_visited = summary.last_page_visited,
        "all downloads completed"
    );
    Ok(())
}

async fn crawl(
    driver: &ChromiumDriver,
    credentials: &Credentials,
    args: &DownloadArgs,
) -> Result<RunSummary> {
    let session = match Session::establish(driver, credentials).await {
        Ok(session) => session,
        Err(e) => {
            if let Ok(html) = driver.content().await {
                trace!(page = %html, "page content at login failure");
            }
            return Err(e.into());
        }
    };

    let config = RunConfig {
        limit_per_page: usize::from(args.limit),
        start_page: args.start_page,
        all_pages: args.all,
    };
    info!(
        start_page = config.start_page,
        all_pages = config.all_pages,
        limit_per_page = config.limit_per_page,
        download_dir = %args.download_dir.display(),
        "starting bookshelf crawl"
    );

    let crawler = Crawler::new(session, args.download_dir.clone());
    match crawler.run(&config).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            // Item failures never land here; this is a listing-level abort.
            // Report the partial counts, then exit nonzero.
            warn!(
                attempted = e.summary.attempted,
                succeeded = e.summary.succeeded,
                failed = e.summary.failed,
                last_page_visited = e.summary.last_page_visited,
                "crawl aborted with partial results"
            );
            Err(e.into())
        }
    }
}
