//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Download scanned book PDFs from a Bookscan bookshelf.
///
/// Credentials come from the BOOKSCAN_USER_ID and BOOKSCAN_PASSWORD
/// environment variables (a .env file is honored).
#[derive(Parser, Debug)]
#[command(name = "bookscan-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download books from your Bookscan bookshelf
    Download(DownloadArgs),
}

/// Options for the download command.
#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Books to download per page (1-100); ignored with --all
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub limit: u8,

    /// Listing page to start from
    #[arg(short = 'p', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub start_page: u32,

    /// Download every book on every page until the bookshelf is exhausted
    #[arg(short, long)]
    pub all: bool,

    /// Directory where downloaded PDFs are saved
    #[arg(long, default_value = "downloads")]
    pub download_dir: PathBuf,
}
