use std::path::PathBuf;

use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// The URL to start crawling from
    #[arg(short, long)]
    pub url: Url,

    /// Only recurse into links on the same host as the start URL
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub same_domain: bool,

    /// HTTP fetch timeout in seconds
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// How many levels below the start URL to crawl, clamped to [1, 20]
    #[arg(short, long, default_value_t = 2)]
    pub depth: usize,

    /// Omit already-visited links from the tree instead of marking them
    #[arg(long)]
    pub hide_duplicates: bool,

    /// Write the crawled tree to this file instead of stdout
    #[arg(short, long)]
    pub output_file: Option<PathBuf>,

    /// Write the list of visited URLs to this file
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Suppress the progress spinner
    #[arg(short, long)]
    pub quiet: bool,
}
