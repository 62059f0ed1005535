mod arguments;

use std::fs;
use std::time::Duration;

use anyhow::Context;
use arguments::Args;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sitetree_crawler::Crawler;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let crawler = Crawler::with_timeout(args.url.as_str(), Duration::from_secs(args.timeout))
        .context("failed to create crawler")?
        .with_same_host(args.same_domain);

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Crawling {}...", args.url));
        Some(pb)
    };

    let root = crawler.crawl_depth(args.depth, args.hide_duplicates).await;
    let history = crawler.history().await;

    if let Some(pb) = spinner {
        pb.finish_with_message(format!("Crawl complete, {} URLs visited", history.len()));
    }

    let tree = serde_json::to_string_pretty(&root).context("failed to serialize crawl tree")?;
    match &args.output_file {
        Some(path) => fs::write(path, &tree)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{tree}"),
    }

    if let Some(path) = &args.history_file {
        let list =
            serde_json::to_string_pretty(&history).context("failed to serialize history")?;
        fs::write(path, list).with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}
