use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CrawlError, Result};
use crate::extract::extract_links;
use crate::link::{LinkKind, LinkNode};
use crate::registry::VisitedRegistry;

const DEFAULT_DEPTH: usize = 2;
const MAX_DEPTH: usize = 20;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONCURRENCY: usize = 32;

/// Depth-bounded, concurrent link-tree crawler rooted at a single seed URL.
///
/// Configuration is fixed at construction; each call to [`Crawler::crawl`] or
/// [`Crawler::crawl_depth`] runs against a fresh [`VisitedRegistry`] and
/// returns the whole discovered tree. Failures while visiting individual
/// pages are recorded on their nodes and never abort the crawl.
#[derive(Debug)]
pub struct Crawler {
    client: Client,
    seed: String,
    seed_url: Url,
    same_host: bool,
    max_concurrency: usize,
    last_run: Mutex<Option<Arc<VisitedRegistry>>>,
}

impl Crawler {
    /// Creates a crawler with the default 5 second fetch timeout.
    /// Fails if the seed does not parse as a URL.
    pub fn new(seed: &str) -> Result<Self> {
        Self::with_timeout(seed, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(seed: &str, timeout: Duration) -> Result<Self> {
        let seed_url = Url::parse(seed)?;

        let client = Client::builder()
            .user_agent("sitetree/0.1 (https://github.com/trapdoorsec/sitetree)")
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            seed: seed.to_string(),
            seed_url,
            same_host: true,
            max_concurrency: DEFAULT_CONCURRENCY,
            last_run: Mutex::new(None),
        })
    }

    /// Restrict recursion to links resolving to the seed's host (on by default).
    pub fn with_same_host(mut self, same_host: bool) -> Self {
        self.same_host = same_host;
        self
    }

    /// Cap on concurrently in-flight fetches for one crawl.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Crawls to the default depth with duplicates shown.
    pub async fn crawl(&self) -> LinkNode {
        self.crawl_depth(DEFAULT_DEPTH, false).await
    }

    /// Crawls to `depth` levels below the root. A depth of zero resets to the
    /// default and anything above the hard ceiling is clamped down to it.
    /// With `hide_duplicates` set, re-encountered URLs are omitted from the
    /// tree entirely instead of kept as [`LinkKind::Existing`] leaves.
    pub async fn crawl_depth(&self, depth: usize, hide_duplicates: bool) -> LinkNode {
        let depth = clamp_depth(depth);
        info!("starting crawl of {} to depth {}", self.seed, depth);

        let registry = Arc::new(VisitedRegistry::new());
        let ctx = Arc::new(CrawlContext {
            client: self.client.clone(),
            registry: registry.clone(),
            root_host: self.seed_url.host_str().map(str::to_string),
            same_host: self.same_host,
            hide_duplicates,
            fetch_permits: Semaphore::new(self.max_concurrency),
        });

        ctx.registry.claim(&self.seed).await;
        let root = visit(ctx, LinkNode::root(&self.seed), depth).await;

        info!(
            "crawl of {} complete, {} URLs visited",
            self.seed,
            registry.len().await
        );
        *self.last_run.lock().await = Some(registry);
        root
    }

    /// Sorted snapshot of every URL visited by the most recent crawl.
    pub async fn history(&self) -> Vec<String> {
        match self.last_run.lock().await.as_ref() {
            Some(registry) => registry.snapshot().await,
            None => Vec::new(),
        }
    }
}

fn clamp_depth(depth: usize) -> usize {
    if depth == 0 {
        DEFAULT_DEPTH
    } else if depth > MAX_DEPTH {
        MAX_DEPTH
    } else {
        depth
    }
}

/// Per-crawl state shared by every branch of the traversal.
struct CrawlContext {
    client: Client,
    registry: Arc<VisitedRegistry>,
    root_host: Option<String>,
    same_host: bool,
    hide_duplicates: bool,
    fetch_permits: Semaphore,
}

/// Decision taken for a child after dedup and policy checks.
enum Scheduled {
    Leaf(LinkNode),
    Recurse(LinkNode),
}

/// A child's place in the parent's list while its subtree completes.
enum Slot {
    Done(LinkNode),
    Running { href: String, handle: JoinHandle<LinkNode> },
}

/// Visits one page: fetch and extract its anchors, settle each child's fate
/// in document order, then fan recursions out and join them all before
/// returning the finished node. `depth` is the remaining budget including
/// this node's own fetch.
fn visit(
    ctx: Arc<CrawlContext>,
    mut node: LinkNode,
    depth: usize,
) -> Pin<Box<dyn Future<Output = LinkNode> + Send>> {
    Box::pin(async move {
        fetch_and_extract(&ctx, &mut node).await;

        // Claim and kind-resolve every child in document order before any
        // recursion spawns, so duplicate handling within one page is
        // deterministic.
        let mut scheduled = Vec::with_capacity(node.children.len());
        for mut child in std::mem::take(&mut node.children) {
            if !ctx.registry.claim(&child.href).await {
                if ctx.hide_duplicates {
                    continue;
                }
                child.kind = LinkKind::Existing;
                scheduled.push(Scheduled::Leaf(child));
                continue;
            }

            // Hash links point inside a page that is already being visited.
            if child.kind == LinkKind::Hash {
                scheduled.push(Scheduled::Leaf(child));
                continue;
            }

            if ctx.same_host && child.kind != LinkKind::Path {
                match Url::parse(&child.href) {
                    Ok(child_url) => {
                        if child_url.host_str() != ctx.root_host.as_deref() {
                            scheduled.push(Scheduled::Leaf(child));
                            continue;
                        }
                    }
                    Err(e) => {
                        child.error = Some(e.into());
                        scheduled.push(Scheduled::Leaf(child));
                        continue;
                    }
                }
            }

            if depth > 1 {
                scheduled.push(Scheduled::Recurse(child));
            } else {
                scheduled.push(Scheduled::Leaf(child));
            }
        }

        let mut slots = Vec::with_capacity(scheduled.len());
        for entry in scheduled {
            match entry {
                Scheduled::Leaf(child) => slots.push(Slot::Done(child)),
                Scheduled::Recurse(child) => {
                    let href = child.href.clone();
                    let handle = tokio::spawn(visit(ctx.clone(), child, depth - 1));
                    slots.push(Slot::Running { href, handle });
                }
            }
        }

        let mut children = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Done(child) => children.push(child),
                Slot::Running { href, handle } => match handle.await {
                    Ok(child) => children.push(child),
                    Err(e) => {
                        warn!("subtree task for {} failed: {}", href, e);
                        let mut child = LinkNode::root(&href);
                        child.error = Some(CrawlError::Join(e));
                        children.push(child);
                    }
                },
            }
        }
        node.children = children;

        node
    })
}

/// Fetches the node's page and streams its body through the link extractor.
/// All failures end up on `node.error`; anchors found before a mid-body
/// failure are kept.
async fn fetch_and_extract(ctx: &CrawlContext, node: &mut LinkNode) {
    let url = node.fetch_url();
    let _permit = ctx.fetch_permits.acquire().await.ok();

    debug!("fetching {}", url);
    let response = match ctx.client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("fetch of {} failed: {}", url, e);
            node.error = Some(e.into());
            return;
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        node.error = Some(CrawlError::UnexpectedStatus(status.as_u16()));
        return;
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("text/html") {
        node.error = Some(CrawlError::UnsupportedContentType(content_type));
        return;
    }

    // Tokenize on a blocking thread while the body streams in, so the page
    // is never buffered whole.
    let (tx, rx) = mpsc::channel();
    let parser = tokio::task::spawn_blocking(move || extract_links(rx));

    let mut body = response.bytes_stream();
    let mut transport_error = None;
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => {
                if tx.send(chunk).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("body stream for {} failed: {}", url, e);
                transport_error = Some(CrawlError::from(e));
                break;
            }
        }
    }
    drop(tx);

    match parser.await {
        Ok(outcome) => {
            node.children = outcome
                .links
                .into_iter()
                .map(|link| LinkNode {
                    text: link.text,
                    href: link.href,
                    error: None,
                    kind: link.kind,
                    children: Vec::new(),
                    origin: Some(url.clone()),
                })
                .collect();
            node.error = transport_error.or_else(|| outcome.error.map(CrawlError::Parse));
        }
        Err(e) => {
            node.error = Some(CrawlError::Join(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_resets_to_default() {
        assert_eq!(clamp_depth(0), DEFAULT_DEPTH);
    }

    #[test]
    fn depth_in_range_is_kept() {
        assert_eq!(clamp_depth(1), 1);
        assert_eq!(clamp_depth(7), 7);
        assert_eq!(clamp_depth(MAX_DEPTH), MAX_DEPTH);
    }

    #[test]
    fn depth_above_ceiling_is_clamped() {
        assert_eq!(clamp_depth(MAX_DEPTH + 1), MAX_DEPTH);
        assert_eq!(clamp_depth(usize::MAX), MAX_DEPTH);
    }

    #[test]
    fn unparsable_seed_is_rejected() {
        let err = Crawler::new("not a url").unwrap_err();
        assert!(matches!(err, CrawlError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn history_is_empty_before_any_crawl() {
        let crawler = Crawler::new("https://example.com/").unwrap();
        assert!(crawler.history().await.is_empty());
    }
}
