use std::collections::HashSet;

use tokio::sync::RwLock;

/// Concurrency-safe record of every URL claimed during one crawl.
///
/// A registry lives exactly as long as a single crawl invocation and is the
/// only state shared between concurrently running branches of the tree.
/// Deduplication goes through [`VisitedRegistry::claim`], an atomic
/// insert-if-absent, so two branches racing on the same URL can never both
/// win it.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    seen: RwLock<HashSet<String>>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url` for the caller. Returns `true` if this caller was the
    /// first to see it, `false` if it was already registered.
    pub async fn claim(&self, url: &str) -> bool {
        self.seen.write().await.insert(url.to_string())
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.seen.read().await.contains(url)
    }

    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }

    /// Point-in-time list of every registered URL, sorted for stable output.
    /// Used for reporting only, never for crawl decisions.
    pub async fn snapshot(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.seen.read().await.iter().cloned().collect();
        urls.sort();
        urls
    }
}
