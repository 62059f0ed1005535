use thiserror::Error;

/// Failures that can occur while visiting a single page.
///
/// Apart from [`CrawlError::InvalidUrl`] raised for an unparsable seed, these
/// are never returned to the caller directly; they are recorded on the
/// affected [`crate::LinkNode`] and the crawl carries on around them.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("unexpected content type: {0}")]
    UnsupportedContentType(String),

    #[error("HTML parse error: {0}")]
    Parse(String),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
