use serde::{Deserialize, Serialize, Serializer};

use crate::error::CrawlError;

/// Classification of an anchor's raw `href`, before any resolution.
///
/// The string tags match the JSON wire format (`pagelink`, `pathlink`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// Absolute `http://` or `https://` link.
    #[serde(rename = "pagelink")]
    Page,
    /// Host-relative link starting with `/`.
    #[serde(rename = "pathlink")]
    Path,
    /// Fragment link starting with `#`, a position on the current page.
    #[serde(rename = "hashlink")]
    Hash,
    /// Anything else (scheme-less relative paths, `mailto:`, ...).
    #[serde(rename = "unknownlink")]
    Unknown,
    /// Assigned by the crawl engine when the URL was already visited;
    /// never produced by [`classify`].
    #[serde(rename = "existinglink")]
    Existing,
}

/// Maps a raw href to its [`LinkKind`]. First matching rule wins.
pub fn classify(href: &str) -> LinkKind {
    if href.starts_with("http://") || href.starts_with("https://") {
        LinkKind::Page
    } else if href.starts_with('#') {
        LinkKind::Hash
    } else if href.starts_with('/') {
        LinkKind::Path
    } else {
        LinkKind::Unknown
    }
}

/// One node of the discovered link tree.
///
/// `href` and `kind` are fixed when the anchor is parsed out of its parent
/// page (`kind` may later be rewritten to [`LinkKind::Existing`] on a
/// duplicate); `error` and `children` are filled in exactly once if and when
/// the node itself is visited.
#[derive(Debug, Serialize)]
pub struct LinkNode {
    pub text: String,
    pub href: String,
    #[serde(
        rename = "err",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<CrawlError>,
    #[serde(rename = "linkType")]
    pub kind: LinkKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LinkNode>,
    /// URL of the page this anchor was found on, as actually fetched.
    /// Used only to resolve path links; never serialized.
    #[serde(skip)]
    pub(crate) origin: Option<String>,
}

impl LinkNode {
    /// Root node for a crawl starting at `seed`.
    pub(crate) fn root(seed: &str) -> Self {
        Self {
            text: String::new(),
            href: seed.to_string(),
            error: None,
            kind: classify(seed),
            children: Vec::new(),
            origin: None,
        }
    }

    /// The URL this node's page should be requested from.
    ///
    /// Path links are prefixed with the URL of the page that linked to them,
    /// unless the href already carries that prefix. Everything else is
    /// fetched as written.
    pub(crate) fn fetch_url(&self) -> String {
        match &self.origin {
            Some(origin) if self.kind == LinkKind::Path && !self.href.starts_with(origin.as_str()) => {
                format!("{}{}", origin, self.href)
            }
            _ => self.href.clone(),
        }
    }
}

fn serialize_error<S>(error: &Option<CrawlError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
