pub mod crawler;
pub mod error;
pub mod extract;
pub mod link;
pub mod registry;

pub use crawler::Crawler;
pub use error::CrawlError;
pub use link::{classify, LinkKind, LinkNode};
pub use registry::VisitedRegistry;
