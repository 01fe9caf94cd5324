//! refscope science: DOI and arXiv lookups, enrichment, resolution cascade.

pub mod arxiv;
pub mod enrichment;
pub mod error;
pub mod fetch;
pub mod http;
pub mod naming;
pub mod page;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use enrichment::{Confirmation, Enricher, FixedAnswer, NoPage, PageProbe};
pub use error::{Result, ScienceError};
pub use fetch::{HttpFetcher, MetadataFetcher};
pub use naming::{FilenameStrategy, JournalVolumePage};
pub use page::{HtmlPageProbe, PageField};
pub use resolver::{ResolutionState, Resolver, StatusSink, TracingSink};
