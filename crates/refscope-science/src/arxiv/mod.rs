pub mod client;
pub mod parser;
pub mod query;

pub use client::ArxivClient;
pub use parser::{ArxivEntry, parse_feed};
pub use query::ArxivQuery;
