pub mod identifier;
pub mod record;

pub use identifier::*;
pub use record::{Author, MetadataRecord, keys};
