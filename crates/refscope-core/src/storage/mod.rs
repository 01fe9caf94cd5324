pub mod cache;
pub mod catalog;
pub mod kv;
pub mod library;
