pub mod aggregate;
pub mod categories;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod ranking;
pub mod ratings;
pub mod reshape;
pub mod sink;
pub mod source;
pub mod table;
