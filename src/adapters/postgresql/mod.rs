//! PostgreSQL table store
//!
//! Datasets map to schemas. External tables are `file_fdw` foreign tables over
//! a mounted copy of the buckets; bulk loads stream the blob through `COPY`.

pub mod adapter;
pub mod client;
pub mod sql;

pub use adapter::PostgresTableStore;
pub use client::PostgresClient;
