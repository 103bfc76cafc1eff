//! Azure Cosmos DB record store
//!
//! Each collection maps to a container partitioned on `/id`.

pub mod client;

pub use client::{document_id, CosmosRecordStore};
