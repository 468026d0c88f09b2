//! Per-collection database operations for the ingest & review service

pub mod batches;
pub mod categories;
pub mod observations;
pub mod records;
pub mod reviews;
