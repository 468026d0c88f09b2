//! # Rostra Common Library
//!
//! Shared code for the Rostra provider-enrollment review services including:
//! - Domain models (observations, bulk batches, review entries)
//! - Event types (RostraEvent enum) and the EventBus
//! - Configuration loading
//! - Database initialization and settings access

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
