//! Database initialization and shared access helpers

pub mod init;
pub mod settings;

pub use init::init_database;
