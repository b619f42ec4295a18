//! Infrastructure layer implementations.

pub mod database;

pub use database::{PostgresClient, PostgresConfig};
