//! Infrastructure layer: versioned storage, directory stores, config, seeding.

pub mod config;
pub mod memory;
pub mod postgres;
pub mod seed;
pub mod temporal_table;

#[cfg(test)]
mod integration_tests;

pub use config::DirectoryConfig;
pub use memory::InMemoryDirectoryStore;
pub use postgres::PostgresDirectoryStore;
pub use seed::{TestUser, load_test_users, seed_test_users};
pub use temporal_table::TemporalTable;
