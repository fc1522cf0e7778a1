//! PostgreSQL access for the `postgres` history backend

mod migrations;
mod pool;

pub use migrations::run_migrations;
pub use pool::{Database, PoolStats};
