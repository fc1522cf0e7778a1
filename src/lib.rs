//! Rota Modem - IP rotation for remotely-managed modem proxies
//!
//! Rotation is performed by a third-party provider that only offers a trigger
//! URL and an eventually-consistent status URL. This crate turns fuzzy user
//! input into concrete targets, drives each rotation through a verification
//! workflow, fans batches out under a concurrency cap, and keeps a bounded
//! history of outcomes.
//!
//! ## Layout
//!
//! - [`rotation`]: resolver, filters, workflow engine, fan-out, backoff
//! - [`account`]: account API client (the authoritative proxy listing)
//! - [`history`]: bounded history log with file, memory and postgres backends
//! - [`services`]: the operations exposed to callers
//! - [`api`]: HTTP and WebSocket surface

pub mod account;
pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod history;
pub mod models;
pub mod report;
pub mod repository;
pub mod rotation;
pub mod services;

pub use config::Config;
pub use database::Database;
pub use error::{Result, RotaError};
pub use history::HistoryStore;
pub use services::RotationService;
