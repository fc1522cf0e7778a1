//! HTTP API
//!
//! REST endpoints for resolving and rotating proxies, reading history, and a
//! WebSocket stream of rotation progress.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{ApiServer, AppState};
