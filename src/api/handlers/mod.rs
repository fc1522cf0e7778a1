//! API request handlers

pub mod health;
pub mod history;
pub mod rotations;
pub mod targets;
