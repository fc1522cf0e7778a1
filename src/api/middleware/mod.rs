//! API middleware and extractors

mod cors;
mod credential;
mod logging;

pub use cors::cors_layer;
pub use credential::BearerCredential;
pub use logging::RequestLogging;
