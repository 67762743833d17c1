//! HTTP server boundary.

pub mod routes;

pub use routes::{app_router, AppState};
