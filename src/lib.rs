//! Document Parser API
//!
//! Accepts document uploads over HTTP, hands them to LlamaParse in the
//! background and keeps an in-memory record of every job so clients can
//! poll for the parsed markdown.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::build_router;
