//! mediavault-server: thin HTTP routing over the mediavault core
//!
//! Handlers resolve the caller, translate the request, and map core
//! outcomes to status codes. Every decision is made in `mediavault-core`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
