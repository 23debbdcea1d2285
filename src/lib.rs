//! Research gateway: credential-caching client and HTTP surface for a
//! Watson ML research assistant deployment.
//!
//! [`gateway::Gateway`] owns the credential lifecycle and the
//! dispatch-with-retry protocol; [`adapters`] shape caller input into
//! conversations; [`server`] exposes them over axum.

pub mod adapters;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod server;

#[cfg(test)]
mod testing;
