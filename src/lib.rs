//! Register backend library
//!
//! HTTP backend for cash registers with every request authenticated against
//! an OpenID Connect userinfo endpoint.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod oidc;
pub mod reporting;
pub mod routes;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;
