//! Request pipeline middleware
//!
//! Inbound stages, outermost first:
//!
//! 1. [`request_id::tag_request`]
//! 2. [`access_log::log_access`]
//! 3. [`error_channel::install_error_channel`]
//! 4. [`auth::authenticate`]
//!
//! Authentication depends on the error channel being installed, and every
//! route handler runs behind authentication. [`upstream`] is the outbound
//! layer used for identity-provider calls.

pub mod access_log;
pub mod auth;
pub mod error_channel;
pub mod request_id;
pub mod upstream;

pub use request_id::{RequestContext, RequestId};
