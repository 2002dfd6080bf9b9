//! OIDC authentication module

pub mod cache;
pub mod discovery;
pub mod userinfo;

pub use cache::IdentityCache;
pub use discovery::{OidcConfigError, OidcConfiguration, UserInfoEndpoint};
pub use userinfo::{Identity, UserInfoClient, UserInfoError};
