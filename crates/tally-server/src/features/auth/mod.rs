//! Login
//!
//! Credentials are checked by the configured
//! [`IdentityProvider`](crate::identity::IdentityProvider); every attempt
//! leaves a trace in the security event log.

pub mod login;

pub use login::{auth_routes, LoginCommand, LoginError, LoginResponse};
