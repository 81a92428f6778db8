//! External-LMS access for Lectern.
//!
//! [`LmsClient`] is the typed HTTP client for the external system's REST
//! API; [`CredentialResolver`] turns a sync target into an authenticated
//! client, refreshing delegated tokens through the [`oauth::TokenEndpoint`]
//! when they have expired.

pub mod client;
pub mod error;
pub mod oauth;
pub mod resolver;

pub use client::LmsClient;
pub use error::{Error, Result};
pub use resolver::{CredentialResolver, LmsSettings};
