//! External identity provider client for Meridian.
//!
//! The identity provider issues the tenant-scoped local accounts Meridian
//! binds to global identities. This crate exposes the live profile lookup
//! the aggregator consumes, behind the [`ProfileSource`] trait so tests can
//! swap in an in-memory source.

mod error;
mod http;
mod profile;
mod source;

pub use error::{ClientError, Result};
pub use http::HttpIdentityClient;
pub use profile::{Profile, Tenant};
pub use source::{ProfileSource, StaticProfiles};
