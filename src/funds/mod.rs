//! Funds API: domain types, wire types and the HTTP client.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod types;

pub use client::FundsClient;
pub use types::{Activity, ActivityPatch, Derived, NewActivity};
