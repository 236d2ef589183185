//! Blocking client for the Gorse recommender system HTTP API.
//!
//! # Overview
//! `GorseClient` exposes typed operations (users, items, feedback and
//! recommendation lists). Each call becomes one HTTP request against the
//! configured endpoint, authenticated with the `X-API-Key` header, and the
//! JSON response is decoded into the operation's result type.
//!
//! # Design
//! - One dispatcher (`GorseClient::send`) builds, executes and decodes every
//!   request; the per-entity methods in `endpoints` only name paths and
//!   parameters.
//! - The network round trip sits behind the `Transport` trait. The default
//!   `UreqTransport` owns one pooled agent for the lifetime of the client.
//! - No retries, no caching, no session state: exactly one request per call.
//!
//! ```no_run
//! use gorse_client::{GorseClient, ListOptions};
//!
//! let client = GorseClient::new("http://127.0.0.1:8087", "api-key")?;
//! let items = client.get_recommend("alice", &ListOptions::new().n(10))?;
//! # Ok::<(), gorse_client::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod query;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{GorseClient, API_KEY_HEADER, NO_BODY};
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use query::{ListOptions, QueryValue};
pub use types::{Feedback, Item, RowAffected, User};
