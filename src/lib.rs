//! Bookdex library — book-cataloging HTTP API.
//!
//! This crate provides the core components for running a book-catalog
//! server: request handling, payload validation, the book lifecycle
//! manager that keeps catalog records and cover-image objects in sync,
//! and pluggable catalog and cover stores.

pub mod catalog;
pub mod config;
pub mod covers;
pub mod errors;
pub mod handlers;
pub mod ident;
pub mod lifecycle;
pub mod metrics;
pub mod server;
pub mod validation;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::covers::sign::UrlSigner;
use crate::covers::Covers;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Catalog store handle (SQLite or in-memory), or an explicit
    /// unavailable state when the store could not be opened.
    pub catalog: Catalog,
    /// Cover-image store handle (local filesystem, S3 gateway, or
    /// in-memory), or an explicit disabled state.
    pub covers: Covers,
    /// URL signer for locally served cover URLs. Present only for the
    /// local cover backend; cloud backends presign their own URLs.
    pub cover_signer: Option<UrlSigner>,
}
