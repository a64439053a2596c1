// src/lib.rs

//! Parcel package lifecycle server
//!
//! Tracks packages through registration, background fetch/build and
//! activation behind a token-authenticated HTTP API.
//!
//! # Architecture
//!
//! - Record store: SQLite, one fresh connection per operation
//! - Lifecycle engine: guarded status transitions plus an in-flight set so
//!   each package has at most one download running
//! - Fetch executor: `nix-instantiate` / `nix-build` behind a trait
//! - Token authority: random hex tokens, open until the first one is issued
//! - Gateway: axum router with a token gate over every route

pub mod auth;
pub mod config;
pub mod db;
mod error;
pub mod fetch;
pub mod lifecycle;
pub mod server;

pub use auth::{Access, TokenAuthority};
pub use config::ParcelConfig;
pub use db::Database;
pub use db::models::{Package, PackageStatus, Token};
pub use error::{Error, Result};
pub use fetch::{FetchReport, Fetcher, NixFetcher};
pub use lifecycle::{DownloadOutcome, DownloadStats, EngineConfig, PackageEngine};
