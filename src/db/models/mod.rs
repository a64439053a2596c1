// src/db/models/mod.rs

//! Data models for Parcel database entities
//!
//! Each struct maps one table row and carries the queries that read and
//! write it. Callers pass in a connection; models never open their own.

mod package;
mod token;

pub use package::{Package, PackageStatus};
pub use token::Token;
