// src/server/handlers/mod.rs
//! HTTP request handlers for the Parcel server

pub mod meta;
pub mod packages;
pub mod tokens;
