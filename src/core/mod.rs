//! core
//!
//! Domain types shared by models and proxies.
//!
//! # Modules
//!
//! - [`value`] - Dynamic values and entity handles
//! - [`schema`] - Attribute/relationship metadata and key classification
//! - [`transform`] - Value transforms keyed by declared type
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod schema;
pub mod transform;
pub mod value;
