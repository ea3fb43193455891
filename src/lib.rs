//! Simple Changeset - buffered, discardable edits over a live model
//!
//! A [`proxy::ChangeProxy`] wraps a model and stages every write locally.
//! Reads see staged values first and fall back to the model. Staged edits
//! reach the model only through an explicit apply or save, and can be
//! discarded at any point.
//!
//! # Architecture
//!
//! - [`core`] - Values, schema metadata, value transforms and configuration
//! - [`model`] - The model contract and an in-memory record implementation
//! - [`proxy`] - The change proxy and its staged collections
//! - [`cli`] - The `changeset` command-line tool
//!
//! # Invariants
//!
//! 1. The model is untouched until changes are applied or saved
//! 2. Reads through the proxy reflect staged edits before model state
//! 3. Rolling back restores the proxy to reading the model's current state
//! 4. Staged to-many collections follow the model until first mutated

pub mod cli;
pub mod core;
pub mod model;
pub mod proxy;
