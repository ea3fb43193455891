//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! relationship_identity = "underlying"
//! apply_transforms = true
//! ```

use serde::{Deserialize, Serialize};

/// How to-one relationship values are compared when computing dirty state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Unwrap relationship proxies and compare the records behind them.
    #[default]
    Underlying,
    /// Compare handles as given; a proxy never equals the record it wraps.
    Reference,
}

/// File-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChangesetConfig {
    /// Identity policy for to-one dirty checks
    pub relationship_identity: Option<IdentityPolicy>,

    /// Whether declared value transforms run when a property is staged
    pub apply_transforms: Option<bool>,
}

/// Resolved options consumed by a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingOptions {
    pub relationship_identity: IdentityPolicy,
    pub apply_transforms: bool,
}

impl Default for StagingOptions {
    fn default() -> Self {
        Self {
            relationship_identity: IdentityPolicy::Underlying,
            apply_transforms: true,
        }
    }
}
