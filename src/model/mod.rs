//! model
//!
//! The contract a wrapped model must satisfy.
//!
//! # Design
//!
//! A proxy never knows the concrete model type. It reads and writes through
//! [`Properties`], learns the model's shape from [`Model::attributes`] and
//! [`Model::relationships`], and finds computed properties through
//! [`Model::accessor`] instead of runtime reflection.
//!
//! Computed accessors receive the store they are evaluated against as a
//! `dyn Properties`. When a proxy evaluates one it passes itself, so a
//! derived value is computed from staged edits rather than committed state.
//!
//! `save` is the only asynchronous operation. Models are single-threaded,
//! so the trait is declared `?Send`.
//!
//! # Modules
//!
//! - [`members`] - Shared live member lists for to-many relationships
//! - [`record`] - In-memory model implementation

pub mod members;
pub mod record;

pub use members::LiveMembers;

use std::rc::Rc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::schema::{AttributeMeta, RelationshipMeta};
use crate::core::transform::{self, Transform};
use crate::core::value::Value;

/// Errors from a model's commit operation.
///
/// The proxy passes these through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The model rejected its own state.
    #[error("invalid record: {0}")]
    Invalid(String),

    /// Persisting the record failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// The backing store refused the commit.
    #[error("commit rejected: {0}")]
    Rejected(String),
}

/// Keyed property access. Keys may be dotted paths.
pub trait Properties {
    /// Read the value at `key`.
    fn get(&self, key: &str) -> Value;

    /// Write `value` at `key` and return it.
    fn set(&mut self, key: &str, value: Value) -> Value;
}

/// Getter half of a computed property.
pub type Getter = Rc<dyn Fn(&dyn Properties) -> Value>;

/// Setter half of a computed property. Expected to call `set` on the store
/// for each property it derives from.
pub type Setter = Rc<dyn Fn(&mut dyn Properties, Value)>;

/// A computed (derived) property.
#[derive(Clone, Default)]
pub struct Accessor {
    pub get: Option<Getter>,
    pub set: Option<Setter>,
}

impl Accessor {
    /// A read/write computed property.
    pub fn new(
        get: impl Fn(&dyn Properties) -> Value + 'static,
        set: impl Fn(&mut dyn Properties, Value) + 'static,
    ) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
        }
    }

    /// A read-only computed property.
    pub fn read_only(get: impl Fn(&dyn Properties) -> Value + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: None,
        }
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

/// A live, stateful entity a proxy can wrap.
#[async_trait(?Send)]
pub trait Model: Properties {
    /// Declared scalar attributes, in declaration order.
    fn attributes(&self) -> Vec<AttributeMeta>;

    /// Declared relationships, in declaration order.
    fn relationships(&self) -> Vec<RelationshipMeta>;

    /// Live member list of a to-many relationship.
    ///
    /// The returned handle must observe later changes to the relationship.
    fn members(&self, key: &str) -> Option<LiveMembers>;

    /// Computed property registered under `key`, if any.
    fn accessor(&self, _key: &str) -> Option<Accessor> {
        None
    }

    /// Transform registered under a declared value type.
    fn transform(&self, name: &str) -> Option<Rc<dyn Transform>> {
        transform::builtin(name)
    }

    /// Commit the model's current state.
    async fn save(&mut self) -> Result<(), ModelError>;
}
