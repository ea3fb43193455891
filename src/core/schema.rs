//! core::schema
//!
//! Attribute and relationship metadata, and key classification.
//!
//! A [`Schema`] is a snapshot of what a model declares. The proxy takes one
//! at construction and classifies every key it sees against it; later
//! changes to the model's declarations are not observed.

use std::fmt;

/// A declared scalar attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMeta {
    /// Property name.
    pub name: String,
    /// Declared value type (`"number"`, `"boolean"`, ...). Also the name of
    /// the transform applied when the attribute is staged.
    pub value_type: Option<String>,
}

impl AttributeMeta {
    pub fn new(name: impl Into<String>, value_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.map(str::to_string),
        }
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    ToOne,
    ToMany,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToOne => write!(f, "to-one"),
            Self::ToMany => write!(f, "to-many"),
        }
    }
}

/// A declared relationship to other entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMeta {
    pub name: String,
    pub kind: RelationshipKind,
    /// Related type, or a transform name when the relationship declares one.
    pub value_type: Option<String>,
}

impl RelationshipMeta {
    pub fn new(name: impl Into<String>, kind: RelationshipKind, value_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind,
            value_type: value_type.map(str::to_string),
        }
    }

    pub fn is_to_many(&self) -> bool {
        self.kind == RelationshipKind::ToMany
    }
}

/// How a key's root segment relates to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind<'a> {
    Attribute(&'a AttributeMeta),
    Relationship(&'a RelationshipMeta),
    Unknown,
}

impl KeyKind<'_> {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Declared value type of the attribute or relationship, if any.
    pub fn value_type(&self) -> Option<&str> {
        match self {
            Self::Attribute(attr) => attr.value_type.as_deref(),
            Self::Relationship(rel) => rel.value_type.as_deref(),
            Self::Unknown => None,
        }
    }
}

/// Ordered attribute and relationship declarations of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    attributes: Vec<AttributeMeta>,
    relationships: Vec<RelationshipMeta>,
}

impl Schema {
    pub fn new(attributes: Vec<AttributeMeta>, relationships: Vec<RelationshipMeta>) -> Self {
        Self {
            attributes,
            relationships,
        }
    }

    pub fn attributes(&self) -> &[AttributeMeta] {
        &self.attributes
    }

    pub fn relationships(&self) -> &[RelationshipMeta] {
        &self.relationships
    }

    pub fn to_many(&self) -> impl Iterator<Item = &RelationshipMeta> {
        self.relationships.iter().filter(|r| r.is_to_many())
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMeta> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipMeta> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Classify a single segment name.
    ///
    /// Relationships win over attributes when a model declares both under
    /// the same name.
    pub fn classify(&self, name: &str) -> KeyKind<'_> {
        if let Some(rel) = self.relationship(name) {
            KeyKind::Relationship(rel)
        } else if let Some(attr) = self.attribute(name) {
            KeyKind::Attribute(attr)
        } else {
            KeyKind::Unknown
        }
    }

    pub(crate) fn push_attribute(&mut self, meta: AttributeMeta) {
        self.attributes.retain(|a| a.name != meta.name);
        self.attributes.push(meta);
    }

    pub(crate) fn push_relationship(&mut self, meta: RelationshipMeta) {
        self.relationships.retain(|r| r.name != meta.name);
        self.relationships.push(meta);
    }
}
