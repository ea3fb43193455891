//! core::value
//!
//! Dynamic values exchanged between a proxy and its model.
//!
//! # Types
//!
//! - [`Value`] - A scalar, an entity handle, or an ordered list of entities
//! - [`EntityRef`] - Shared handle to a related entity, either the record
//!   itself or a relationship proxy wrapping it
//!
//! # Identity
//!
//! Entities compare by identity, never by content. Two handles name the same
//! entity when they unwrap to the same underlying record, even if one of them
//! is a relationship proxy (see [`EntityRef::same_entity`]).
//!
//! # Example
//!
//! ```
//! use simple_changeset::core::value::{EntityRef, Value};
//! use simple_changeset::model::record::Record;
//!
//! let paul = EntityRef::new(Record::new().with_attribute("firstName", None));
//! paul.set("firstName", "Paul".into());
//!
//! let proxied = EntityRef::proxy(Some(paul.clone()));
//! assert!(proxied.same_entity(&paul));
//! assert!(!proxied.same_handle(&paul));
//! assert_eq!(Value::Entity(proxied).lookup("firstName"), Value::from("Paul"));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDate;

use crate::model::{Model, Properties};

/// Split a dotted key into its root segment and the remaining path.
///
/// ```
/// use simple_changeset::core::value::split_root;
///
/// assert_eq!(split_root("follows.firstName"), ("follows", Some("firstName")));
/// assert_eq!(split_root("a.b.c"), ("a", Some("b.c")));
/// assert_eq!(split_root("firstName"), ("firstName", None));
/// ```
pub fn split_root(key: &str) -> (&str, Option<&str>) {
    match key.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (key, None),
    }
}

/// A value read from or written to a model property.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// A to-one relationship target.
    Entity(EntityRef),
    /// The members of a to-many relationship, in order.
    Entities(Vec<EntityRef>),
}

impl Value {
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_entities(&self) -> Option<&[EntityRef]> {
        match self {
            Self::Entities(members) => Some(members),
            _ => None,
        }
    }

    /// The record behind a to-one value, after unwrapping any proxy.
    ///
    /// `Null` and empty proxies both yield `None`.
    pub fn underlying(&self) -> Option<EntityRef> {
        match self {
            Self::Entity(e) => e.content(),
            _ => None,
        }
    }

    /// Read a dotted path relative to this value.
    ///
    /// Entities delegate the path to the related model. Entity lists accept a
    /// numeric index as their first segment. Any other value has no nested
    /// properties and yields `Null`.
    pub fn lookup(&self, path: &str) -> Self {
        match self {
            Self::Entity(e) => e.get(path),
            Self::Entities(members) => {
                let (head, rest) = split_root(path);
                let Some(member) = head.parse::<usize>().ok().and_then(|i| members.get(i)) else {
                    return Self::Null;
                };
                match rest {
                    Some(rest) => member.get(rest),
                    None => Self::Entity(member.clone()),
                }
            }
            _ => Self::Null,
        }
    }

    /// Short type name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::Entity(_) => "entity",
            Self::Entities(_) => "entities",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a.same_entity(b),
            // An empty relationship proxy reads the same as no relationship.
            (Self::Entity(e), Self::Null) | (Self::Null, Self::Entity(e)) => e.content().is_none(),
            (Self::Entities(a), Self::Entities(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_entity(y))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Date(d) => write!(f, "Date({d})"),
            Self::Entity(e) => write!(f, "Entity({e:?})"),
            Self::Entities(members) => f.debug_tuple("Entities").field(members).finish(),
        }
    }
}

/// Renders the value the way a template would show it: `Null` is empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Entity(e) => write!(f, "{e}"),
            Self::Entities(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<EntityRef> for Value {
    fn from(e: EntityRef) -> Self {
        Self::Entity(e)
    }
}

impl From<Vec<EntityRef>> for Value {
    fn from(members: Vec<EntityRef>) -> Self {
        Self::Entities(members)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

/// Shared handle to an entity.
///
/// A handle is either the record itself or a relationship proxy whose
/// content may be swapped when the relationship is reassigned. Cloning a
/// handle never copies the entity.
#[derive(Clone)]
pub struct EntityRef(Handle);

#[derive(Clone)]
enum Handle {
    Record(Rc<RefCell<dyn Model>>),
    Proxy(Rc<RefCell<Option<EntityRef>>>),
}

impl EntityRef {
    /// Wrap a model in a new shared record handle.
    pub fn new<M: Model + 'static>(model: M) -> Self {
        let shared: Rc<RefCell<dyn Model>> = Rc::new(RefCell::new(model));
        Self(Handle::Record(shared))
    }

    /// Create a relationship proxy around `content`.
    ///
    /// Proxies never nest: wrapping a proxy stores the record it points at.
    pub fn proxy(content: Option<EntityRef>) -> Self {
        let content = content.and_then(|e| e.content());
        Self(Handle::Proxy(Rc::new(RefCell::new(content))))
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.0, Handle::Proxy(_))
    }

    /// The underlying record handle, unwrapping proxies.
    pub fn content(&self) -> Option<EntityRef> {
        match &self.0 {
            Handle::Record(_) => Some(self.clone()),
            Handle::Proxy(slot) => slot.borrow().as_ref().and_then(EntityRef::content),
        }
    }

    /// Point a relationship proxy at a new record. No-op on record handles.
    pub fn set_content(&self, content: Option<EntityRef>) {
        if let Handle::Proxy(slot) = &self.0 {
            let resolved = content.and_then(|e| e.content());
            *slot.borrow_mut() = resolved;
        }
    }

    /// True when both handles are the very same handle (proxy or record).
    pub fn same_handle(&self, other: &EntityRef) -> bool {
        self.addr() == other.addr()
    }

    /// True when both handles resolve to the same underlying record.
    pub fn same_entity(&self, other: &EntityRef) -> bool {
        match (self.content(), other.content()) {
            (Some(a), Some(b)) => a.addr() == b.addr(),
            (None, None) => self.same_handle(other),
            _ => false,
        }
    }

    /// Read a property of the underlying record.
    ///
    /// Returns `Null` for an empty proxy, or when the record is already
    /// mutably borrowed (a cyclic read through a model being edited).
    pub fn get(&self, key: &str) -> Value {
        self.with(|model| model.get(key)).unwrap_or_default()
    }

    /// Write a property of the underlying record. Returns `false` if the
    /// handle is empty or the record is busy.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let Some(Handle::Record(shared)) = self.content().map(|e| e.0) else {
            return false;
        };
        let Ok(mut model) = shared.try_borrow_mut() else {
            tracing::warn!(key, "entity is already borrowed, write refused");
            return false;
        };
        model.set(key, value);
        true
    }

    /// Run `f` against the underlying record.
    pub fn with<R>(&self, f: impl FnOnce(&dyn Model) -> R) -> Option<R> {
        let Some(Handle::Record(shared)) = self.content().map(|e| e.0) else {
            return None;
        };
        let Ok(model) = shared.try_borrow() else {
            tracing::warn!("entity is mutably borrowed, read refused");
            return None;
        };
        Some(f(&*model))
    }

    /// Access the shared record cell, if this handle resolves to one.
    pub fn shared(&self) -> Option<Rc<RefCell<dyn Model>>> {
        match self.content()?.0 {
            Handle::Record(shared) => Some(shared),
            Handle::Proxy(_) => None,
        }
    }

    fn addr(&self) -> *const () {
        match &self.0 {
            Handle::Record(rc) => Rc::as_ptr(rc).cast::<()>(),
            Handle::Proxy(rc) => Rc::as_ptr(rc).cast::<()>(),
        }
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Handle::Record(_) => write!(f, "record@{:p}", self.addr()),
            Handle::Proxy(_) => match self.content() {
                Some(inner) => write!(f, "proxy@{:p}({inner:?})", self.addr()),
                None => write!(f, "proxy@{:p}(empty)", self.addr()),
            },
        }
    }
}

/// Displays the record's `id` when it has one, else its address.
impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.content() {
            None => Ok(()),
            Some(inner) => match inner.get("id") {
                Value::Null => write!(f, "{:p}", inner.addr()),
                id => write!(f, "@{id}"),
            },
        }
    }
}
