//! model::members
//!
//! Live member lists for to-many relationships.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::value::EntityRef;

/// Shared, ordered member list of a to-many relationship.
///
/// Clones share the same list: a change made through one handle is seen
/// through every other. A model hands one of these out from
/// [`Model::members`](super::Model::members) so that readers observe the
/// relationship as it changes.
#[derive(Clone, Default)]
pub struct LiveMembers(Rc<RefCell<Vec<EntityRef>>>);

impl LiveMembers {
    pub fn new(members: Vec<EntityRef>) -> Self {
        Self(Rc::new(RefCell::new(members)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<EntityRef> {
        self.0.borrow().get(index).cloned()
    }

    pub fn first(&self) -> Option<EntityRef> {
        self.0.borrow().first().cloned()
    }

    pub fn last(&self) -> Option<EntityRef> {
        self.0.borrow().last().cloned()
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.0.borrow().iter().any(|m| m.same_entity(entity))
    }

    /// Copy of the current members, in order.
    pub fn to_vec(&self) -> Vec<EntityRef> {
        self.0.borrow().clone()
    }

    pub fn push(&self, entity: EntityRef) {
        self.0.borrow_mut().push(entity);
    }

    /// Remove every occurrence of `entity`.
    pub fn remove(&self, entity: &EntityRef) {
        self.0.borrow_mut().retain(|m| !m.same_entity(entity));
    }

    /// Replace the contents in place; existing handles see the new members.
    pub fn replace(&self, members: Vec<EntityRef>) {
        *self.0.borrow_mut() = members;
    }

    /// True when both handles share one list.
    pub fn same_list(&self, other: &LiveMembers) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LiveMembers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}
