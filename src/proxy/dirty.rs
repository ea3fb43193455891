//! proxy::dirty
//!
//! Comparisons used to decide whether a staged entry differs from the model.

use crate::core::config::IdentityPolicy;
use crate::core::value::{EntityRef, Value};

/// Entity identity under `policy`.
pub(crate) fn same_entity(a: &EntityRef, b: &EntityRef, policy: IdentityPolicy) -> bool {
    match policy {
        IdentityPolicy::Underlying => a.same_entity(b),
        IdentityPolicy::Reference => a.same_handle(b),
    }
}

/// True when a staged to-one value and the model's value name the same target.
pub(crate) fn same_reference(staged: &Value, current: &Value, policy: IdentityPolicy) -> bool {
    match policy {
        IdentityPolicy::Underlying => match (staged, current) {
            (Value::Entity(_) | Value::Null, Value::Entity(_) | Value::Null) => {
                match (staged.underlying(), current.underlying()) {
                    (Some(a), Some(b)) => a.same_entity(&b),
                    (None, None) => true,
                    _ => false,
                }
            }
            _ => staged == current,
        },
        IdentityPolicy::Reference => match (staged, current) {
            (Value::Entity(a), Value::Entity(b)) => a.same_handle(b),
            (Value::Entity(_), Value::Null) | (Value::Null, Value::Entity(_)) => false,
            _ => staged == current,
        },
    }
}

/// True when two member lists have the same length and the same entity at
/// every position.
pub(crate) fn same_members(staged: &[EntityRef], current: &[EntityRef], policy: IdentityPolicy) -> bool {
    staged.len() == current.len()
        && staged
            .iter()
            .zip(current)
            .all(|(a, b)| same_entity(a, b, policy))
}
