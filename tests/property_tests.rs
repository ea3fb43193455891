//! Property-based tests for the change proxy.
//!
//! These tests use proptest to verify staging invariants hold across
//! randomly generated edits.

use proptest::prelude::*;

use simple_changeset::core::value::{EntityRef, Value};
use simple_changeset::model::record::Record;
use simple_changeset::model::{Model, Properties};
use simple_changeset::proxy::ChangeProxy;

const KEYS: [&str; 3] = ["firstName", "lastName", "notes"];

fn person() -> Record {
    Record::new()
        .with_attribute("firstName", None)
        .with_attribute("lastName", None)
        .with_attribute("notes", None)
        .with_has_many("followers", None)
        .with_value("firstName", "Jonathan")
        .with_value("lastName", "Palmer")
}

/// Strategy for an untyped attribute key.
fn key() -> impl Strategy<Value = &'static str> {
    prop::sample::select(KEYS.to_vec())
}

/// Strategy for an attribute value.
fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i32..1000).prop_map(Value::from),
        "[a-zA-Z ]{0,12}".prop_map(Value::from),
    ]
}

fn edits() -> impl Strategy<Value = Vec<(&'static str, Value)>> {
    prop::collection::vec((key(), value()), 1..8)
}

/// An edit against a staged to-many collection.
#[derive(Debug, Clone)]
enum MemberOp {
    Push(usize),
    Remove(usize),
}

fn member_ops() -> impl Strategy<Value = Vec<MemberOp>> {
    prop::collection::vec(
        prop_oneof![
            (0usize..5).prop_map(MemberOp::Push),
            (0usize..5).prop_map(MemberOp::Remove),
        ],
        1..10,
    )
}

proptest! {
    /// Staged writes never reach the model before apply.
    #[test]
    fn staging_leaves_model_untouched(edits in edits()) {
        let mut model = person();
        let before: Vec<Value> = KEYS.iter().map(|k| model.get(k)).collect();
        let mut proxy = ChangeProxy::new(&mut model);

        for (k, v) in edits {
            proxy.set(k, v);
        }

        let after: Vec<Value> = KEYS.iter().map(|k| proxy.model().get(k)).collect();
        prop_assert_eq!(before, after);
    }

    /// A read right after a write returns the written value.
    #[test]
    fn read_returns_last_write(k in key(), v in value()) {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set(k, v.clone());

        prop_assert_eq!(proxy.get(k), v);
    }

    /// Apply makes the model match every staged key and clears dirtiness.
    #[test]
    fn apply_commits_every_staged_key(edits in edits()) {
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        for (k, v) in edits {
            proxy.set(k, v);
        }
        proxy.apply_changes();

        for k in KEYS {
            prop_assert_eq!(proxy.model().get(k), proxy.get(k));
        }
        prop_assert!(!proxy.is_dirty());
    }

    /// Rollback makes the proxy read model state again.
    #[test]
    fn rollback_restores_model_view(edits in edits(), ops in member_ops()) {
        let pool: Vec<EntityRef> = (0..5).map(|_| EntityRef::new(person())).collect();
        let mut model = person().with_value("followers", pool[..3].to_vec());
        let mut proxy = ChangeProxy::new(&mut model);

        for (k, v) in edits {
            proxy.set(k, v);
        }
        apply_ops(&mut proxy, &pool, &ops);
        proxy.rollback_attributes();

        for k in KEYS {
            prop_assert_eq!(proxy.get(k), proxy.model().get(k));
        }
        prop_assert_eq!(proxy.get("followers"), proxy.model().get("followers"));
        prop_assert!(!proxy.is_dirty());
    }

    /// Writing the model's own value back leaves the proxy clean.
    #[test]
    fn restoring_original_value_is_clean(k in key(), v in value()) {
        let mut model = person();
        let original = model.get(k);
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set(k, v.clone());
        prop_assert_eq!(proxy.is_dirty(), v != original);

        proxy.set(k, original);
        prop_assert!(!proxy.is_dirty());
    }

    /// Staged member edits never reach the live relationship.
    #[test]
    fn member_edits_are_sandboxed(ops in member_ops()) {
        let pool: Vec<EntityRef> = (0..5).map(|_| EntityRef::new(person())).collect();
        let mut model = person().with_value("followers", pool[..3].to_vec());
        let live = model.members("followers").unwrap();
        let mut proxy = ChangeProxy::new(&mut model);

        apply_ops(&mut proxy, &pool, &ops);
        prop_assert_eq!(Value::Entities(live.to_vec()), Value::Entities(pool[..3].to_vec()));

        // Detached after the first edit.
        let staged = proxy.get("followers");
        live.push(pool[4].clone());
        prop_assert_eq!(proxy.get("followers"), staged);
    }

    /// A single entity written to a to-many key reads back as a list of one.
    #[test]
    fn single_entity_becomes_one_member(index in 0usize..5) {
        let pool: Vec<EntityRef> = (0..5).map(|_| EntityRef::new(person())).collect();
        let mut model = person();
        let mut proxy = ChangeProxy::new(&mut model);

        proxy.set("followers", pool[index].clone());

        prop_assert_eq!(proxy.get("followers"), Value::Entities(vec![pool[index].clone()]));
    }
}

fn apply_ops(proxy: &mut ChangeProxy<'_, Record>, pool: &[EntityRef], ops: &[MemberOp]) {
    let Some(collection) = proxy.collection_mut("followers") else {
        return;
    };
    for op in ops {
        match op {
            MemberOp::Push(i) => collection.push_object(pool[*i].clone()),
            MemberOp::Remove(i) => collection.remove_object(&pool[*i]),
        }
    }
}
