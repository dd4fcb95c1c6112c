//! The concrete scenarios and invariants from the store's testable
//! properties list, exercised black-box through `Db`/`Transaction`/`View`.

use pathdb::{Db, Error, Value};

fn obj(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::from_iter(pairs.into_iter().map(|(k, v)| (k.to_string(), v)))
}

#[test]
fn scenario_1_nested_object_commit_is_visible_after_commit() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        let root = txn.root();
        root.set("toplevel", 1)?;
        root.set("nested", obj([("a", Value::from(1))]))?;
        let nested = root.get("nested")?.into_view().unwrap();
        nested.set("b", 1)?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let root = txn.root();
        assert_eq!(root.length()?, 2);
        assert_eq!(root.get("toplevel")?.as_scalar().unwrap().as_f64(), Some(1.0));
        let nested = root.get("nested")?.into_view().unwrap();
        assert_eq!(nested.length()?, 2);
        assert_eq!(nested.get("a")?.as_scalar().unwrap().as_f64(), Some(1.0));
        assert_eq!(nested.get("b")?.as_scalar().unwrap().as_f64(), Some(1.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn scenario_2_abort_discards_everything_including_the_auto_vivified_root() {
    let db = Db::open_in_memory();
    let txn = db.begin().unwrap();
    txn.root().set("x", 7).unwrap();
    txn.abort();

    let txn = db.begin().unwrap();
    let err = txn.root().get("x").unwrap_err();
    assert!(err.is_missing_key());
}

#[test]
fn scenario_3_deep_overwrite_leaves_no_remnant() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        let b = obj([("c", Value::from(1)), ("d", Value::from(2))]);
        txn.root().set("a", obj([("b", b)]))?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        txn.root().set("a", obj([("e", Value::from(3))]))?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let a = txn.root().get("a")?.into_view().unwrap();
        assert_eq!(a.length()?, 1);
        assert!(!a.contains("b")?);
        assert!(a.contains("e")?);
        assert_eq!(a.get("e")?.as_scalar().unwrap().as_f64(), Some(3.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn scenario_4_array_append() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root().set("xs", Vec::<Value>::new())?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let xs = txn.root().get("xs")?.into_view().unwrap();
        xs.append(10)?;
        xs.append(20)?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let xs = txn.root().get("xs")?.into_view().unwrap();
        assert_eq!(xs.length()?, 2);
        assert_eq!(xs.get(0u64)?.as_scalar().unwrap().as_f64(), Some(10.0));
        assert_eq!(xs.get(1u64)?.as_scalar().unwrap().as_f64(), Some(20.0));
        Ok(())
    })
    .unwrap();
}

#[test]
fn scenario_5_array_insert_at_zero_rewrites_the_tail() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root().set(
            "xs",
            vec![Value::from(1), Value::from(2), Value::from(3)],
        )?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let xs = txn.root().get("xs")?.into_view().unwrap();
        xs.insert(0, 0)?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let xs = txn.root().get("xs")?.into_view().unwrap();
        assert_eq!(xs.length()?, 4);
        let values: Vec<f64> = (0..4)
            .map(|i| xs.get(i).unwrap().as_scalar().unwrap().as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0]);
        Ok(())
    })
    .unwrap();
}

#[test]
fn scenario_6_iteration_yields_each_special_character_key_exactly_once() {
    let db = Db::open_in_memory();
    let keys = ["a", "b", "a.b", "a["];
    db.transact(|txn| {
        let root = txn.root();
        for (i, k) in keys.iter().enumerate() {
            root.set(*k, i as i64)?;
        }
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let root = txn.root();
        assert_eq!(root.length()?, 4);
        let mut seen: Vec<String> = root
            .iterate()?
            .map(|entry| entry.map(|(step, _)| step.as_key().unwrap().to_string()))
            .collect::<pathdb::Result<_>>()?;
        seen.sort();
        let mut expected: Vec<String> = keys.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);
        Ok(())
    })
    .unwrap();
}

#[test]
fn array_iteration_yields_ascending_indices() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root()
            .set("xs", vec![Value::from(10), Value::from(20), Value::from(30)])?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let xs = txn.root().get("xs")?.into_view().unwrap();
        let indices: Vec<u64> = xs
            .iterate()?
            .map(|entry| entry.map(|(step, _)| step.as_index().unwrap()))
            .collect::<pathdb::Result<_>>()?;
        assert_eq!(indices, vec![0, 1, 2]);
        Ok(())
    })
    .unwrap();
}

#[test]
fn delete_removes_the_whole_subtree() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root().set("n", obj([("c", Value::from(1))]))?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        txn.root().delete("n")?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        assert!(!txn.root().contains("n")?);
        Ok(())
    })
    .unwrap();
}

#[test]
fn deleting_a_container_stales_a_previously_obtained_view_of_it() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root().set("n", obj([("c", Value::from(1))]))?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let n = txn.root().get("n")?.into_view().unwrap();
        txn.root().delete("n")?;
        let err = n.get("c").unwrap_err();
        assert!(err.is_stale_view());
        Ok(())
    })
    .unwrap();
}

#[test]
fn indexing_an_object_with_an_integer_is_a_type_mismatch() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root().set("n", obj([("c", Value::from(1))]))?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let n = txn.root().get("n")?.into_view().unwrap();
        let err = n.get(0u64).unwrap_err();
        assert!(err.is_type_mismatch());
        Ok(())
    })
    .unwrap();
}

#[test]
fn array_index_past_length_is_out_of_range_on_read_and_write() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        txn.root().set("xs", Vec::<Value>::new())?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let xs = txn.root().get("xs")?.into_view().unwrap();
        assert!(matches!(xs.get(0u64).unwrap_err(), Error::OutOfRange { .. }));
        assert!(matches!(xs.set(5u64, 1).unwrap_err(), Error::OutOfRange { .. }));
        Ok(())
    })
    .unwrap();
}

#[test]
fn non_finite_numbers_are_rejected() {
    let db = Db::open_in_memory();
    db.transact(|txn| {
        let err = txn.root().set("x", f64::NAN).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
        Ok(())
    })
    .unwrap();
}

#[test]
fn round_trip_through_to_value_matches_the_assigned_tree() {
    let db = Db::open_in_memory();
    let tree = obj([
        ("n", Value::from(1)),
        ("s", Value::from("hi")),
        ("nested", obj([("xs", Value::from(vec![Value::from(1), Value::from(2)]))])),
    ]);
    db.transact(|txn| {
        txn.root().set("doc", tree.clone())?;
        Ok(())
    })
    .unwrap();

    db.transact(|txn| {
        let doc = txn.root().get("doc")?.into_view().unwrap();
        assert_eq!(doc.to_value()?, tree);
        Ok(())
    })
    .unwrap();
}
