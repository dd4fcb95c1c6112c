//! Commit durability across a close/reopen cycle, backed by the `fjall`
//! engine and a real directory on disk.

use pathdb::{Db, Value};

#[test]
fn committed_writes_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Db::open(dir.path()).unwrap();
        db.transact(|txn| {
            let root = txn.root();
            root.set("name", "ferris")?;
            root.set("xs", vec![Value::from(1), Value::from(2)])?;
            Ok(())
        })
        .unwrap();
    }

    let db = Db::open(dir.path()).unwrap();
    db.transact(|txn| {
        let root = txn.root();
        assert_eq!(root.get("name")?.as_scalar().unwrap().as_str(), Some("ferris"));
        let xs = root.get("xs")?.into_view().unwrap();
        assert_eq!(xs.length()?, 2);
        Ok(())
    })
    .unwrap();
}

#[test]
fn an_aborted_transaction_never_reaches_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Db::open(dir.path()).unwrap();
        let txn = db.begin().unwrap();
        txn.root().set("x", 7).unwrap();
        txn.abort();
    }

    let db = Db::open(dir.path()).unwrap();
    let txn = db.begin().unwrap();
    assert!(txn.root().get("x").unwrap_err().is_missing_key());
}
