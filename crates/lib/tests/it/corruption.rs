//! Read-only-after-corruption (`spec.md` §7), driven by writing a malformed
//! record straight through the `fjall` engine adapter — the only way to get
//! a genuinely corrupt on-disk record past the view layer's own consistency
//! guarantees, which otherwise never let one arise through normal use.

use pathdb::{Db, Error, FjallEngine, KvEngine};

#[test]
fn malformed_on_disk_scalar_surfaces_as_corruption_and_flips_read_only() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = FjallEngine::open(dir.path()).unwrap();
        engine.put(b".", b"").unwrap();
        engine.put(b".\"x\"=", b"not json").unwrap();
        engine.commit().unwrap();
    }

    let db = Db::open(dir.path()).unwrap();
    {
        let txn = db.begin().unwrap();
        let err = txn.root().get("x").unwrap_err();
        assert!(err.is_corruption());
        txn.abort();
    }

    let err = db.begin().unwrap_err();
    assert!(matches!(err, Error::ReadOnlyAfterCorruption));
}
