use bandsheet::prelude::*;
use pretty_assertions::assert_eq;

fn sample() -> Document {
    let mut document = Document::new();
    let t = document.add_table("Data");
    document.table_mut(t).unwrap().set_value(1, 1, "first").unwrap();
    document
}

#[test]
fn test_opening_twice_shares_one_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.ods");
    sample().save(&path).unwrap();

    let mut session = Session::new();
    let a = session.open(&path).unwrap();
    let b = session.open(dir.path().join(".").join("book.ods")).unwrap();
    assert_eq!(a, b);
    assert_eq!(session.len(), 1);
    assert_eq!(session.find(&path), Some(a));

    session
        .get_mut(a)
        .unwrap()
        .table_mut(0)
        .unwrap()
        .set_value(1, 1, "edited")
        .unwrap();
    assert_eq!(
        session.get(b).unwrap().table(0).unwrap().value(1, 1).unwrap(),
        CellValue::text("edited")
    );
}

#[test]
fn test_save_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xml");
    sample().save(&path).unwrap();

    let mut session = Session::new();
    let handle = session.open(&path).unwrap();
    session
        .get_mut(handle)
        .unwrap()
        .table_mut(0)
        .unwrap()
        .set_value(2, 1, 3.0)
        .unwrap();
    session.save(handle).unwrap();
    assert!(session.close(handle).is_some());
    assert!(session.find(&path).is_none());

    let reopened = session.open(&path).unwrap();
    assert_ne!(reopened, handle);
    let table = session.get(reopened).unwrap().table(0).unwrap();
    assert_eq!(table.value(2, 1).unwrap(), CellValue::Number(3.0));
}

#[test]
fn test_save_as_binds_the_new_path() {
    let dir = tempfile::tempdir().unwrap();
    let taken = dir.path().join("taken.ods");
    sample().save(&taken).unwrap();

    let mut session = Session::new();
    let existing = session.open(&taken).unwrap();
    let fresh = session.insert(sample());

    assert!(session.save_as(fresh, &taken).is_err());

    let target = dir.path().join("fresh.xml");
    session.save_as(fresh, &target).unwrap();
    assert_eq!(session.find(&target), Some(fresh));
    assert_eq!(session.find(&taken), Some(existing));
    assert!(session.path(fresh).unwrap().ends_with("fresh.xml"));
    session.save(fresh).unwrap();
}

#[test]
fn test_open_missing_or_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    assert!(session.open(dir.path().join("missing.ods")).is_err());

    let csv = dir.path().join("data.csv");
    std::fs::write(&csv, "a,b").unwrap();
    assert!(session.open(&csv).is_err());
    assert!(session.is_empty());
}
