//! Page allocation, rollover and on-disk layout.

use pagedb_core::{Config, Include, Object, PageInfo, PropertyDescriptor, TypeDescriptor};
use pagedb_testkit::prelude::*;

fn note() -> TypeDescriptor {
    TypeDescriptor::new("Note")
        .with(PropertyDescriptor::int("Id").primary_key().autonumber(1, 1))
        .with(PropertyDescriptor::string("Text"))
}

fn insert_notes(db: &TestDatabase, count: usize) {
    for i in 0..count {
        let text = format!("{i:04}-{}", "x".repeat(96));
        db.insert(&mut Object::new("Note").with("Text", text)).unwrap();
    }
}

#[test]
fn full_pages_stop_taking_rows() {
    init_tracing();
    let db = TestDatabase::memory_with(Config::default().page_size(1024));
    db.register_type(note()).unwrap();
    insert_notes(&db, 30);

    let pages = db.page_info("Note").unwrap();
    assert!(pages.len() > 1);
    let (last, earlier) = pages.split_last().unwrap();
    for page in earlier {
        assert!(page.full, "page {} should be full", page.code);
        assert!(page.size >= 1024);
    }
    assert_eq!(pages.iter().map(|p| p.rows).sum::<usize>(), 30);
    assert!(last.rows > 0);

    let full: Vec<PageInfo> = pages.iter().filter(|p| p.full).cloned().collect();
    insert_notes(&db, 10);
    let after = db.page_info("Note").unwrap();
    for page in &full {
        let now = after.iter().find(|p| p.code == page.code).unwrap();
        assert_eq!(now.rows, page.rows);
    }
    assert_eq!(db.select("Note", false, &Include::Lazy).unwrap().len(), 40);
}

#[test]
fn default_page_size_keeps_small_tables_on_one_page() {
    let db = TestDatabase::memory();
    db.register_type(note()).unwrap();
    insert_notes(&db, 30);

    let pages = db.page_info("Note").unwrap();
    assert_eq!(pages.len(), 1);
    assert!(!pages[0].full);
    assert_eq!(pages[0].code.len(), 8);
}

#[test]
fn emptied_page_is_deleted() {
    let db = TestDatabase::memory_with(Config::default().page_size(1024));
    db.register_type(note()).unwrap();
    insert_notes(&db, 30);
    let first = db.page_info("Note").unwrap()[0].clone();

    let ids: Vec<Object> = db
        .select("Note", false, &Include::Lazy)
        .unwrap()
        .into_iter()
        .take(first.rows)
        .collect();
    for note in &ids {
        db.delete(note).unwrap();
    }

    let pages = db.page_info("Note").unwrap();
    assert!(pages.iter().all(|p| p.code != first.code));
}

#[test]
fn directory_holds_marker_table_and_pages() {
    with_file_db(|db, path| {
        db.register_type(note()).unwrap();
        db.insert(&mut Object::new("Note").with("Text", "hello")).unwrap();

        assert!(path.join("pagedb.meta").is_file());
        assert!(path.join("Note.tbl").is_file());
        let page = &db.page_info("Note").unwrap()[0];
        assert!(path.join(format!("{}.pg", page.code)).is_file());
    });
}
