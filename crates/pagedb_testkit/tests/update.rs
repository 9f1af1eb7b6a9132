//! Update differ behavior.

use pagedb_core::{Include, Object, UpdateFilter};
use pagedb_testkit::prelude::*;

fn ann() -> Object {
    Object::new("Person")
        .with("Name", "Ann")
        .with("Age", 30)
        .with("Code", "A-1")
        .with(
            "Home",
            Object::new("Place").with("Street", "Main").with("City", "Lund"),
        )
}

fn people() -> TestDatabase {
    let db = TestDatabase::memory();
    schemas::register_people(&db);
    db.insert(&mut ann()).unwrap();
    db
}

#[test]
fn unchanged_update_writes_nothing() {
    let db = people();
    let stored = db.first("Person", &Include::All).unwrap().unwrap();
    let before = db.write_count();

    let mut same = stored.clone();
    assert!(db.update(&stored, &mut same, None).unwrap());
    assert_eq!(db.write_count(), before);
}

#[test]
fn changed_value_is_written() {
    let db = people();
    let stored = db.first("Person", &Include::All).unwrap().unwrap();
    let before = db.write_count();

    let mut older = stored.clone().with("Age", 31);
    assert!(db.update(&stored, &mut older, None).unwrap());
    assert!(db.write_count() > before);

    let read = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert_eq!(read.value("Age").as_i64(), Some(31));
}

#[test]
fn missing_row_reports_false() {
    let db = people();
    let ghost = Object::new("Person").with("Id", 99);
    assert!(!db.update(&ghost, &mut ghost.clone(), None).unwrap());
}

#[test]
fn read_only_values_keep_their_stored_value() {
    let db = people();
    let stored = db.first("Person", &Include::Lazy).unwrap().unwrap();

    let mut changed = stored.clone().with("Code", "B-2").with("Name", "Anna");
    db.update(&stored, &mut changed, None).unwrap();

    let read = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert_eq!(read.value("Code").as_str(), Some("A-1"));
    assert_eq!(read.value("Name").as_str(), Some("Anna"));
}

#[test]
fn filters_limit_written_properties() {
    let db = people();
    let stored = db.first("Person", &Include::Lazy).unwrap().unwrap();
    let mut changed = stored.clone().with("Name", "Anna").with("Age", 40);

    db.update(&stored, &mut changed, Some(&UpdateFilter::only(["Age"])))
        .unwrap();
    let read = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert_eq!(read.value("Name").as_str(), Some("Ann"));
    assert_eq!(read.value("Age").as_i64(), Some(40));

    let mut again = read.clone().with("Name", "Anna").with("Age", 50);
    db.update(&read, &mut again, Some(&UpdateFilter::skip(["Age"])))
        .unwrap();
    let read = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert_eq!(read.value("Name").as_str(), Some("Anna"));
    assert_eq!(read.value("Age").as_i64(), Some(40));
}

#[test]
fn complex_value_is_rewritten_in_place() {
    let db = people();
    let stored = db.first("Person", &Include::All).unwrap().unwrap();

    let mut moved = stored.clone();
    moved.set(
        "Home",
        Object::new("Place").with("Street", "Side").with("City", "Lund"),
    );
    db.update(&stored, &mut moved, None).unwrap();

    let places = db.select("Place", false, &Include::Lazy).unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].value("Street").as_str(), Some("Side"));

    let read = db.first("Person", &Include::All).unwrap().unwrap();
    let home = read.value("Home").as_object().unwrap();
    assert_eq!(home.value("Street").as_str(), Some("Side"));
}

#[test]
fn unloaded_reference_is_carried_over() {
    let db = people();
    let lazy = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert!(lazy.value("Home").is_null());

    let mut renamed = lazy.clone().with("Name", "Anna");
    db.update(&lazy, &mut renamed, None).unwrap();

    let read = db.first("Person", &Include::All).unwrap().unwrap();
    assert_eq!(read.value("Name").as_str(), Some("Anna"));
    assert!(read.value("Home").as_object().is_some());
    assert_eq!(db.select("Place", false, &Include::Lazy).unwrap().len(), 1);
}

#[test]
fn update_by_key_and_insert_or_update() {
    let db = people();
    let mut by_key = Object::new("Person").with("Id", 1).with("Name", "Key");
    assert!(db.update_by_key(&mut by_key, None).unwrap());
    let read = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert_eq!(read.value("Name").as_str(), Some("Key"));

    let mut bob = Object::new("Person").with("Id", 2).with("Name", "Bob");
    let key = db.insert_or_update(&mut bob, None).unwrap().unwrap();
    assert_eq!(key.value("Id").as_i64(), Some(2));
    let mut bobby = bob.clone().with("Name", "Bobby");
    db.insert_or_update(&mut bobby, None).unwrap();

    let people = db.select("Person", false, &Include::Lazy).unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[1].value("Name").as_str(), Some("Bobby"));
}

#[test]
fn update_by_key_without_key_changes_nothing() {
    let db = people();
    db.insert(&mut Object::new("Person").with("Name", "Bob")).unwrap();
    let before = db.write_count();

    let mut keyless = Object::new("Person").with("Name", "Zed");
    assert!(!db.update_by_key(&mut keyless, None).unwrap());
    assert_eq!(db.write_count(), before);

    let people = db.select("Person", false, &Include::Lazy).unwrap();
    let rows: Vec<_> = people
        .iter()
        .map(|p| (p.value("Id").as_i64(), p.value("Name").as_str().map(String::from)))
        .collect();
    assert_eq!(
        rows,
        vec![(Some(1), Some("Ann".to_string())), (Some(2), Some("Bob".to_string()))]
    );
}
