//! Lifecycle hooks.

use pagedb_core::{Action, Include, Object};
use pagedb_testkit::prelude::*;
use std::sync::{Arc, Mutex};

#[test]
fn before_hook_cancels_each_action() {
    let db = TestDatabase::memory();
    schemas::register_people(&db);
    db.insert(&mut Object::new("Person").with("Name", "Ann")).unwrap();
    db.on_before(|event| event.cancel = true);

    assert!(db.insert(&mut Object::new("Person").with("Name", "Bob")).unwrap().is_none());
    let ann = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert!(!db.update(&ann, &mut ann.clone().with("Age", 3), None).unwrap());
    assert!(!db.delete(&ann).unwrap());
    assert!(!db.drop_type("Person").unwrap());

    let people = db.select("Person", false, &Include::Lazy).unwrap();
    assert_eq!(people, vec![ann]);
}

#[test]
fn before_hook_edits_the_item() {
    let db = TestDatabase::memory();
    schemas::register_people(&db);
    db.on_before(|event| {
        if event.action == Action::Insert {
            if let Some(item) = event.item.as_mut() {
                item.set("Age", 18);
            }
        }
    });

    let mut ann = Object::new("Person").with("Name", "Ann");
    db.insert(&mut ann).unwrap();
    assert_eq!(ann.value("Age").as_i64(), Some(18));
    let stored = db.first("Person", &Include::Lazy).unwrap().unwrap();
    assert_eq!(stored.value("Age").as_i64(), Some(18));
}

#[test]
fn after_hooks_fire_once_per_call() {
    let db = TestDatabase::memory();
    schemas::register_library(&db, true);
    let seen: Arc<Mutex<Vec<(Action, String)>>> = Arc::default();
    let log = Arc::clone(&seen);
    db.on_after(move |event| {
        log.lock().unwrap().push((event.action, event.type_name.clone()));
    });

    scenarios::author_with_books(&db, 1, &[(10, "Dune"), (11, "Emma")]);
    db.delete(&Object::new("Author").with("Id", 1)).unwrap();
    db.drop_type("Book").unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            (Action::Insert, "Author".to_string()),
            (Action::Delete, "Author".to_string()),
            (Action::Drop, "Book".to_string()),
        ]
    );
}

#[test]
fn after_hooks_skip_misses() {
    let db = TestDatabase::memory();
    schemas::register_people(&db);
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);
    db.on_after(move |_| *counter.lock().unwrap() += 1);

    let ghost = Object::new("Person").with("Id", 5);
    db.update(&ghost, &mut ghost.clone(), None).unwrap();
    db.delete(&ghost).unwrap();
    assert_eq!(*count.lock().unwrap(), 0);
}
