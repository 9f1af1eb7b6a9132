//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases, the
//! sample schemas the integration suites share, and test logging.

use pagedb_core::{Config, Database};
use pagedb_storage::InMemoryStore;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The in-memory store, kept to inspect write counts.
    store: Option<Arc<InMemoryStore>>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates a new in-memory test database with a custom configuration.
    pub fn memory_with(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let db = Database::open_with_store(store.clone(), config)
            .expect("Failed to open in-memory database");
        Self {
            db,
            store: Some(store),
            _temp_dir: None,
        }
    }

    /// Creates a new directory-backed test database.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(temp_dir.path()).expect("Failed to open file database");
        Self {
            db,
            store: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Number of file writes so far. Always 0 for file-based databases.
    pub fn write_count(&self) -> u64 {
        self.store.as_ref().map_or(0, |s| s.write_count())
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use pagedb_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     assert!(db.registered_types().is_empty());
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary directory-backed database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, path)
}

/// Installs a `tracing` subscriber for test output, filtered by
/// `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Sample schemas.
pub mod schemas {
    use pagedb_core::{Database, PropertyDescriptor, PropertyKind, TypeDescriptor};

    /// `Person`: autonumbered key, a few values, a read-only attribute code
    /// and a keyless `Home` stored as a complex row.
    pub fn person() -> TypeDescriptor {
        TypeDescriptor::new("Person")
            .with(PropertyDescriptor::int("Id").primary_key().autonumber(1, 1))
            .with(PropertyDescriptor::string("Name"))
            .with(PropertyDescriptor::int("Age"))
            .with(PropertyDescriptor::string("Code").as_attribute().read_only())
            .with(PropertyDescriptor::reference("Home", "Place"))
    }

    /// `Place`: no primary key.
    pub fn place() -> TypeDescriptor {
        TypeDescriptor::new("Place")
            .with(PropertyDescriptor::string("Street"))
            .with(PropertyDescriptor::string("City"))
    }

    /// `Author`: owns `Books` as children.
    pub fn author(cascade: bool) -> TypeDescriptor {
        let books = PropertyDescriptor::collection_of("Books", "Book").children();
        let books = if cascade { books.cascade_delete() } else { books };
        TypeDescriptor::new("Author")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::string("Name"))
            .with(books)
    }

    /// `Book`: child of `Author` through `AuthorId`.
    pub fn book() -> TypeDescriptor {
        TypeDescriptor::new("Book")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::int("AuthorId"))
            .with(PropertyDescriptor::string("Title"))
            .with(PropertyDescriptor::reference("Author", "Author").parent([("AuthorId", "Id")]))
    }

    /// `Sample`: one property of every single-value kind.
    pub fn sample() -> TypeDescriptor {
        TypeDescriptor::new("Sample")
            .with(PropertyDescriptor::int("Id").primary_key())
            .with(PropertyDescriptor::string("Name"))
            .with(PropertyDescriptor::int("Count").as_attribute())
            .with(PropertyDescriptor::float("Ratio"))
            .with(PropertyDescriptor::bool("Flag"))
            .with(PropertyDescriptor::new(
                "Color",
                PropertyKind::Enum(vec!["Red".into(), "Green".into(), "Blue".into()]),
            ))
            .with(PropertyDescriptor::new("At", PropertyKind::DateTime))
            .with(PropertyDescriptor::new("Key", PropertyKind::Uuid))
            .with(PropertyDescriptor::int("Score").nullable())
    }

    /// Registers `Person` and `Place`.
    pub fn register_people(db: &Database) {
        db.register_type(place()).expect("Failed to register Place");
        db.register_type(person()).expect("Failed to register Person");
    }

    /// Registers `Author` and `Book`.
    pub fn register_library(db: &Database, cascade: bool) {
        db.register_type(author(cascade))
            .expect("Failed to register Author");
        db.register_type(book()).expect("Failed to register Book");
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use pagedb_core::{Database, Object, Value};

    /// A book object without owner keys.
    pub fn book(id: i64, title: &str) -> Object {
        Object::new("Book").with("Id", id).with("Title", title)
    }

    /// Inserts an author together with its books and returns the stored
    /// author object.
    pub fn author_with_books(db: &Database, id: i64, books: &[(i64, &str)]) -> Object {
        let books: Vec<Value> = books
            .iter()
            .map(|(book_id, title)| Value::from(book(*book_id, title)))
            .collect();
        let mut author = Object::new("Author")
            .with("Id", id)
            .with("Name", format!("Author {id}"))
            .with("Books", books);
        db.insert(&mut author).expect("Failed to insert author");
        author
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagedb_core::Include;

    #[test]
    fn memory_database_counts_writes() {
        let test_db = TestDatabase::memory();
        let before = test_db.write_count();
        schemas::register_people(&test_db);
        assert_eq!(test_db.write_count(), before);

        let mut ann = pagedb_core::Object::new("Person").with("Name", "Ann");
        test_db.insert(&mut ann).unwrap();
        assert!(test_db.write_count() > before);
    }

    #[test]
    fn file_database_has_a_path() {
        with_file_db(|db, path| {
            assert_eq!(db.path(), Some(path));
        });
    }

    #[test]
    fn library_scenario() {
        with_temp_db(|db| {
            schemas::register_library(db, false);
            scenarios::author_with_books(db, 1, &[(10, "Dune"), (11, "Emma")]);
            assert_eq!(db.select("Book", false, &Include::Lazy).unwrap().len(), 2);
        });
    }
}
