//! Database facade.

use crate::autonumber::AutonumberService;
use crate::collection::{Collection, Record};
use crate::config::Config;
use crate::engine::Engine;
use crate::entity::Object;
use crate::error::CoreResult;
use crate::hooks::HookEvent;
use crate::schema::TypeDescriptor;
use crate::types::{Include, PageInfo, UpdateFilter};
use pagedb_storage::{DirStore, FileStore, InMemoryStore, SecureStore};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The main database handle.
///
/// `Database` is the entry point of pagedb. It provides:
/// - Type registration
/// - Object inserts, updates and deletes, with related objects
/// - Predicate and example queries
/// - Lifecycle hooks
/// - Encryption at rest
///
/// All operations take `&self`; a handle can be shared between threads.
/// Calls are serialized on one internal lock, so hooks must not call back
/// into the database that runs them.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use pagedb_core::Database;
/// use std::path::Path;
///
/// let db = Database::open(Path::new("my_database"))?;
/// # Ok::<(), pagedb_core::CoreError>(())
/// ```
///
/// # In-Memory Databases
///
/// ```rust
/// use pagedb_core::{Database, Include, Object, PropertyDescriptor, TypeDescriptor};
///
/// let db = Database::open_in_memory()?;
/// db.register_type(
///     TypeDescriptor::new("Person")
///         .with(PropertyDescriptor::int("Id").primary_key().autonumber(1, 1))
///         .with(PropertyDescriptor::string("Name")),
/// )?;
///
/// let key = db.insert(&mut Object::new("Person").with("Name", "Ann"))?;
/// assert_eq!(key, Some(Object::new("Person").with("Id", 1)));
///
/// let found = db.query_by_example(&Object::new("Person").with("Name", "ann"), &Include::Lazy)?;
/// assert_eq!(found.len(), 1);
/// # Ok::<(), pagedb_core::CoreError>(())
/// ```
pub struct Database {
    engine: Mutex<Engine>,
    security: Arc<SecureStore<Arc<dyn FileStore>>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Opens a database directory with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseLocked` if another handle has the directory open,
    /// `InvalidPassword` for an encrypted database, and `InvalidFormat` if
    /// the directory holds something other than a pagedb database.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database directory.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open). Also fails if the directory is missing and
    /// `create_if_missing` is off.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let store = DirStore::open(path, config.create_if_missing)?;
        let mut db = Self::open_with_store(Arc::new(store), config)?;
        db.path = Some(path.to_path_buf());
        Ok(db)
    }

    /// Opens an empty in-memory database.
    ///
    /// # Errors
    ///
    /// Fails only if the database marker cannot be written.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_store(Arc::new(InMemoryStore::new()), Config::default())
    }

    /// Opens a database on any file store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPassword` if the store is encrypted and
    /// `config.password` is missing or wrong, and `InvalidFormat` for a
    /// foreign or newer marker file.
    pub fn open_with_store(store: Arc<dyn FileStore>, config: Config) -> CoreResult<Self> {
        let security = Arc::new(SecureStore::open(store, config.password.as_deref())?);
        let files: Arc<dyn FileStore> = security.clone();
        let mut engine = Engine::new(files, config);
        engine.pages.initialize()?;
        Ok(Self {
            engine: Mutex::new(engine),
            security,
            path: None,
        })
    }

    /// Returns the database directory; `None` for other stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Registers a type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` or `PrimaryKeyType` for a malformed
    /// descriptor.
    pub fn register_type(&self, desc: TypeDescriptor) -> CoreResult<()> {
        self.engine.lock().schema.register(desc).map(|_| ())
    }

    /// Names of the registered types, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<String> {
        self.engine.lock().schema.names()
    }

    /// Names of the types that have a table in storage, as found when the
    /// database was opened.
    #[must_use]
    pub fn stored_types(&self) -> Vec<String> {
        self.engine.lock().pages.stored_types()
    }

    /// Replaces the service that fills autonumber properties.
    pub fn set_autonumber(&self, service: impl AutonumberService + 'static) {
        self.engine.lock().autonumber = Box::new(service);
    }

    /// Stores an object and the objects it refers to.
    ///
    /// Autonumber properties of `item` are filled in. Returns the primary
    /// key values of the stored row, or `None` if a hook cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RequiredProperty` for a missing required value,
    /// `ReservedKey` for a duplicate primary or unique key and
    /// `ReservedChild` for a child owned by another parent.
    pub fn insert(&self, item: &mut Object) -> CoreResult<Option<Object>> {
        self.engine.lock().insert(item, false)
    }

    /// Stores an object without its reference collections. Parent
    /// references are still linked.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn insert_lazy(&self, item: &mut Object) -> CoreResult<Option<Object>> {
        self.engine.lock().insert(item, true)
    }

    /// Updates the row with the same primary key, or inserts `item` when
    /// there is none.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert) and [`update`](Self::update).
    pub fn insert_or_update(
        &self,
        item: &mut Object,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<Option<Object>> {
        self.engine.lock().insert_or_update(item, false, filter)
    }

    /// Rewrites the rows stored for `old` with `new`.
    ///
    /// Returns true if a row was found for `old`, whether or not anything
    /// had to be written.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    pub fn update(
        &self,
        old: &Object,
        new: &mut Object,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<bool> {
        self.engine.lock().update(old, new, filter)
    }

    /// Rewrites the row with the same primary key as `item`.
    ///
    /// Returns false without touching storage when a primary key value of
    /// `item` is unset.
    ///
    /// # Errors
    ///
    /// Returns `MissingPrimaryKey` if the type has no primary key.
    pub fn update_by_key(&self, item: &mut Object, filter: Option<&UpdateFilter>) -> CoreResult<bool> {
        self.engine.lock().update_by_key(item, filter)
    }

    /// Deletes the rows matching `item` with everything they own. Returns
    /// true if a row was removed.
    ///
    /// # Errors
    ///
    /// Fails on storage errors; rows deleted before the failure stay
    /// deleted.
    pub fn delete(&self, item: &Object) -> CoreResult<bool> {
        self.engine.lock().delete(item)
    }

    /// Removes a type's table. Returns true if it existed.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered` for an unknown type.
    pub fn drop_type(&self, type_name: &str) -> CoreResult<bool> {
        self.engine.lock().drop_type(type_name)
    }

    /// Reads every row of a type, in storage order or reversed.
    ///
    /// # Errors
    ///
    /// Returns `TypeNotRegistered`, `ValueCoercion` for unreadable stored
    /// values and `AmbiguousType` for unresolvable generic references.
    pub fn select(&self, type_name: &str, backward: bool, include: &Include) -> CoreResult<Vec<Object>> {
        self.engine.lock().select(type_name, backward, include)
    }

    /// Reads the rows of a type accepted by `predicate`.
    ///
    /// Rows are read first and filtered after the internal lock is
    /// released, so the predicate may query this database.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn query(
        &self,
        type_name: &str,
        include: &Include,
        mut predicate: impl FnMut(&Object) -> bool,
    ) -> CoreResult<Vec<Object>> {
        let mut objects = self.select(type_name, false, include)?;
        objects.retain(|object| predicate(object));
        Ok(objects)
    }

    /// Reads the rows matching a partially filled example. Properties left
    /// at their default value are not compared; text compares
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn query_by_example(&self, example: &Object, include: &Include) -> CoreResult<Vec<Object>> {
        self.query_by_examples(example.type_name(), std::slice::from_ref(example), include)
    }

    /// Reads the rows matching any of the examples.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn query_by_examples(
        &self,
        type_name: &str,
        examples: &[Object],
        include: &Include,
    ) -> CoreResult<Vec<Object>> {
        self.engine
            .lock()
            .query_by_examples(type_name, examples, include)
    }

    /// First object accepted by `predicate`. Like [`query`](Self::query),
    /// the predicate runs outside the internal lock.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn find(
        &self,
        type_name: &str,
        include: &Include,
        mut predicate: impl FnMut(&Object) -> bool,
    ) -> CoreResult<Option<Object>> {
        let objects = self.select(type_name, false, include)?;
        Ok(objects.into_iter().find(|object| predicate(object)))
    }

    /// Last object accepted by `predicate`.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn find_last(
        &self,
        type_name: &str,
        include: &Include,
        mut predicate: impl FnMut(&Object) -> bool,
    ) -> CoreResult<Option<Object>> {
        let objects = self.select(type_name, true, include)?;
        Ok(objects.into_iter().find(|object| predicate(object)))
    }

    /// First stored object of a type.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn first(&self, type_name: &str, include: &Include) -> CoreResult<Option<Object>> {
        self.engine
            .lock()
            .scan_first(type_name, false, include, |_| true)
    }

    /// Last stored object of a type.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn last(&self, type_name: &str, include: &Include) -> CoreResult<Option<Object>> {
        self.engine
            .lock()
            .scan_first(type_name, true, include, |_| true)
    }

    /// Page statistics of a type's table.
    ///
    /// # Errors
    ///
    /// Fails if the table cannot be read.
    pub fn page_info(&self, type_name: &str) -> CoreResult<Vec<PageInfo>> {
        self.engine.lock().pages.page_info(type_name)
    }

    /// Forgets every materialized object.
    pub fn clear_cache(&self) {
        self.engine.lock().cache.clear();
    }

    /// Forgets materialized objects and loaded tables and pages, so the
    /// next access rereads storage.
    pub fn clear_caches(&self) {
        self.engine.lock().clear_caches();
    }

    /// Adds a hook run before every insert, update, delete and drop.
    ///
    /// Hooks run while the database is locked; a hook that calls back into
    /// the same database deadlocks.
    pub fn on_before(&self, hook: impl Fn(&mut HookEvent) + Send + Sync + 'static) {
        self.engine.lock().hooks.on_before(hook);
    }

    /// Adds a hook run after every successful insert, update, delete and
    /// drop. The same locking rule as [`on_before`](Self::on_before)
    /// applies.
    pub fn on_after(&self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) {
        self.engine.lock().hooks.on_after(hook);
    }

    /// Returns true if the database is encrypted at rest.
    #[must_use]
    pub fn is_secured(&self) -> bool {
        self.security.is_secured()
    }

    /// Encrypts every file of the database under `password`.
    ///
    /// # Errors
    ///
    /// Fails if the database is already secured.
    pub fn secure(&self, password: &str) -> CoreResult<()> {
        let _engine = self.engine.lock();
        Ok(self.security.secure(password)?)
    }

    /// Decrypts every file and drops the password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPassword` if `password` is wrong.
    pub fn loose(&self, password: &str) -> CoreResult<()> {
        let _engine = self.engine.lock();
        Ok(self.security.loose(password)?)
    }

    /// Re-encrypts every file under a new password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPassword` if `old` is wrong.
    pub fn change_password(&self, old: &str, new: &str) -> CoreResult<()> {
        let _engine = self.engine.lock();
        Ok(self.security.change_password(old, new)?)
    }

    /// Returns a typed view over the table of `T`, registering `T` first
    /// if needed.
    ///
    /// # Errors
    ///
    /// Fails if `T`'s descriptor is rejected.
    pub fn collection<T: Record>(&self) -> CoreResult<Collection<'_, T>> {
        {
            let mut engine = self.engine.lock();
            if !engine.schema.contains(T::type_name()) {
                engine.schema.register(T::descriptor())?;
            }
        }
        Ok(Collection::new(self))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("secured", &self.is_secured())
            .finish_non_exhaustive()
    }
}
