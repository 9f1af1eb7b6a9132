//! Typed collection implementation.

use crate::collection::codec::Record;
use crate::database::Database;
use crate::error::CoreResult;
use crate::types::{Include, UpdateFilter};
use std::marker::PhantomData;

/// A typed view over the table of `T`.
///
/// Records are converted to [`Object`](crate::Object)s on the way in and
/// back on the way out; relationship handling is the same as for untyped
/// calls on the [`Database`].
///
/// # Example
///
/// ```rust,ignore
/// let cities = db.collection::<City>()?;
///
/// let mut lima = City { id: 0, name: "Lima".into() };
/// cities.insert(&mut lima)?;          // id filled in by autonumber
///
/// let big: Vec<City> = cities.query(|c| c.name.len() > 3)?;
/// ```
pub struct Collection<'db, T: Record> {
    db: &'db Database,
    include: Include,
    _marker: PhantomData<T>,
}

impl<'db, T: Record> Collection<'db, T> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            include: Include::All,
            _marker: PhantomData,
        }
    }

    /// Sets which references reads resolve. Defaults to all.
    #[must_use]
    pub fn with_include(mut self, include: Include) -> Self {
        self.include = include;
        self
    }

    /// Returns the stored type name.
    pub fn type_name(&self) -> &'static str {
        T::type_name()
    }

    /// Stores a record. Autonumbered fields are written back into
    /// `record`. Returns false if a hook cancelled the insert.
    pub fn insert(&self, record: &mut T) -> CoreResult<bool> {
        let mut object = record.to_object();
        let stored = self.db.insert(&mut object)?.is_some();
        if stored {
            *record = T::from_object(&object)?;
        }
        Ok(stored)
    }

    /// Updates the record with the same primary key, or inserts it.
    pub fn insert_or_update(&self, record: &mut T) -> CoreResult<bool> {
        let mut object = record.to_object();
        let stored = self.db.insert_or_update(&mut object, None)?.is_some();
        if stored {
            *record = T::from_object(&object)?;
        }
        Ok(stored)
    }

    /// Rewrites the row stored for `old` with `new`, optionally limited
    /// by `filter`. Returns false if no row matches `old`.
    pub fn update(&self, old: &T, new: &T, filter: Option<&UpdateFilter>) -> CoreResult<bool> {
        let mut object = new.to_object();
        self.db.update(&old.to_object(), &mut object, filter)
    }

    /// Deletes the rows matching `record` and what they own.
    pub fn delete(&self, record: &T) -> CoreResult<bool> {
        self.db.delete(&record.to_object())
    }

    /// Reads every record in storage order.
    ///
    /// **Warning**: This is a full table scan.
    pub fn all(&self) -> CoreResult<Vec<T>> {
        self.db
            .select(T::type_name(), false, &self.include)?
            .iter()
            .map(T::from_object)
            .collect()
    }

    /// Reads the records accepted by `predicate`.
    pub fn query(&self, mut predicate: impl FnMut(&T) -> bool) -> CoreResult<Vec<T>> {
        Ok(self.all()?.into_iter().filter(|r| predicate(r)).collect())
    }

    /// First record accepted by `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> CoreResult<Option<T>> {
        Ok(self.all()?.into_iter().find(|r| predicate(r)))
    }

    /// Records matching the fields of `example` that differ from their
    /// defaults.
    pub fn by_example(&self, example: &T) -> CoreResult<Vec<T>> {
        self.db
            .query_by_example(&example.to_object(), &self.include)?
            .iter()
            .map(T::from_object)
            .collect()
    }
}

impl<T: Record> std::fmt::Debug for Collection<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("type_name", &T::type_name())
            .field("include", &self.include)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Object;
    use crate::error::CoreError;
    use crate::schema::{PropertyDescriptor, TypeDescriptor};

    #[derive(Debug, Clone, PartialEq)]
    struct Task {
        id: i64,
        title: String,
        done: bool,
    }

    impl Task {
        fn new(title: &str) -> Self {
            Task {
                id: 0,
                title: title.into(),
                done: false,
            }
        }
    }

    impl Record for Task {
        fn type_name() -> &'static str {
            "Task"
        }

        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::new("Task")
                .with(PropertyDescriptor::int("Id").primary_key().autonumber(1, 1))
                .with(PropertyDescriptor::string("Title"))
                .with(PropertyDescriptor::bool("Done"))
        }

        fn to_object(&self) -> Object {
            Object::new("Task")
                .with("Id", self.id)
                .with("Title", self.title.as_str())
                .with("Done", self.done)
        }

        fn from_object(object: &Object) -> CoreResult<Self> {
            let title = object
                .value("Title")
                .as_str()
                .ok_or_else(|| CoreError::value_coercion("Task", "Title", "null", "string"))?;
            Ok(Task {
                id: object.value("Id").as_i64().unwrap_or_default(),
                title: title.to_string(),
                done: object.value("Done").as_bool().unwrap_or_default(),
            })
        }
    }

    #[test]
    fn insert_assigns_autonumber() {
        let db = Database::open_in_memory().unwrap();
        let tasks = db.collection::<Task>().unwrap();

        let mut first = Task::new("write");
        let mut second = Task::new("review");
        assert!(tasks.insert(&mut first).unwrap());
        assert!(tasks.insert(&mut second).unwrap());

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(tasks.all().unwrap(), vec![first, second]);
    }

    #[test]
    fn query_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let tasks = db.collection::<Task>().unwrap();
        let mut write = Task::new("write");
        let mut review = Task::new("review");
        tasks.insert(&mut write).unwrap();
        tasks.insert(&mut review).unwrap();

        let mut done = write.clone();
        done.done = true;
        assert!(tasks.update(&write, &done, None).unwrap());

        let finished = tasks.query(|t| t.done).unwrap();
        assert_eq!(finished, vec![done.clone()]);
        assert_eq!(tasks.find(|t| !t.done).unwrap(), Some(review.clone()));
        assert_eq!(tasks.by_example(&Task::new("REVIEW")).unwrap(), vec![review]);

        assert!(tasks.delete(&done).unwrap());
        assert_eq!(tasks.all().unwrap().len(), 1);
    }

    #[test]
    fn insert_or_update_rewrites_existing() {
        let db = Database::open_in_memory().unwrap();
        let tasks = db.collection::<Task>().unwrap();
        let mut task = Task::new("draft");
        tasks.insert(&mut task).unwrap();

        task.title = "final".into();
        tasks.insert_or_update(&mut task).unwrap();

        let all = tasks.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "final");
    }
}
