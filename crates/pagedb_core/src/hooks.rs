//! Lifecycle hooks around public write operations.
//!
//! Before-hooks run ahead of an insert, update, delete or drop and may
//! cancel it or adjust the item about to be written. After-hooks observe
//! the finished operation.
//!
//! # Usage
//!
//! ```rust
//! use pagedb_core::{Action, Database, Object, PropertyDescriptor, TypeDescriptor};
//!
//! let db = Database::open_in_memory().unwrap();
//! db.register_type(TypeDescriptor::new("Note").with(PropertyDescriptor::string("Text")))
//!     .unwrap();
//!
//! db.on_before(|event| {
//!     if event.action == Action::Insert {
//!         event.cancel = event.item.as_ref().is_some_and(|n| !n.has("Text"));
//!     }
//! });
//!
//! assert!(db.insert(&mut Object::new("Note")).unwrap().is_none());
//! ```
//!
//! Hooks fire once per public call. Rows written or deleted on the way
//! (nested inserts, cascades) do not raise events of their own.

use crate::entity::Object;

/// Kind of write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A new row is stored.
    Insert,
    /// Stored rows are rewritten.
    Update,
    /// Stored rows are removed.
    Delete,
    /// A whole table is removed.
    Drop,
}

/// An event passed to lifecycle hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct HookEvent {
    /// The operation.
    pub action: Action,
    /// Type the operation targets.
    pub type_name: String,
    /// The item being written or deleted. `None` for drops.
    ///
    /// Changes a before-hook makes to the item are written back before the
    /// operation proceeds.
    pub item: Option<Object>,
    /// Set by a before-hook to stop the operation.
    pub cancel: bool,
}

type BeforeHook = Box<dyn Fn(&mut HookEvent) + Send + Sync>;
type AfterHook = Box<dyn Fn(&HookEvent) + Send + Sync>;

/// Registered hooks.
#[derive(Default)]
pub(crate) struct Hooks {
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
}

impl Hooks {
    pub fn on_before(&mut self, hook: impl Fn(&mut HookEvent) + Send + Sync + 'static) {
        self.before.push(Box::new(hook));
    }

    pub fn on_after(&mut self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) {
        self.after.push(Box::new(hook));
    }

    /// Runs the before-hooks. Returns false if one of them cancelled.
    pub fn run_before(&self, action: Action, type_name: &str, item: Option<&mut Object>) -> bool {
        if self.before.is_empty() {
            return true;
        }
        let mut event = HookEvent {
            action,
            type_name: type_name.to_string(),
            item: item.as_deref().cloned(),
            cancel: false,
        };
        for hook in &self.before {
            hook(&mut event);
            if event.cancel {
                return false;
            }
        }
        if let (Some(target), Some(changed)) = (item, event.item) {
            *target = changed;
        }
        true
    }

    pub fn run_after(&self, action: Action, type_name: &str, item: Option<&Object>) {
        if self.after.is_empty() {
            return;
        }
        let event = HookEvent {
            action,
            type_name: type_name.to_string(),
            item: item.cloned(),
            cancel: false,
        };
        for hook in &self.after {
            hook(&event);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn no_hooks_never_cancel() {
        let hooks = Hooks::default();
        let mut item = Object::new("A");
        assert!(hooks.run_before(Action::Insert, "A", Some(&mut item)));
    }

    #[test]
    fn cancel_stops_later_hooks() {
        let mut hooks = Hooks::default();
        let calls = Arc::new(Mutex::new(0));
        hooks.on_before(|e| e.cancel = e.action == Action::Delete);
        let seen = Arc::clone(&calls);
        hooks.on_before(move |_| *seen.lock() += 1);

        assert!(!hooks.run_before(Action::Delete, "A", None));
        assert_eq!(*calls.lock(), 0);
        assert!(hooks.run_before(Action::Update, "A", None));
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn before_hook_edits_item() {
        let mut hooks = Hooks::default();
        hooks.on_before(|e| {
            if let Some(item) = e.item.as_mut() {
                item.set("Stamp", 7);
            }
        });
        let mut item = Object::new("A");
        assert!(hooks.run_before(Action::Insert, "A", Some(&mut item)));
        assert_eq!(item.value("Stamp").as_i64(), Some(7));
    }

    #[test]
    fn after_hooks_see_event() {
        let mut hooks = Hooks::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        hooks.on_after(move |e| sink.lock().push((e.action, e.type_name.clone())));

        hooks.run_after(Action::Drop, "Person", None);
        assert_eq!(*log.lock(), vec![(Action::Drop, "Person".to_string())]);
    }
}
