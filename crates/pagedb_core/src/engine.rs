//! Engine state and the public write operations.
//!
//! The engine is split across modules by concern: `codec` turns objects
//! into nodes and back, `resolver` links related rows, `query` scans
//! tables, `update` diffs rewrites. Each adds an `impl Engine` block.

use crate::autonumber::{AutonumberService, SequenceAutonumber};
use crate::cache::IdentityCache;
use crate::codec::scalar;
use crate::config::Config;
use crate::entity::Object;
use crate::error::{CoreError, CoreResult};
use crate::hooks::{Action, Hooks};
use crate::page::PageStore;
use crate::schema::{SchemaRegistry, TypeDescriptor};
use crate::types::{Include, UpdateFilter};
use pagedb_storage::FileStore;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub(crate) struct Engine {
    pub config: Config,
    pub schema: SchemaRegistry,
    pub pages: PageStore,
    pub cache: IdentityCache,
    pub autonumber: Box<dyn AutonumberService>,
    pub hooks: Hooks,
}

impl Engine {
    pub fn new(files: Arc<dyn FileStore>, config: Config) -> Self {
        let pages = PageStore::new(files, config.page_size);
        Self {
            config,
            schema: SchemaRegistry::new(),
            pages,
            cache: IdentityCache::new(),
            autonumber: Box::new(SequenceAutonumber::new()),
            hooks: Hooks::default(),
        }
    }

    /// Descriptor of the type an object is actually written as: its own
    /// type when registered, otherwise the declared one.
    pub fn concrete(&self, declared: &Arc<TypeDescriptor>, item: &Object) -> Arc<TypeDescriptor> {
        if item.type_name() != declared.name {
            if let Some(desc) = self.schema.get(item.type_name()) {
                return desc;
            }
        }
        Arc::clone(declared)
    }

    pub fn insert(&mut self, item: &mut Object, lazy: bool) -> CoreResult<Option<Object>> {
        let desc = self.schema.require(item.type_name())?;
        if !self.hooks.run_before(Action::Insert, &desc.name, Some(&mut *item)) {
            return Ok(None);
        }
        self.insert_item(&desc, item, lazy, None)?;
        self.hooks.run_after(Action::Insert, &desc.name, Some(&*item));
        Ok(Some(key_values(&desc, item)))
    }

    pub fn insert_or_update(
        &mut self,
        item: &mut Object,
        lazy: bool,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<Option<Object>> {
        let desc = self.schema.require(item.type_name())?;
        let stored = match primary_key_example(&desc, item) {
            Some(example) => self.find_first(&desc, &example)?,
            None => None,
        };
        let Some((address, node)) = stored else {
            return self.insert(item, lazy);
        };

        let old = self.read_row(&desc, &address, &node, &Include::Lazy, None, Uuid::new_v4())?;
        if self.update(&old, item, filter)? {
            Ok(Some(key_values(&desc, item)))
        } else {
            Ok(None)
        }
    }

    pub fn update(
        &mut self,
        old: &Object,
        new: &mut Object,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<bool> {
        let desc = self.schema.require(old.type_name())?;
        if !self.hooks.run_before(Action::Update, &desc.name, Some(&mut *new)) {
            return Ok(false);
        }
        let found = self.update_item(&desc, old, new, filter)?;
        if found {
            self.hooks.run_after(Action::Update, &desc.name, Some(&*new));
        }
        Ok(found)
    }

    pub fn update_by_key(
        &mut self,
        item: &mut Object,
        filter: Option<&UpdateFilter>,
    ) -> CoreResult<bool> {
        let desc = self.schema.require(item.type_name())?;
        if !desc.has_primary_key() {
            return Err(CoreError::missing_primary_key(&desc.name));
        }
        let Some(old) = primary_key_example(&desc, item) else {
            return Ok(false);
        };
        self.update(&old, item, filter)
    }

    pub fn delete(&mut self, item: &Object) -> CoreResult<bool> {
        let desc = self.schema.require(item.type_name())?;
        let mut event_item = item.clone();
        if !self
            .hooks
            .run_before(Action::Delete, &desc.name, Some(&mut event_item))
        {
            return Ok(false);
        }
        let removed = self.delete_item(&desc, item)?;
        if removed {
            self.hooks.run_after(Action::Delete, &desc.name, Some(item));
        }
        Ok(removed)
    }

    pub fn drop_type(&mut self, type_name: &str) -> CoreResult<bool> {
        let desc = self.schema.require(type_name)?;
        if !self.hooks.run_before(Action::Drop, &desc.name, None) {
            return Ok(false);
        }
        let existed = self.pages.drop_table(&desc.name)?;
        self.autonumber.clear_type(&desc.name);
        self.cache.invalidate_type(&desc.name);
        debug!(type_name = %desc.name, existed, "type dropped");
        self.hooks.run_after(Action::Drop, &desc.name, None);
        Ok(existed)
    }

    pub fn clear_caches(&mut self) {
        self.cache.clear();
        self.pages.clear();
    }
}

/// The primary key projection of an item, when every part is set.
pub(crate) fn primary_key_example(desc: &TypeDescriptor, item: &Object) -> Option<Object> {
    if !desc.has_primary_key() {
        return None;
    }
    let set = desc
        .primary_keys()
        .all(|p| !scalar::is_default(p, item.value(&p.name)));
    set.then(|| item.project(desc.primary_keys().map(|p| p.name.as_str())))
}

/// The sparse example that locates an item's stored row: its primary key
/// when set, otherwise its single values and value collections.
pub(crate) fn key_example(desc: &TypeDescriptor, item: &Object) -> Object {
    primary_key_example(desc, item)
        .unwrap_or_else(|| item.project(desc.base_properties().map(|p| p.name.as_str())))
}

/// Primary key values of an item, as returned by inserts.
pub(crate) fn key_values(desc: &TypeDescriptor, item: &Object) -> Object {
    item.project(desc.primary_keys().map(|p| p.name.as_str()))
}
