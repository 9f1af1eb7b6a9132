//! Table and page files.

use super::layout::{
    new_code, page_file, table_file, table_type, MetaFile, PageEntry, PageFile, RowEntry,
    TableFile, META_FILE,
};
use crate::error::{CoreError, CoreResult};
use crate::types::{Address, PageInfo};
use pagedb_codec::{from_cbor, to_cbor, Node};
use pagedb_storage::{FileStore, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

fn access(file: &str) -> impl FnOnce(StorageError) -> CoreError + '_ {
    move |err| CoreError::storage_access(file, err)
}

/// Loads, caches and persists tables and pages.
///
/// Every mutation is written back immediately, one whole file at a time.
/// Row addresses handed out by [`allocate`](Self::allocate) stay reserved
/// until the row is stored or released, so nested writes into the same
/// table never pick the same code.
pub(crate) struct PageStore {
    files: Arc<dyn FileStore>,
    page_size: u64,
    tables: HashMap<String, TableFile>,
    pages: HashMap<String, PageFile>,
    reserved: HashSet<Address>,
    discovered: Option<BTreeSet<String>>,
}

impl PageStore {
    pub fn new(files: Arc<dyn FileStore>, page_size: u64) -> Self {
        Self {
            files,
            page_size,
            tables: HashMap::new(),
            pages: HashMap::new(),
            reserved: HashSet::new(),
            discovered: None,
        }
    }

    /// Validates or creates the marker file and discovers the tables on
    /// disk. Only the first call does any work.
    pub fn initialize(&mut self) -> CoreResult<()> {
        if self.discovered.is_some() {
            return Ok(());
        }

        match self.files.read(META_FILE).map_err(access(META_FILE))? {
            Some(bytes) => {
                let meta: MetaFile = from_cbor(&bytes)
                    .map_err(|e| CoreError::invalid_format(format!("{META_FILE}: {e}")))?;
                if let Some(problem) = meta.problem() {
                    return Err(CoreError::invalid_format(problem));
                }
            }
            None => self.write_file(META_FILE, &MetaFile::current())?,
        }

        let tables: BTreeSet<String> = self
            .files
            .list()
            .map_err(access("."))?
            .iter()
            .filter_map(|name| table_type(name))
            .map(String::from)
            .collect();
        debug!(tables = tables.len(), "database initialized");
        self.discovered = Some(tables);
        Ok(())
    }

    /// Types that have a table on disk.
    pub fn stored_types(&self) -> Vec<String> {
        self.discovered
            .as_ref()
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn read_file<T: DeserializeOwned>(&self, name: &str) -> CoreResult<Option<T>> {
        let Some(bytes) = self.files.read(name).map_err(access(name))? else {
            return Ok(None);
        };
        from_cbor(&bytes)
            .map(Some)
            .map_err(|e| CoreError::storage_access(name, e))
    }

    fn write_file<T: Serialize>(&self, name: &str, value: &T) -> CoreResult<()> {
        let bytes = to_cbor(value).map_err(|e| CoreError::storage_access(name, e))?;
        self.files.write(name, &bytes).map_err(access(name))
    }

    fn table(&mut self, type_name: &str) -> CoreResult<Option<&mut TableFile>> {
        if !self.tables.contains_key(type_name) {
            match self.read_file::<TableFile>(&table_file(type_name))? {
                Some(table) => {
                    self.tables.insert(type_name.to_string(), table);
                }
                None => return Ok(None),
            }
        }
        Ok(self.tables.get_mut(type_name))
    }

    fn page(&mut self, code: &str) -> CoreResult<Option<&mut PageFile>> {
        if !self.pages.contains_key(code) {
            match self.read_file::<PageFile>(&page_file(code))? {
                Some(page) => {
                    self.pages.insert(code.to_string(), page);
                }
                None => return Ok(None),
            }
        }
        Ok(self.pages.get_mut(code))
    }

    /// Writes a table back, deleting the file once it lists no pages.
    fn save_table(&mut self, type_name: &str) -> CoreResult<()> {
        let Some(table) = self.tables.get(type_name) else {
            return Ok(());
        };
        let name = table_file(type_name);
        if table.pages.is_empty() {
            self.files.delete(&name).map_err(access(&name))?;
            self.tables.remove(type_name);
            if let Some(discovered) = self.discovered.as_mut() {
                discovered.remove(type_name);
            }
            debug!(type_name, "table removed");
        } else {
            self.write_file(&name, table)?;
            if let Some(discovered) = self.discovered.as_mut() {
                discovered.insert(type_name.to_string());
            }
        }
        Ok(())
    }

    fn save_page(&self, code: &str) -> CoreResult<()> {
        match self.pages.get(code) {
            Some(page) => self.write_file(&page_file(code), page),
            None => Ok(()),
        }
    }

    /// Marks the page full once its stored size reaches the threshold.
    fn check_full(&mut self, type_name: &str, code: &str) -> CoreResult<()> {
        let name = page_file(code);
        let size = self.files.size(&name).map_err(access(&name))?.unwrap_or(0);
        if size < self.page_size {
            return Ok(());
        }
        let Some(table) = self.table(type_name)? else {
            return Ok(());
        };
        let Some(entry) = table.pages.iter_mut().find(|p| p.code == code) else {
            return Ok(());
        };
        if !entry.full {
            entry.full = true;
            trace!(type_name, page = code, size, "page full");
            self.save_table(type_name)?;
        }
        Ok(())
    }

    fn new_page(&mut self, type_name: &str) -> CoreResult<String> {
        let code = loop {
            let code = new_code();
            let name = page_file(&code);
            if !self.pages.contains_key(&code) && !self.files.exists(&name).map_err(access(&name))? {
                break code;
            }
        };
        self.pages.insert(
            code.clone(),
            PageFile {
                type_name: type_name.to_string(),
                rows: Vec::new(),
            },
        );
        self.save_page(&code)?;

        if self.table(type_name)?.is_none() {
            self.tables.insert(
                type_name.to_string(),
                TableFile {
                    type_name: type_name.to_string(),
                    pages: Vec::new(),
                },
            );
        }
        if let Some(table) = self.tables.get_mut(type_name) {
            table.pages.push(PageEntry {
                code: code.clone(),
                full: false,
            });
        }
        self.save_table(type_name)?;
        trace!(type_name, page = %code, "page allocated");
        Ok(code)
    }

    fn drop_page(&mut self, type_name: &str, code: &str) -> CoreResult<()> {
        let name = page_file(code);
        self.files.delete(&name).map_err(access(&name))?;
        self.pages.remove(code);
        if let Some(table) = self.table(type_name)? {
            table.pages.retain(|p| p.code != code);
        }
        trace!(type_name, page = code, "page removed");
        self.save_table(type_name)
    }

    /// Reserves an address for a new row: the first page that is not full,
    /// or a fresh page.
    pub fn allocate(&mut self, type_name: &str) -> CoreResult<Address> {
        let open = self
            .table(type_name)?
            .and_then(|t| t.pages.iter().find(|p| !p.full).map(|p| p.code.clone()));
        let page_code = match open {
            Some(code) => {
                if self.page(&code)?.is_none() {
                    self.pages.insert(
                        code.clone(),
                        PageFile {
                            type_name: type_name.to_string(),
                            rows: Vec::new(),
                        },
                    );
                }
                code
            }
            None => self.new_page(type_name)?,
        };

        let row_code = loop {
            let code = new_code();
            let candidate = Address::new(page_code.as_str(), code.as_str());
            let stored = self
                .pages
                .get(&page_code)
                .is_some_and(|p| p.rows.iter().any(|r| r.code == code));
            if !stored && !self.reserved.contains(&candidate) {
                break code;
            }
        };

        let address = Address::new(page_code, row_code);
        self.reserved.insert(address.clone());
        Ok(address)
    }

    /// Gives back an address that was never stored.
    pub fn release(&mut self, address: &Address) -> CoreResult<()> {
        self.reserved.remove(address);
        let in_use = self.reserved.iter().any(|a| a.page() == address.page());
        let empty = match self.page(address.page())? {
            Some(page) if page.rows.is_empty() => Some(page.type_name.clone()),
            _ => None,
        };
        match empty {
            Some(type_name) if !in_use => self.drop_page(&type_name, address.page()),
            _ => Ok(()),
        }
    }

    /// Stores a row at a reserved address.
    pub fn put_row(&mut self, address: &Address, node: Node) -> CoreResult<()> {
        self.reserved.remove(address);
        let code = address.page();
        let Some(page) = self.page(code)? else {
            return Err(CoreError::storage_access(page_file(code), "page is missing"));
        };
        page.rows.push(RowEntry {
            code: address.row().to_string(),
            node,
        });
        let type_name = page.type_name.clone();
        self.save_page(code)?;
        self.check_full(&type_name, code)
    }

    /// Replaces a stored row. Returns false if the row does not exist.
    pub fn replace_row(&mut self, address: &Address, node: Node) -> CoreResult<bool> {
        let code = address.page();
        let Some(page) = self.page(code)? else {
            return Ok(false);
        };
        let Some(row) = page.rows.iter_mut().find(|r| r.code == address.row()) else {
            return Ok(false);
        };
        row.node = node;
        let type_name = page.type_name.clone();
        self.save_page(code)?;
        self.check_full(&type_name, code)?;
        Ok(true)
    }

    /// Removes a row, deleting its page when emptied and the table when it
    /// loses its last page. Returns false if the row does not exist.
    pub fn remove_row(&mut self, address: &Address) -> CoreResult<bool> {
        let code = address.page();
        let Some(page) = self.page(code)? else {
            return Ok(false);
        };
        let before = page.rows.len();
        page.rows.retain(|r| r.code != address.row());
        if page.rows.len() == before {
            return Ok(false);
        }
        let empty = page.rows.is_empty();
        let type_name = page.type_name.clone();

        let reserved = self.reserved.iter().any(|a| a.page() == code);
        if empty && !reserved {
            self.drop_page(&type_name, code)?;
        } else {
            self.save_page(code)?;
        }
        Ok(true)
    }

    /// Best-effort row lookup; storage failures read as absence.
    pub fn row(&mut self, address: &Address) -> Option<Node> {
        match self.page(address.page()) {
            Ok(Some(page)) => page
                .rows
                .iter()
                .find(|r| r.code == address.row())
                .map(|r| r.node.clone()),
            Ok(None) => None,
            Err(err) => {
                warn!(%address, error = %err, "row lookup failed");
                None
            }
        }
    }

    /// Best-effort lookup of the type stored in a page.
    pub fn page_type(&mut self, code: &str) -> Option<String> {
        match self.page(code) {
            Ok(page) => page.map(|p| p.type_name.clone()),
            Err(err) => {
                warn!(page = code, error = %err, "page lookup failed");
                None
            }
        }
    }

    /// All rows of a table in page order.
    pub fn rows(&mut self, type_name: &str) -> CoreResult<Vec<(Address, Node)>> {
        let codes: Vec<String> = match self.table(type_name)? {
            Some(table) => table.pages.iter().map(|p| p.code.clone()).collect(),
            None => return Ok(Vec::new()),
        };
        let mut rows = Vec::new();
        for code in codes {
            if let Some(page) = self.page(&code)? {
                rows.extend(
                    page.rows
                        .iter()
                        .map(|r| (Address::new(code.as_str(), r.code.as_str()), r.node.clone())),
                );
            }
        }
        Ok(rows)
    }

    /// Page summaries of a table.
    pub fn page_info(&mut self, type_name: &str) -> CoreResult<Vec<PageInfo>> {
        let entries: Vec<PageEntry> = match self.table(type_name)? {
            Some(table) => table.pages.clone(),
            None => return Ok(Vec::new()),
        };
        let mut info = Vec::with_capacity(entries.len());
        for entry in entries {
            let rows = self.page(&entry.code)?.map_or(0, |p| p.rows.len());
            let name = page_file(&entry.code);
            let size = self.files.size(&name).map_err(access(&name))?.unwrap_or(0);
            info.push(PageInfo {
                code: entry.code,
                full: entry.full,
                rows,
                size,
            });
        }
        Ok(info)
    }

    /// Deletes a table and all its pages. Returns whether it existed.
    pub fn drop_table(&mut self, type_name: &str) -> CoreResult<bool> {
        let codes: Vec<String> = match self.table(type_name)? {
            Some(table) => table.pages.iter().map(|p| p.code.clone()).collect(),
            None => return Ok(false),
        };
        for code in &codes {
            let name = page_file(code);
            self.files.delete(&name).map_err(access(&name))?;
            self.pages.remove(code);
        }
        let name = table_file(type_name);
        self.files.delete(&name).map_err(access(&name))?;
        self.tables.remove(type_name);
        if let Some(discovered) = self.discovered.as_mut() {
            discovered.remove(type_name);
        }
        debug!(type_name, pages = codes.len(), "table dropped");
        Ok(true)
    }

    /// Largest integer stored for a property across a table.
    pub fn stored_max(
        &mut self,
        type_name: &str,
        property: &str,
        as_attribute: bool,
    ) -> CoreResult<Option<i64>> {
        let max = self
            .rows(type_name)?
            .iter()
            .filter_map(|(_, node)| {
                let text = if as_attribute {
                    node.attribute(property).map(str::to_string)
                } else {
                    node.child(property).map(Node::value)
                };
                text?.trim().parse::<i64>().ok()
            })
            .max();
        Ok(max)
    }

    /// Forgets every cached table and page.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.pages.clear();
    }
}
