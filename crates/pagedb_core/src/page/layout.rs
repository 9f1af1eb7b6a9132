//! Persisted file formats.

use pagedb_codec::Node;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Database marker file.
pub(crate) const META_FILE: &str = "pagedb.meta";

/// Current format version.
pub(crate) const FORMAT_VERSION: u16 = 1;

const MAGIC: &str = "pagedb";

const CODE_LEN: usize = 8;
const CODE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Contents of [`META_FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct MetaFile {
    pub magic: String,
    pub version: u16,
}

impl MetaFile {
    pub fn current() -> Self {
        Self {
            magic: MAGIC.to_string(),
            version: FORMAT_VERSION,
        }
    }

    /// Returns a description of what is wrong, if anything.
    pub fn problem(&self) -> Option<String> {
        if self.magic != MAGIC {
            Some(format!("unexpected marker {:?}", self.magic))
        } else if self.version > FORMAT_VERSION {
            Some(format!("unsupported format version {}", self.version))
        } else {
            None
        }
    }
}

/// Page index of one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TableFile {
    pub type_name: String,
    pub pages: Vec<PageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PageEntry {
    pub code: String,
    pub full: bool,
}

/// Rows of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PageFile {
    pub type_name: String,
    pub rows: Vec<RowEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RowEntry {
    pub code: String,
    pub node: Node,
}

pub(crate) fn table_file(type_name: &str) -> String {
    format!("{type_name}.tbl")
}

pub(crate) fn page_file(code: &str) -> String {
    format!("{code}.pg")
}

/// Returns the type name of a table file name.
pub(crate) fn table_type(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(".tbl")
}

/// Generates a page or row code.
pub(crate) fn new_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| char::from(CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_short_lowercase_alphanumerics() {
        for _ in 0..100 {
            let code = new_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn file_names() {
        assert_eq!(table_file("Person"), "Person.tbl");
        assert_eq!(page_file("k3x9a0bq"), "k3x9a0bq.pg");
        assert_eq!(table_type("Person.tbl"), Some("Person"));
        assert_eq!(table_type("k3x9a0bq.pg"), None);
    }

    #[test]
    fn meta_validation() {
        assert!(MetaFile::current().problem().is_none());
        let future = MetaFile {
            magic: MAGIC.to_string(),
            version: FORMAT_VERSION + 1,
        };
        assert!(future.problem().is_some());
        let foreign = MetaFile {
            magic: "other".into(),
            version: 1,
        };
        assert!(foreign.problem().is_some());
    }
}
