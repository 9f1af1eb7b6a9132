//! Core type definitions.

use crate::error::CoreError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Location of a row: `<pageCode>.<rowCode>`.
///
/// An address is stable for the lifetime of its row and is the only form in
/// which rows refer to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    page: String,
    row: String,
}

impl Address {
    /// Creates an address from its page and row codes.
    pub fn new(page: impl Into<String>, row: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            row: row.into(),
        }
    }

    /// Returns the page code.
    #[must_use]
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Returns the row code.
    #[must_use]
    pub fn row(&self) -> &str {
        &self.row
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.page, self.row)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((page, row)) if !page.is_empty() && !row.is_empty() && !row.contains('.') => {
                Ok(Self::new(page, row))
            }
            _ => Err(CoreError::InvalidAddress {
                address: s.to_string(),
            }),
        }
    }
}

/// Summary of one page of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Page code.
    pub code: String,
    /// Whether the page no longer takes new rows.
    pub full: bool,
    /// Number of stored rows.
    pub rows: usize,
    /// Stored size in bytes.
    pub size: u64,
}

/// Which reference properties a read resolves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Include {
    /// Resolve nothing; references stay unset.
    #[default]
    Lazy,
    /// Resolve every reference, recursively.
    All,
    /// Resolve only the named properties.
    Properties(BTreeSet<String>),
}

impl Include {
    /// Parses an include specifier: `""` is lazy, `"*"` is everything,
    /// anything else is a comma separated list of property names.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec.is_empty() {
            Self::Lazy
        } else if spec == "*" {
            Self::All
        } else {
            Self::Properties(
                spec.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )
        }
    }

    /// Creates an include for a list of property names.
    pub fn properties<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Properties(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if the property should be resolved.
    #[must_use]
    pub fn includes(&self, property: &str) -> bool {
        match self {
            Self::Lazy => false,
            Self::All => true,
            Self::Properties(names) => names.contains(property),
        }
    }

    /// Returns true if an object read with `self` can serve a request for
    /// `requested`.
    #[must_use]
    pub fn covers(&self, requested: &Include) -> bool {
        match (self, requested) {
            (_, Self::Lazy) | (Self::All, _) => true,
            (Self::Properties(have), Self::Properties(want)) => want.is_subset(have),
            _ => false,
        }
    }
}

impl From<&str> for Include {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

/// Restricts which properties an update writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateFilter {
    /// Write everything except these properties; they keep their stored
    /// value.
    Skip(BTreeSet<String>),
    /// Write only these properties; the rest keep their stored value.
    Only(BTreeSet<String>),
}

impl UpdateFilter {
    /// Creates a skip-list filter.
    pub fn skip<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Skip(names.into_iter().map(Into::into).collect())
    }

    /// Creates an only-list filter.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if the property is written under this filter.
    #[must_use]
    pub fn admits(&self, property: &str) -> bool {
        match self {
            Self::Skip(names) => !names.contains(property),
            Self::Only(names) => names.contains(property),
        }
    }
}
