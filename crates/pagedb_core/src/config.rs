//! Database configuration.

/// Default page fullness threshold (512 KiB).
pub const DEFAULT_PAGE_SIZE: u64 = 512 * 1024;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Stored page size at which a page is marked full.
    pub page_size: u64,

    /// Leave references unresolved even when `"*"` is requested.
    pub lazy_load: bool,

    /// Never resolve parent references while reading.
    pub lazy_load_parent: bool,

    /// Password for an encrypted database.
    pub password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            page_size: DEFAULT_PAGE_SIZE,
            lazy_load: false,
            lazy_load_parent: true,
            password: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the page fullness threshold in bytes.
    #[must_use]
    pub const fn page_size(mut self, size: u64) -> Self {
        self.page_size = size;
        self
    }

    /// Sets whether eager reads still leave references unresolved.
    #[must_use]
    pub const fn lazy_load(mut self, value: bool) -> Self {
        self.lazy_load = value;
        self
    }

    /// Sets whether parent references are skipped while reading.
    #[must_use]
    pub const fn lazy_load_parent(mut self, value: bool) -> Self {
        self.lazy_load_parent = value;
        self
    }

    /// Sets the password of an encrypted database.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}
