//! Error types for pagedb core.

use pagedb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in pagedb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// File store error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Document codec error.
    #[error("codec error: {0}")]
    Codec(#[from] pagedb_codec::CodecError),

    /// A required property is missing or at its default value.
    #[error("required property {type_name}.{property} has no value")]
    RequiredProperty {
        /// Type being written.
        type_name: String,
        /// The required property.
        property: String,
    },

    /// A child's parent key already points to another parent.
    #[error("{type_name}.{property} is reserved by {existing}, cannot be claimed by {claimed}")]
    ReservedChild {
        /// Child type.
        type_name: String,
        /// The conflicting key property.
        property: String,
        /// Value already held by the child.
        existing: String,
        /// Value the new parent tried to assign.
        claimed: String,
    },

    /// A primary or unique key value is already taken by another row.
    #[error("{type_name}.{property} value {value} is already in use")]
    ReservedKey {
        /// Type being written.
        type_name: String,
        /// The key property, or the primary key properties joined by `+`.
        property: String,
        /// The duplicate value.
        value: String,
    },

    /// A generic property's concrete type cannot be determined.
    #[error("cannot resolve concrete type of {type_name}.{property}")]
    AmbiguousType {
        /// Type being read.
        type_name: String,
        /// The generic property.
        property: String,
    },

    /// A relationship lacks the metadata needed to link both sides.
    #[error("relationship {type_name}.{property} cannot be linked: {message}")]
    MissingRelationshipKey {
        /// Owning type.
        type_name: String,
        /// Relationship property.
        property: String,
        /// What is missing.
        message: String,
    },

    /// A primary or unique key is declared on a kind that cannot be a key.
    #[error("{type_name}.{property} cannot be a key property")]
    PrimaryKeyType {
        /// Declaring type.
        type_name: String,
        /// The key property.
        property: String,
    },

    /// An update by instance was requested for a type without a primary key.
    #[error("type {type_name} has no primary key")]
    MissingPrimaryKey {
        /// The keyless type.
        type_name: String,
    },

    /// A table or page file cannot be opened, created or decoded.
    #[error("cannot access {file}: {message}")]
    StorageAccess {
        /// File name within the store.
        file: String,
        /// Underlying failure.
        message: String,
    },

    /// An autonumber sequence would run past `i64::MAX`.
    #[error("autonumber {type_name}.{property} is exhausted")]
    AutonumberExhausted {
        /// Type being inserted.
        type_name: String,
        /// The autonumber property.
        property: String,
    },

    /// The type has not been registered.
    #[error("type not registered: {type_name}")]
    TypeNotRegistered {
        /// The unknown type.
        type_name: String,
    },

    /// A type descriptor is malformed.
    #[error("invalid descriptor for {type_name}: {message}")]
    InvalidDescriptor {
        /// The offending type.
        type_name: String,
        /// What is wrong.
        message: String,
    },

    /// A value does not fit the declared kind of its property.
    #[error("{type_name}.{property}: cannot convert {value:?} to {expected}")]
    ValueCoercion {
        /// Owning type.
        type_name: String,
        /// The property.
        property: String,
        /// The offending value, rendered.
        value: String,
        /// The expected kind.
        expected: String,
    },

    /// A row address is malformed.
    #[error("invalid row address: {address:?}")]
    InvalidAddress {
        /// The rejected text.
        address: String,
    },

    /// The password does not unlock the database, or none was given.
    #[error("invalid or missing password")]
    InvalidPassword,

    /// Database is already open elsewhere.
    #[error("database locked: another handle has exclusive access")]
    DatabaseLocked,

    /// Invalid database format or version.
    #[error("invalid database format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Locked { .. } => Self::DatabaseLocked,
            StorageError::InvalidPassword | StorageError::PasswordRequired => {
                Self::InvalidPassword
            }
            other => Self::Storage(other),
        }
    }
}

impl CoreError {
    /// Creates a required property error.
    pub fn required_property(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::RequiredProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Creates a reserved child error.
    pub fn reserved_child(
        type_name: impl Into<String>,
        property: impl Into<String>,
        existing: impl Into<String>,
        claimed: impl Into<String>,
    ) -> Self {
        Self::ReservedChild {
            type_name: type_name.into(),
            property: property.into(),
            existing: existing.into(),
            claimed: claimed.into(),
        }
    }

    /// Creates a reserved key error.
    pub fn reserved_key(
        type_name: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::ReservedKey {
            type_name: type_name.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    /// Creates an ambiguous type error.
    pub fn ambiguous_type(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::AmbiguousType {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Creates a missing relationship key error.
    pub fn missing_relationship_key(
        type_name: impl Into<String>,
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MissingRelationshipKey {
            type_name: type_name.into(),
            property: property.into(),
            message: message.into(),
        }
    }

    /// Creates a primary key type error.
    pub fn primary_key_type(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PrimaryKeyType {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Creates a missing primary key error.
    pub fn missing_primary_key(type_name: impl Into<String>) -> Self {
        Self::MissingPrimaryKey {
            type_name: type_name.into(),
        }
    }

    /// Creates a storage access error.
    pub fn storage_access(file: impl Into<String>, message: impl ToString) -> Self {
        Self::StorageAccess {
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// Creates an autonumber exhausted error.
    pub fn autonumber_exhausted(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::AutonumberExhausted {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Creates a type not registered error.
    pub fn type_not_registered(type_name: impl Into<String>) -> Self {
        Self::TypeNotRegistered {
            type_name: type_name.into(),
        }
    }

    /// Creates an invalid descriptor error.
    pub fn invalid_descriptor(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Creates a value coercion error.
    pub fn value_coercion(
        type_name: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::ValueCoercion {
            type_name: type_name.into(),
            property: property.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_lock_maps_to_database_locked() {
        let err: CoreError = StorageError::Locked { path: "db".into() }.into();
        assert!(matches!(err, CoreError::DatabaseLocked));
    }

    #[test]
    fn password_errors_collapse() {
        let err: CoreError = StorageError::PasswordRequired.into();
        assert!(matches!(err, CoreError::InvalidPassword));
        let err: CoreError = StorageError::InvalidPassword.into();
        assert!(matches!(err, CoreError::InvalidPassword));
    }

    #[test]
    fn reserved_child_message() {
        let err = CoreError::reserved_child("Book", "AuthorId", "1", "2");
        assert_eq!(
            err.to_string(),
            "Book.AuthorId is reserved by 1, cannot be claimed by 2"
        );
    }
}
