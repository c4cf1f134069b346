//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty (or only whitespace).
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid scope kind value.
    #[error("invalid scope kind: {value}")]
    InvalidScopeKind { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated time entry identifier.
    ///
    /// Assigned by the entry store on insert; opaque to everything else.
    EntryId, "entry ID"
);

define_string_id!(
    /// A validated user identifier.
    UserId, "user ID"
);

define_string_id!(
    /// A validated organization identifier.
    OrganizationId, "organization ID"
);

/// The identity that owns a set of time entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Scope {
    /// Personal entries of a single user.
    User(UserId),
    /// Entries shared by the members of an organization.
    Organization(OrganizationId),
}

impl Scope {
    /// String representation of the scope kind for storage.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Organization(_) => "organization",
        }
    }

    /// The owner identifier, without the kind.
    pub fn owner_id(&self) -> &str {
        match self {
            Self::User(id) => id.as_str(),
            Self::Organization(id) => id.as_str(),
        }
    }

    /// Rebuilds a scope from its stored kind and owner id.
    pub fn from_parts(kind: &str, owner_id: &str) -> Result<Self, ValidationError> {
        match kind {
            "user" => Ok(Self::User(UserId::new(owner_id)?)),
            "organization" => Ok(Self::Organization(OrganizationId::new(owner_id)?)),
            _ => Err(ValidationError::InvalidScopeKind {
                value: kind.to_string(),
            }),
        }
    }

    /// Whether this scope is shared between several users.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Organization(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.owner_id())
    }
}

/// The signed-in user and the organization they are working in, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserId,
    pub organization: Option<OrganizationId>,
}

impl Session {
    /// A session scoped to the user's personal entries.
    #[must_use]
    pub const fn personal(user: UserId) -> Self {
        Self {
            user,
            organization: None,
        }
    }

    /// The scope entries are read from and written to.
    ///
    /// An active organization takes precedence over the personal scope.
    pub fn scope(&self) -> Scope {
        self.organization.as_ref().map_or_else(
            || Scope::User(self.user.clone()),
            |org| Scope::Organization(org.clone()),
        )
    }
}

/// A persisted interval of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: EntryId,
    pub scope: Scope,
    pub description: String,
    pub start_time: DateTime<Utc>,
    /// Absent while the interval is still open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl TimeEntry {
    /// Whether the interval is still in progress.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// The fields supplied when creating an entry. The store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub scope: Scope,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub created_by: UserId,
}

/// A partial update of an entry's editable fields.
///
/// `end_time: Some(None)` reopens an entry; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
}

impl EntryPatch {
    /// A patch that closes an entry at `end`.
    #[must_use]
    pub const fn close_at(end: DateTime<Utc>) -> Self {
        Self {
            description: None,
            start_time: None,
            end_time: Some(Some(end)),
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }

    /// Applies the patch to an entry in place.
    pub fn apply_to(&self, entry: &mut TimeEntry) {
        if let Some(description) = &self.description {
            entry.description.clone_from(description);
        }
        if let Some(start_time) = self.start_time {
            entry.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            entry.end_time = end_time;
        }
    }
}
