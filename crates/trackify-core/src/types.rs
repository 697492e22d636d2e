//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and operation inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// An entry's end time preceded its start time.
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A date range was given with the bounds reversed.
    #[error("range start {start} is after range end {end}")]
    ReversedDateRange { start: NaiveDate, end: NaiveDate },

    /// Invalid leave type string.
    #[error("invalid leave type: {value}")]
    InvalidLeaveType { value: String },

    /// Invalid weekday name.
    #[error("invalid weekday name: {value}")]
    InvalidWeekday { value: String },

    /// Invalid holiday kind string.
    #[error("invalid holiday kind: {value}")]
    InvalidHolidayKind { value: String },

    /// Invalid membership role string.
    #[error("invalid role: {value}")]
    InvalidRole { value: String },

    /// Working hours must be positive.
    #[error("working hours per day must be positive, got {value}")]
    NonPositiveHours { value: f64 },

    /// A leave balance cannot be negative.
    #[error("leave balance cannot be negative, got {value}")]
    NegativeHours { value: f64 },

    /// The encashable fraction must lie in [0.0, 1.0].
    #[error("encashable fraction must be between 0.0 and 1.0, got {value}")]
    FractionOutOfRange { value: f64 },

    /// Calendar month out of range.
    #[error("invalid month: {value}")]
    InvalidMonth { value: u32 },

    /// Leave encashment was requested with no positive balance.
    #[error("no leave balance available to encash")]
    NothingToEncash,
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
                if id.is_empty() {
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
    /// A validated user identifier.
    ///
    /// User IDs must be non-empty strings. Uniqueness is enforced at the
    /// storage level.
    UserId, "user ID"
);

define_string_id!(
    /// A validated workspace identifier.
    ///
    /// Workspaces are the tenant boundary: entries, rules, holidays and
    /// reports are all scoped to exactly one workspace.
    WorkspaceId, "workspace ID"
);

define_string_id!(
    /// A validated project identifier.
    ProjectId, "project ID"
);

define_string_id!(
    /// A validated time entry identifier.
    EntryId, "entry ID"
);

/// Paid leave categories tracked per user and workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Casual,
    Sick,
    Earned,
}

impl LeaveType {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Sick => "sick",
            Self::Earned => "earned",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LeaveType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "casual" => Ok(Self::Casual),
            "sick" => Ok(Self::Sick),
            "earned" => Ok(Self::Earned),
            _ => Err(ValidationError::InvalidLeaveType {
                value: s.to_string(),
            }),
        }
    }
}

/// Holiday classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayKind {
    /// Mandatory public holiday, always non-working.
    Gazetted,
    /// Optional holiday; still non-working whenever active and applicable.
    Restricted,
}

impl HolidayKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gazetted => "gazetted",
            Self::Restricted => "restricted",
        }
    }
}

impl fmt::Display for HolidayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HolidayKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gazetted" => Ok(Self::Gazetted),
            "restricted" => Ok(Self::Restricted),
            _ => Err(ValidationError::InvalidHolidayKind {
                value: s.to_string(),
            }),
        }
    }
}

/// Workspace membership role.
///
/// The engine performs no authorization itself; roles are carried for the
/// calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            _ => Err(ValidationError::InvalidRole {
                value: s.to_string(),
            }),
        }
    }
}
