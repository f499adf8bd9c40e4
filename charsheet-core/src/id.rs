//! Type-safe identifiers for rule content and sheets.
//!
//! Rule content (functions, programs, value sets, ...) is keyed by the
//! human-readable names authors give it in rulebook documents, so those ids
//! wrap a `String`. Sheets are runtime objects and get a random UUID.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Define a newtype id wrapper around a `String`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Identifier of a value inside a value set.
    ValueId
);

define_id!(
    /// Identifier of a value set.
    ValueSetId
);

define_id!(
    /// Identifier of a tuple-tabulated function.
    FunctionId
);

define_id!(
    /// Identifier of a program.
    ProgramId
);

define_id!(
    /// Name a program statement binds its result to.
    BindingName
);

define_id!(
    /// Identifier of a summation.
    SummationId
);

define_id!(
    /// Identifier of a mechanic.
    MechanicId
);

define_id!(
    /// Identifier of a mechanic category.
    MechanicCategoryId
);

/// Unique identifier for a character sheet instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(Uuid);

impl SheetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SheetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
