//! Identifier newtypes and the cohort flag.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Generates a numeric ID newtype with common trait implementations.
macro_rules! define_numeric_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Wraps a raw numeric ID.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Returns the raw numeric ID.
            #[must_use]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_numeric_id!(
    /// A caller identifier.
    ///
    /// This is the numeric part of the raw caller field, after the leading
    /// cohort marker character has been stripped.
    UserId, u64
);

define_numeric_id!(
    /// A district (cell tower region) identifier.
    LocationId, i64
);

/// Binary cohort classification of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// Caller id starts with the refugee marker.
    Refugee,
    /// Caller id starts with the non-refugee marker.
    NonRefugee,
}

impl Cohort {
    /// String representation used in rendered output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Refugee => "refugee",
            Self::NonRefugee => "non_refugee",
        }
    }

    #[must_use]
    pub const fn is_refugee(self) -> bool {
        matches!(self, Self::Refugee)
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
