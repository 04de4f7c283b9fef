//! Stable identifiers for formations, groups, and nodes.

use std::fmt::{self, Display};

/// Identifies a formation: a logical cluster sharing configuration and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct FormationId(i64);

/// Identifies a group within a formation: one primary and its standbys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct GroupId(i64);

/// Identifies a single node row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(i64);

macro_rules! id_newtype {
    ($ty:ident) => {
        impl $ty {
            pub fn new(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $ty {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$ty> for i64 {
            fn from(id: $ty) -> Self {
                id.0
            }
        }
    };
}

id_newtype!(FormationId);
id_newtype!(GroupId);
id_newtype!(NodeId);

impl GroupId {
    /// Sharded short-cut rules (R5, R8) only apply to groups with a
    /// positive id; group 0 is the unsharded "coordinator" group in a
    /// sharded formation.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}
