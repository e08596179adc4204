//! Identifier newtypes.
//!
//! Numeric ids are allocated by the store and are never reused. They encode
//! big-endian so that LMDB keys sort in allocation order.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> u64 {
                self.0
            }

            /// Big-endian key bytes for ordered storage.
            pub fn to_be_bytes(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

numeric_id!(
    /// A project owning record types, members and a credit account.
    ProjectId,
    "prj"
);
numeric_id!(
    /// A record type (schema) within a project.
    RecordTypeId,
    "rt"
);
numeric_id!(
    /// A field group within a record type.
    FieldGroupId,
    "grp"
);
numeric_id!(
    /// A documented incident record.
    RecordId,
    "rec"
);
numeric_id!(QuoteId, "q");
numeric_id!(SourceId, "src");
numeric_id!(
    /// A third-party verification (audit) request.
    RequestId,
    "vr"
);
numeric_id!(ResultId, "res");
numeric_id!(EditSuggestionId, "sug");
numeric_id!(
    /// A metered usage event.
    UsageId,
    "use"
);
numeric_id!(
    /// A credit ledger entry.
    TransactionId,
    "ctx"
);

/// An identity issued by the external identity provider.
///
/// Opaque to the core; only compared for equality.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_display_with_prefix() {
        assert_eq!(RecordId::new(42).to_string(), "rec_42");
        assert_eq!(QuoteId::new(7).to_string(), "q_7");
    }

    #[test]
    fn be_bytes_preserve_order() {
        let a = RecordId::new(1).to_be_bytes();
        let b = RecordId::new(256).to_be_bytes();
        assert!(a < b);
        assert_eq!(RecordId::from_be_bytes(b), RecordId::new(256));
    }

    #[test]
    fn user_ids_compare_by_value() {
        assert_eq!(UserId::from("alice"), UserId::new(String::from("alice")));
        assert_ne!(UserId::from("alice"), UserId::from("bob"));
    }
}
