//! Collection id checks, applied before any credential or network work.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Firestore caps collection ids at 1500 bytes of UTF-8.
pub const MAX_COLLECTION_ID_BYTES: usize = 1500;

static RESERVED_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^__.*__$").expect("Invalid regex pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid collection id '{id}': {reason}")]
pub struct InvalidCollectionId {
    pub id: String,
    pub reason: &'static str,
}

/// A top-level collection id accepted by the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn parse(id: &str) -> Result<Self, InvalidCollectionId> {
        let invalid = |reason| InvalidCollectionId {
            id: id.to_string(),
            reason,
        };

        if id.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if id.contains('/') {
            return Err(invalid("must not contain '/'"));
        }
        if id == "." || id == ".." {
            return Err(invalid("must not be '.' or '..'"));
        }
        if id.len() > MAX_COLLECTION_ID_BYTES {
            return Err(invalid("must be at most 1500 bytes"));
        }
        if RESERVED_ID_PATTERN.is_match(id) {
            return Err(invalid("ids matching __.*__ are reserved"));
        }
        Ok(CollectionId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ids() {
        assert_eq!(
            CollectionId::parse("outfit_rules").unwrap().as_str(),
            "outfit_rules"
        );
        assert!(CollectionId::parse("outfit_rules_v2").is_ok());
        assert!(CollectionId::parse("__partial").is_ok());
    }

    #[test]
    fn rejects_invalid_ids() {
        for id in ["", "rules/nested", ".", "..", "__rules__"] {
            assert!(CollectionId::parse(id).is_err(), "{id:?} should be rejected");
        }
    }

    #[test]
    fn length_limit_counts_bytes() {
        assert!(CollectionId::parse(&"a".repeat(1500)).is_ok());
        let err = CollectionId::parse(&"a".repeat(1501)).unwrap_err();
        assert_eq!(err.reason, "must be at most 1500 bytes");

        // 500 three-byte characters fit exactly, one more does not
        assert!(CollectionId::parse(&"옷".repeat(500)).is_ok());
        assert!(CollectionId::parse(&"옷".repeat(501)).is_err());
    }
}
