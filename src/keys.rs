//! Access key conventions.
//!
//! All keys of one access list share a single string namespace; the flavour of
//! a key is carried by its prefix only:
//! - `subject:<id>`  a subject's identity
//! - `role:<name>`   a role defined on the object
//! - `parent:<id>`   what a parent object may do to this child
//! - anything else   public wildcard or caller-defined additional keys

/// Default prefix for subject identity keys
pub const SUBJECT_PREFIX: &str = "subject:";
/// Default prefix for role keys
pub const ROLE_PREFIX: &str = "role:";
/// Default prefix for parent keys
pub const PARENT_PREFIX: &str = "parent:";

/// Role tokens are substituted exactly once on read; a role's own stored
/// tokens are never expanded again.
pub const ROLE_EXPANSION_DEPTH: usize = 1;

/// Classification of a key under a given set of prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind<'a> {
    Subject(&'a str),
    Role(&'a str),
    Parent(&'a str),
    Other(&'a str),
}

/// Build a key by prefixing an identifier
#[inline]
pub fn build_key(prefix: &str, id: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + id.len());
    key.push_str(prefix);
    key.push_str(id);
    key
}

/// `subject:<id>` with the default prefix
#[inline]
pub fn subject_key(id: &str) -> String {
    build_key(SUBJECT_PREFIX, id)
}

/// `role:<name>` with the default prefix
#[inline]
pub fn role_key(name: &str) -> String {
    build_key(ROLE_PREFIX, name)
}

/// `parent:<id>` with the default prefix
#[inline]
pub fn parent_key(id: &str) -> String {
    build_key(PARENT_PREFIX, id)
}

/// Check if a token looks like a role reference
#[inline]
pub fn is_role(role_prefix: &str, token: &str) -> bool {
    token.starts_with(role_prefix)
}

/// Classify a key against the default prefixes
pub fn classify(key: &str) -> KeyKind<'_> {
    classify_with(key, SUBJECT_PREFIX, ROLE_PREFIX, PARENT_PREFIX)
}

/// Classify a key against explicit prefixes
pub fn classify_with<'a>(key: &'a str, subject: &str, role: &str, parent: &str) -> KeyKind<'a> {
    if let Some(id) = key.strip_prefix(subject) {
        KeyKind::Subject(id)
    } else if let Some(name) = key.strip_prefix(role) {
        KeyKind::Role(name)
    } else if let Some(id) = key.strip_prefix(parent) {
        KeyKind::Parent(id)
    } else {
        KeyKind::Other(key)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        assert_eq!(subject_key("42"), "subject:42");
        assert_eq!(role_key("owner"), "role:owner");
        assert_eq!(parent_key("7"), "parent:7");
    }

    #[test]
    fn test_is_role() {
        assert!(is_role(ROLE_PREFIX, "role:owner"));
        assert!(!is_role(ROLE_PREFIX, "read"));
        assert!(!is_role(ROLE_PREFIX, "subject:role:x"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("subject:alice"), KeyKind::Subject("alice"));
        assert_eq!(classify("role:editor"), KeyKind::Role("editor"));
        assert_eq!(classify("parent:p1"), KeyKind::Parent("p1"));
        assert_eq!(classify("*"), KeyKind::Other("*"));
        assert_eq!(classify("additional:team"), KeyKind::Other("additional:team"));
    }

    #[test]
    fn test_custom_prefixes() {
        assert_eq!(classify_with("u/bob", "u/", "r/", "p/"), KeyKind::Subject("bob"));
        assert_eq!(classify_with("role:x", "u/", "r/", "p/"), KeyKind::Other("role:x"));
    }

    #[test]
    fn test_special_chars() {
        // Colons inside ids are kept verbatim
        assert_eq!(classify("parent:a:b"), KeyKind::Parent("a:b"));
        assert_eq!(build_key("", "x"), "x");
    }
}
