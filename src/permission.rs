//! Permission tokens and permission sets.
//!
//! A permission is an opaque string (`"read"`, `"create"`, ...). A
//! [`PermissionSet`] keeps first-insertion order so results are deterministic,
//! but compares as a set: `{a, b} == {b, a}`.

use serde::{Deserialize, Serialize};

/// Opaque permission token
pub type Permission = String;

/// Duplicate-free, insertion-ordered collection of permissions
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(Vec<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        PermissionSet(Vec::new())
    }

    /// Add a permission, returns false if it was already present
    pub fn insert(&mut self, perm: impl Into<Permission>) -> bool {
        let perm = perm.into();
        if self.contains(&perm) {
            return false;
        }
        self.0.push(perm);
        true
    }

    #[inline]
    pub fn contains(&self, perm: &str) -> bool {
        self.0.iter().any(|p| p == perm)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[Permission] {
        &self.0
    }

    /// Every permission of `self`, followed by those of `other` not yet seen
    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        let mut out = self.clone();
        out.extend(other.iter());
        out
    }

    /// Permissions of `self` that are also in `other`, in `self`'s order
    pub fn intersection(&self, other: &PermissionSet) -> PermissionSet {
        self.iter().filter(|p| other.contains(p)).collect()
    }

    /// True when every permission in `required` is present
    pub fn contains_all(&self, required: &PermissionSet) -> bool {
        required.iter().all(|p| self.contains(p))
    }

    /// True when `other` has at least one permission missing from `self`
    #[inline]
    pub fn excludes_any(&self, other: &PermissionSet) -> bool {
        !self.contains_all(other)
    }

    /// Drop empty tokens
    pub fn compact(mut self) -> PermissionSet {
        self.0.retain(|p| !p.is_empty());
        self
    }
}

/// True when `other` has at least one element not in `array`
pub fn excludes_any(array: &PermissionSet, other: &PermissionSet) -> bool {
    array.excludes_any(other)
}

impl PartialEq for PermissionSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.contains_all(other)
    }
}

impl<S: Into<Permission>> Extend<S> for PermissionSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for p in iter {
            self.insert(p);
        }
    }
}

impl<S: Into<Permission>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        set.extend(iter);
        set
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(v: Vec<Permission>) -> Self {
        v.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.0
    }
}

impl From<&[&str]> for PermissionSet {
    fn from(v: &[&str]) -> Self {
        v.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for PermissionSet {
    fn from(v: [&str; N]) -> Self {
        v.into_iter().collect()
    }
}

impl From<&str> for PermissionSet {
    fn from(p: &str) -> Self {
        std::iter::once(p).collect()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, Permission>, fn(&'a Permission) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(String::as_str as fn(&'a Permission) -> &'a str)
    }
}

impl std::fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}

// ============================================================================
// Tests
// ============================================================================
