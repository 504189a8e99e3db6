//! Per-object access list.
//!
//! Maps access keys to the permissions stored under them. Writes store tokens
//! verbatim; reads substitute role tokens with the role's current permissions,
//! so editing a role changes every key that references it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::keys::{build_key, is_role};
use crate::permission::PermissionSet;

/// Access key to stored permission set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessList {
    entries: BTreeMap<String, PermissionSet>,
}

impl AccessList {
    pub fn new() -> Self {
        AccessList::default()
    }

    /// Replace the permissions stored under `key`
    pub fn set(&mut self, key: impl Into<String>, perms: PermissionSet) {
        self.entries.insert(key.into(), perms);
    }

    /// Stored permissions under `key`, without role expansion
    pub fn raw(&self, key: &str) -> Option<&PermissionSet> {
        self.entries.get(key)
    }

    /// Permissions under `key` with role tokens expanded one level.
    /// Unknown keys give an empty set.
    pub fn get(&self, key: &str, role_prefix: &str) -> PermissionSet {
        match self.entries.get(key) {
            Some(perms) => self.expand_roles(perms, role_prefix),
            None => PermissionSet::new(),
        }
    }

    /// Substitute role tokens defined in this list. A role's own tokens are
    /// taken as stored; tokens with no matching role pass through literally.
    pub fn expand_roles(&self, perms: &PermissionSet, role_prefix: &str) -> PermissionSet {
        let mut out = PermissionSet::new();
        for token in perms {
            match self.entries.get(token) {
                Some(role) if is_role(role_prefix, token) => out.extend(role.iter()),
                _ => {
                    out.insert(token);
                }
            }
        }
        out
    }

    /// Keys whose stored (unexpanded) permissions include all of `required`
    pub fn keys_with_access(&self, required: &PermissionSet) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, perms)| perms.contains_all(required))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Role names defined in this list
    pub fn roles<'a>(&'a self, role_prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.keys().filter_map(move |k| k.strip_prefix(role_prefix))
    }

    /// Set a role by name
    pub fn set_role(&mut self, role_prefix: &str, name: &str, perms: PermissionSet) {
        self.set(build_key(role_prefix, name), perms);
    }
}

// ============================================================================
// Tests
// ============================================================================
