//! Subjects: the actors whose permissions are evaluated.
//!
//! A subject's effective permissions over an object are the union of what the
//! object grants to each of the subject's access keys, plus whatever leaks
//! down from parents. A leak is capped by both what the parent granted the
//! child and what the subject holds over the parent, so delegation never
//! amplifies a grant.

use tracing::trace;

use crate::keys::build_key;
use crate::object::{Entity, Object, ParentCapable};
use crate::options::SubjectOptions;
use crate::permission::PermissionSet;

/// An entity that acts on objects
pub trait Subject: Entity {
    fn subject_options(&self) -> &SubjectOptions {
        SubjectOptions::global()
    }

    /// Identity key, `subject:<id>` by default
    fn subject_key(&self) -> String {
        build_key(&self.subject_options().subject_prefix, self.id())
    }

    /// Caller-defined extra keys (groups, teams, ...)
    fn additional_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Global role names, used by role guards
    fn roles(&self) -> Vec<String> {
        Vec::new()
    }

    /// Identity key, public key when configured, then additional keys.
    /// Empty keys are dropped.
    fn get_access_keys(&self) -> Vec<String> {
        let mut keys = vec![self.subject_key()];
        keys.extend(self.subject_options().public_key.clone());
        keys.extend(self.additional_keys());
        keys.retain(|k| !k.is_empty());
        keys
    }

    /// Effective permissions over `object`, considering each of `parents`.
    /// Parents are one hop only: a parent's own parents are not consulted.
    fn get_access(&self, object: &dyn Object, parents: &[&dyn ParentCapable]) -> PermissionSet {
        let mut perms = PermissionSet::new();
        for key in self.get_access_keys() {
            perms.extend(object.get_access(&key).iter());
        }

        for parent in parents {
            let held = self.get_access(parent.as_object(), &[]);
            let leaked = parent.get_child_access(object).intersection(&held);
            trace!(parent = parent.id(), object = object.id(), %leaked, "leaked permissions");
            perms.extend(leaked.iter());
        }

        perms.compact()
    }

    /// Grant `perms` on `object` under this subject's identity key
    fn set_access(&self, object: &mut dyn Object, perms: PermissionSet) {
        let key = self.subject_key();
        object.set_access(&key, perms);
    }

    /// Grant the named roles of `object` to this subject
    fn set_roles(&self, object: &mut dyn Object, roles: &[&str]) {
        let perms: PermissionSet = roles.iter().map(|r| object.role_key(r)).collect();
        self.set_access(object, perms);
    }
}

// ============================================================================
// Tests
// ============================================================================
