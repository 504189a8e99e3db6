//! Objects: entities that carry an access list.
//!
//! An implementor only provides storage for the list and a dirty signal; every
//! access operation is a provided method so all object types resolve
//! permissions the same way.

use crate::acl::AccessList;
use crate::keys::build_key;
use crate::options::ObjectOptions;
use crate::permission::PermissionSet;

/// Anything with a stable identifier used to derive keys
pub trait Entity {
    fn id(&self) -> &str;
}

/// An entity that owns an access list
pub trait Object: Entity {
    /// Access list, `None` until the first write
    fn access_list(&self) -> Option<&AccessList>;

    /// Access list, created empty on first use
    fn access_list_mut(&mut self) -> &mut AccessList;

    /// Tell the persistence layer that `field` changed
    fn mark_dirty(&mut self, field: &str);

    fn object_options(&self) -> &ObjectOptions {
        ObjectOptions::global()
    }

    /// Key this object is filed under in its children's access lists
    fn parent_key(&self) -> String {
        build_key(&self.object_options().parent_prefix, self.id())
    }

    fn role_key(&self, role: &str) -> String {
        build_key(&self.object_options().role_prefix, role)
    }

    /// Permissions under `key`, role tokens expanded
    fn get_access(&self, key: &str) -> PermissionSet {
        match self.access_list() {
            Some(acl) => acl.get(key, &self.object_options().role_prefix),
            None => PermissionSet::new(),
        }
    }

    /// Replace the permissions under `key`; tokens are stored as given
    fn set_access(&mut self, key: &str, perms: PermissionSet) {
        self.access_list_mut().set(key, perms);
        let path = self.object_options().path.clone();
        self.mark_dirty(&path);
    }

    fn set_role(&mut self, role: &str, perms: PermissionSet) {
        let key = self.role_key(role);
        self.set_access(&key, perms);
    }

    /// Keys whose stored grants cover `required`. Roles are not expanded.
    fn keys_with_access(&self, required: &PermissionSet) -> Vec<String> {
        self.access_list()
            .map(|acl| acl.keys_with_access(required))
            .unwrap_or_default()
    }

    /// Record what `parent` may do to this object
    fn set_parent_access(&mut self, parent: &dyn Object, perms: PermissionSet) {
        let key = parent.parent_key();
        self.set_access(&key, perms);
    }
}

/// Objects that can act as a parent in a hierarchy.
///
/// Only parent-capable objects leak permissions to their children during
/// subject resolution.
pub trait ParentCapable: Object {
    fn as_object(&self) -> &dyn Object;

    /// What `child` granted to this object as its parent
    fn get_child_access(&self, child: &dyn Object) -> PermissionSet {
        child.get_access(&self.parent_key())
    }
}

// ============================================================================
// Tests
// ============================================================================
