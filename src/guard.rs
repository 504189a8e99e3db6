//! Authorization decisions, independent of any web framework.
//!
//! A missing subject or target is a denial, never a fault.

use std::sync::Arc;

use tracing::{debug, info};

use crate::object::{Object, ParentCapable};
use crate::options::GuardOptions;
use crate::permission::PermissionSet;
use crate::subject::Subject;

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Unauthorized,
}

impl Decision {
    #[inline]
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Requires the subject to hold a permission set over a target object
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    target: String,
    /// Empty means "derive from the interaction verb"
    perms: PermissionSet,
    options: Arc<GuardOptions>,
}

impl PermissionGuard {
    /// `target` names the request context entry holding the object
    pub fn new(target: impl Into<String>, perms: impl Into<PermissionSet>, options: Arc<GuardOptions>) -> Self {
        PermissionGuard { target: target.into(), perms: perms.into().compact(), options }
    }

    /// Derive the required permission from the verb on every check
    pub fn from_verb(target: impl Into<String>, options: Arc<GuardOptions>) -> Self {
        PermissionGuard::new(target, PermissionSet::new(), options)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    /// Permissions required for `verb`; `None` if they must come from the
    /// verb and the verb is not mapped
    pub fn required_for(&self, verb: &str) -> Option<PermissionSet> {
        if !self.perms.is_empty() {
            return Some(self.perms.clone());
        }
        self.options.permission_for(verb).map(PermissionSet::from)
    }

    pub fn check(
        &self,
        subject: Option<&dyn Subject>,
        object: Option<&dyn Object>,
        parents: &[&dyn ParentCapable],
        verb: &str,
    ) -> Decision {
        let (Some(subject), Some(object)) = (subject, object) else {
            debug!(target_entry = %self.target, "subject or target missing");
            return Decision::Unauthorized;
        };
        let Some(required) = self.required_for(verb) else {
            debug!(verb, "no permission mapped for verb");
            return Decision::Unauthorized;
        };

        if self.options.verbose {
            info!(
                "Checking if {} has permissions {} over {}:{}",
                subject.subject_key(),
                required,
                self.target,
                object.id()
            );
        }

        if subject.get_access(object, parents).excludes_any(&required) {
            debug!(subject = subject.id(), object = object.id(), %required, "permission denied");
            return Decision::Unauthorized;
        }
        Decision::Allow
    }
}

/// Requires the subject's global roles to include all of a role list
#[derive(Debug, Clone)]
pub struct RoleGuard {
    roles: PermissionSet,
    options: Arc<GuardOptions>,
}

impl RoleGuard {
    pub fn new(roles: impl Into<PermissionSet>, options: Arc<GuardOptions>) -> Self {
        RoleGuard { roles: roles.into(), options }
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    pub fn check(&self, subject: Option<&dyn Subject>) -> Decision {
        let Some(subject) = subject else {
            return Decision::Unauthorized;
        };
        let held: PermissionSet = subject.roles().into_iter().collect();
        if held.excludes_any(&self.roles) {
            debug!(subject = subject.id(), required = %self.roles, "missing roles");
            Decision::Unauthorized
        } else {
            Decision::Allow
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    fn opts() -> Arc<GuardOptions> {
        Arc::new(GuardOptions::default())
    }

    fn fixture() -> (Document, Document) {
        let user = Document::new("u1");
        let mut doc = Document::new("d1");
        Subject::set_access(&user, &mut doc, ["show", "update"].into());
        (user, doc)
    }

    #[test]
    fn test_missing_subject_or_object() {
        let (user, doc) = fixture();
        let g = PermissionGuard::new("doc", ["show"], opts());
        assert_eq!(g.check(None, Some(&doc), &[], "get"), Decision::Unauthorized);
        assert_eq!(g.check(Some(&user), None, &[], "get"), Decision::Unauthorized);
        assert_eq!(g.check(Some(&user), Some(&doc), &[], "get"), Decision::Allow);
    }

    #[test]
    fn test_fixed_permissions() {
        let (user, doc) = fixture();
        let g = PermissionGuard::new("doc", ["show", "destroy"], opts());
        assert_eq!(g.check(Some(&user), Some(&doc), &[], "get"), Decision::Unauthorized);
        let g = PermissionGuard::new("doc", "update", opts());
        assert!(g.check(Some(&user), Some(&doc), &[], "delete").is_allowed());
    }

    #[test]
    fn test_verb_derived_permissions() {
        let (user, doc) = fixture();
        let g = PermissionGuard::from_verb("doc", opts());
        assert!(g.check(Some(&user), Some(&doc), &[], "GET").is_allowed());
        assert!(g.check(Some(&user), Some(&doc), &[], "put").is_allowed());
        assert!(!g.check(Some(&user), Some(&doc), &[], "delete").is_allowed());
        assert!(!g.check(Some(&user), Some(&doc), &[], "patch").is_allowed());
    }

    #[test]
    fn test_parent_leak_allows() {
        let user = Document::new("u1");
        let mut parent = Document::new("p1");
        let mut doc = Document::new("d1");
        doc.set_parent_access(&parent, ["destroy"].into());
        Subject::set_access(&user, &mut parent, ["destroy"].into());

        let g = PermissionGuard::from_verb("doc", opts());
        assert!(!g.check(Some(&user), Some(&doc), &[], "delete").is_allowed());
        assert!(g.check(Some(&user), Some(&doc), &[&parent], "delete").is_allowed());
    }

    #[test]
    fn test_role_guard() {
        let mut user = Document::new("u1");
        user.set_field("roles", json!(["admin", "editor"]));
        let g = RoleGuard::new(["admin"], opts());
        assert!(g.check(Some(&user)).is_allowed());
        let g = RoleGuard::new(["admin", "owner"], opts());
        assert!(!g.check(Some(&user)).is_allowed());
        assert!(!g.check(None).is_allowed());
    }
}
