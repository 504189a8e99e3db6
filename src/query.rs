//! Bulk access queries: "every object this subject can use with permissions P".
//!
//! A query is a disjunction of clauses, one per access key, each requiring the
//! object's grant under that key, with its role tokens expanded, to contain
//! every required permission. Building a query does no I/O;
//! [`AccessQuery::exec`] hands it to a store.

use serde_json::{json, Value};

use crate::acl::AccessList;
use crate::document::Document;
use crate::error::Result;
use crate::keys::ROLE_PREFIX;
use crate::object::ParentCapable;
use crate::options::ObjectOptions;
use crate::permission::PermissionSet;
use crate::store::DocumentStore;
use crate::subject::Subject;

/// `field.key` must contain all of `all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub key: String,
    pub all: PermissionSet,
}

impl Clause {
    /// Dotted path in the store's query language
    pub fn path(&self) -> String {
        format!("{}.{}", self.field, self.key)
    }

    /// Evaluate against the grant under `key`, expanding role tokens the
    /// way a live read does. With no required permissions, any entry under
    /// the key matches.
    pub fn matches(&self, acl: &AccessList, role_prefix: &str) -> bool {
        acl.raw(&self.key)
            .is_some_and(|perms| acl.expand_roles(perms, role_prefix).contains_all(&self.all))
    }
}

/// Disjunction of [`Clause`]s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessQuery {
    clauses: Vec<Clause>,
    role_prefix: String,
}

impl AccessQuery {
    /// Build the query for `subject` over objects attached with `options`.
    ///
    /// A parent contributes a clause on its parent key only when the subject
    /// itself holds all of `perms` over that parent; the clause then also
    /// requires the child's grant to the parent to cover `perms`, which caps
    /// the leak the same way live resolution does.
    pub fn with_access(
        options: &ObjectOptions,
        subject: &dyn Subject,
        perms: &PermissionSet,
        parents: &[&dyn ParentCapable],
    ) -> AccessQuery {
        let mut keys = subject.get_access_keys();
        for parent in parents {
            if subject.get_access(parent.as_object(), &[]).contains_all(perms) {
                keys.push(parent.parent_key());
            }
        }
        AccessQuery::for_keys(&options.path, keys, perms).with_role_prefix(&options.role_prefix)
    }

    /// One clause per key against the ACL stored at `field`, with the
    /// default role prefix
    pub fn for_keys<I, K>(field: &str, keys: I, perms: &PermissionSet) -> AccessQuery
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let clauses = keys
            .into_iter()
            .map(|key| Clause { field: field.to_string(), key: key.into(), all: perms.clone() })
            .collect();
        AccessQuery { clauses, role_prefix: ROLE_PREFIX.to_string() }
    }

    /// Prefix identifying role tokens in matched grants
    pub fn with_role_prefix(mut self, role_prefix: &str) -> AccessQuery {
        self.role_prefix = role_prefix.to_string();
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True if any clause matches. Objects with no access list never match.
    pub fn matches(&self, acl: Option<&AccessList>) -> bool {
        acl.is_some_and(|acl| self.clauses.iter().any(|c| c.matches(acl, &self.role_prefix)))
    }

    /// Render as a document-store filter:
    /// `{ "$or": [ { "<path>": { "$all": [...] } }, ... ] }`.
    /// A native store evaluates it over grants as stored, so role tokens
    /// are only honored by [`AccessQuery::matches`].
    pub fn to_filter(&self) -> Value {
        let or: Vec<Value> = self
            .clauses
            .iter()
            .map(|c| {
                let mut clause = serde_json::Map::new();
                clause.insert(c.path(), json!({ "$all": c.all }));
                Value::Object(clause)
            })
            .collect();
        json!({ "$or": or })
    }

    /// Run against `store`
    pub async fn exec<St: DocumentStore>(&self, store: &St) -> Result<Vec<Document>> {
        store.find(self).await
    }

    /// Run against `store`, notifying `on_complete` exactly once with the
    /// outcome before returning it. Store failures are passed through.
    pub async fn exec_with<St, F>(&self, store: &St, on_complete: F) -> Result<Vec<Document>>
    where
        St: DocumentStore,
        F: FnOnce(&Result<Vec<Document>>),
    {
        let result = store.find(self).await;
        on_complete(&result);
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Entity, Object};

    struct Keys(Vec<&'static str>);

    impl Entity for Keys {
        fn id(&self) -> &str {
            "keys"
        }
    }

    impl Subject for Keys {
        fn get_access_keys(&self) -> Vec<String> {
            self.0.iter().map(|k| k.to_string()).collect()
        }
    }

    #[test]
    fn test_clause_per_key() {
        let q = AccessQuery::with_access(&ObjectOptions::default(), &Keys(vec!["foo", "bar"]), &["baz", "qux"].into(), &[]);
        assert_eq!(
            q.to_filter(),
            json!({ "$or": [
                { "_acl.foo": { "$all": ["baz", "qux"] } },
                { "_acl.bar": { "$all": ["baz", "qux"] } }
            ]})
        );
    }

    #[test]
    fn test_parent_clause_added_when_covered() {
        let mut parent = Document::new("p");
        Object::set_access(&mut parent, "k1", ["p", "q"].into());
        let subject = Keys(vec!["k1", "k2"]);
        let perms: PermissionSet = ["p", "q"].into();

        let q = AccessQuery::with_access(&ObjectOptions::default(), &subject, &perms, &[&parent]);
        assert_eq!(q.len(), 3);
        assert_eq!(q.clauses()[2].key, "parent:p");
    }

    #[test]
    fn test_parent_clause_skipped_when_not_covered() {
        let mut parent = Document::new("p");
        Object::set_access(&mut parent, "k1", ["p"].into());
        let subject = Keys(vec!["k1", "k2"]);

        let q = AccessQuery::with_access(&ObjectOptions::default(), &subject, &["p", "q"].into(), &[&parent]);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_matches_expand_roles() {
        let mut acl = AccessList::new();
        acl.set("k1", ["p", "q", "r"].into());
        acl.set("k2", ["role:owner"].into());
        acl.set("role:owner", ["p", "q"].into());

        let q = AccessQuery::for_keys("_acl", ["k1"], &["p", "q"].into());
        assert!(q.matches(Some(&acl)));
        let q = AccessQuery::for_keys("_acl", ["k2"], &["p", "q"].into());
        assert!(q.matches(Some(&acl)));
        let q = AccessQuery::for_keys("_acl", ["k2"], &["r"].into());
        assert!(!q.matches(Some(&acl)));
        assert!(!q.matches(None));
    }

    #[test]
    fn test_role_prefix_from_options() {
        let mut acl = AccessList::new();
        acl.set("k", ["group:staff"].into());
        acl.set("group:staff", ["p"].into());

        let options = ObjectOptions { role_prefix: "group:".into(), ..Default::default() };
        let q = AccessQuery::with_access(&options, &Keys(vec!["k"]), &["p"].into(), &[]);
        assert!(q.matches(Some(&acl)));
        assert!(!AccessQuery::for_keys("_acl", ["k"], &["p"].into()).matches(Some(&acl)));
    }

    #[test]
    fn test_empty_perms_match_any_entry() {
        let mut acl = AccessList::new();
        acl.set("k1", PermissionSet::new());
        assert!(AccessQuery::for_keys("_acl", ["k1"], &PermissionSet::new()).matches(Some(&acl)));
        assert!(!AccessQuery::for_keys("_acl", ["k2"], &PermissionSet::new()).matches(Some(&acl)));
    }
}
