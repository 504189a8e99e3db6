//! Options for attaching access control to a document type.
//!
//! Options are plain values: built once (usually from [`Config`](crate::Config)
//! or `Default`), then shared read-only. Nothing mutates them after
//! construction.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize};

use crate::keys::{PARENT_PREFIX, ROLE_PREFIX, SUBJECT_PREFIX};

/// Object-side options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectOptions {
    /// Field name holding the access list inside the document
    pub path: String,
    pub role_prefix: String,
    pub parent_prefix: String,
}

impl Default for ObjectOptions {
    fn default() -> Self {
        ObjectOptions {
            path: "_acl".into(),
            role_prefix: ROLE_PREFIX.into(),
            parent_prefix: PARENT_PREFIX.into(),
        }
    }
}

impl ObjectOptions {
    /// Shared default instance
    pub fn global() -> &'static ObjectOptions {
        static DEFAULT: OnceLock<ObjectOptions> = OnceLock::new();
        DEFAULT.get_or_init(ObjectOptions::default)
    }
}

/// Subject-side options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectOptions {
    pub subject_prefix: String,
    /// Wildcard key every subject carries, none by default
    pub public_key: Option<String>,
    /// Derive extra keys from a document field
    pub additional_keys: Option<AdditionalKeys>,
}

/// Extra subject keys read from a list field: each entry `e` becomes
/// `prefix + e`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalKeys {
    pub field: String,
    pub prefix: String,
}

impl Default for SubjectOptions {
    fn default() -> Self {
        SubjectOptions {
            subject_prefix: SUBJECT_PREFIX.into(),
            public_key: None,
            additional_keys: None,
        }
    }
}

impl SubjectOptions {
    /// Shared default instance
    pub fn global() -> &'static SubjectOptions {
        static DEFAULT: OnceLock<SubjectOptions> = OnceLock::new();
        DEFAULT.get_or_init(SubjectOptions::default)
    }

    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn with_additional_keys(mut self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.additional_keys = Some(AdditionalKeys { field: field.into(), prefix: prefix.into() });
        self
    }
}

/// Guard (authorization check) options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardOptions {
    /// Request context entry holding the current subject
    pub user_path: String,
    /// Single parent entry, takes precedence over `parent_paths`
    pub parent_path: Option<String>,
    pub parent_paths: Vec<String>,
    /// Interaction verb (lowercase HTTP method) to required permission.
    /// Verbs are lowercased when read from config.
    #[serde(deserialize_with = "lowercase_verbs")]
    pub method_map: BTreeMap<String, String>,
    pub verbose: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        let method_map = [("post", "create"), ("put", "update"), ("get", "show"), ("delete", "destroy")]
            .into_iter()
            .map(|(m, p)| (m.to_string(), p.to_string()))
            .collect();
        GuardOptions {
            user_path: "user".into(),
            parent_path: None,
            parent_paths: Vec::new(),
            method_map,
            verbose: false,
        }
    }
}

impl GuardOptions {
    /// Permission derived from an interaction verb, case-insensitive
    pub fn permission_for(&self, verb: &str) -> Option<&str> {
        self.method_map.get(&verb.to_ascii_lowercase()).map(String::as_str)
    }

    /// Context entries to read parents from
    pub fn parent_entries(&self) -> Vec<&str> {
        match &self.parent_path {
            Some(p) => vec![p.as_str()],
            None => self.parent_paths.iter().map(String::as_str).collect(),
        }
    }
}

fn lowercase_verbs<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    let map = BTreeMap::<String, String>::deserialize(d)?;
    Ok(map.into_iter().map(|(verb, perm)| (verb.to_ascii_lowercase(), perm)).collect())
}

// ============================================================================
// Tests
// ============================================================================
