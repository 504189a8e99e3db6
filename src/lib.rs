//! docacl - Document-embedded access control
//!
//! Permissions live inside the documents they protect:
//! - Objects carry an access list mapping keys to permission sets
//! - Roles are keys whose permissions are substituted on read (live, one level)
//! - Subjects resolve their permissions from their identity, public and additional keys
//! - Parents leak permissions to children, capped by what the subject holds on the parent
//!
//! Storage is an LMDB store of JSON records; the `server` feature adds axum
//! middleware and a demo HTTP service.

pub mod acl;
pub mod config;
pub mod document;
pub mod error;
pub mod guard;
pub mod keys;
#[cfg(feature = "server")]
pub mod middleware;
pub mod object;
pub mod options;
pub mod permission;
pub mod query;
pub mod store;
pub mod subject;

pub use acl::AccessList;
pub use config::Config;
pub use document::{generate_id, Document, Schema};
pub use error::{AclError, Result};
pub use guard::{Decision, PermissionGuard, RoleGuard};
pub use keys::{parent_key, role_key, subject_key, KeyKind, ROLE_EXPANSION_DEPTH};
pub use object::{Entity, Object, ParentCapable};
pub use options::{AdditionalKeys, GuardOptions, ObjectOptions, SubjectOptions};
pub use permission::{excludes_any, Permission, PermissionSet};
pub use query::{AccessQuery, Clause};
pub use store::{DocumentStore, LmdbStore};
pub use subject::Subject;
