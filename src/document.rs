//! A concrete document that is both an object and a subject.
//!
//! Documents hold free-form JSON fields plus an embedded access list stored
//! under the schema's ACL field. The access list is a private control-plane
//! field: it is persisted with the record but never serialized externally.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::acl::AccessList;
use crate::error::{AclError, Result};
use crate::object::{Entity, Object, ParentCapable};
use crate::options::{ObjectOptions, SubjectOptions};
use crate::subject::Subject;

/// Record field holding the document id
pub const ID_FIELD: &str = "_id";
/// Record field holding a subject's global roles
pub const ROLES_FIELD: &str = "roles";

/// Options attached to a family of documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub object: ObjectOptions,
    pub subject: SubjectOptions,
}

impl Schema {
    pub fn shared(self) -> Arc<Schema> {
        Arc::new(self)
    }

    fn default_shared() -> Arc<Schema> {
        static DEFAULT: OnceLock<Arc<Schema>> = OnceLock::new();
        DEFAULT.get_or_init(|| Arc::new(Schema::default())).clone()
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    id: String,
    fields: Map<String, Value>,
    acl: Option<AccessList>,
    dirty: BTreeSet<String>,
    schema: Arc<Schema>,
}

impl Document {
    /// New document with the default schema
    pub fn new(id: impl Into<String>) -> Self {
        Document::with_schema(id, Schema::default_shared())
    }

    pub fn with_schema(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        Document { id: id.into(), fields: Map::new(), acl: None, dirty: BTreeSet::new(), schema }
    }

    /// New document with a random 24-hex-digit id
    pub fn generate(schema: Arc<Schema>) -> Result<Self> {
        Ok(Document::with_schema(generate_id()?, schema))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Set a field and mark it dirty. The id and ACL fields are reserved.
    pub fn set_field(&mut self, name: &str, value: Value) -> bool {
        if name == ID_FIELD || name == self.schema.object.path {
            return false;
        }
        self.fields.insert(name.to_string(), value);
        self.dirty.insert(name.to_string());
        true
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Called by the store after a successful save
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// External view: id and fields, never the access list
    pub fn to_json(&self) -> Value {
        let mut data = self.fields.clone();
        data.remove(&self.schema.object.path);
        data.insert(ID_FIELD.into(), Value::String(self.id.clone()));
        Value::Object(data)
    }

    /// Persisted view: id, fields and the access list under the ACL field
    pub fn to_record(&self) -> Result<Value> {
        let mut data = self.fields.clone();
        data.insert(ID_FIELD.into(), Value::String(self.id.clone()));
        if let Some(acl) = &self.acl {
            let acl = serde_json::to_value(acl).map_err(|e| AclError::Store(e.to_string()))?;
            data.insert(self.schema.object.path.clone(), acl);
        }
        Ok(Value::Object(data))
    }

    /// Rebuild a document from its persisted record
    pub fn from_record(record: Value, schema: Arc<Schema>) -> Result<Self> {
        let Value::Object(mut data) = record else {
            return Err(AclError::Store("record is not an object".into()));
        };
        let id = match data.remove(ID_FIELD) {
            Some(Value::String(id)) => id,
            _ => return Err(AclError::Store("record has no string _id".into())),
        };
        let acl = match data.remove(&schema.object.path) {
            Some(v) => Some(serde_json::from_value(v).map_err(|e| AclError::Store(e.to_string()))?),
            None => None,
        };
        Ok(Document { id, fields: data, acl, dirty: BTreeSet::new(), schema })
    }

    fn string_list(&self, field: &str) -> Vec<String> {
        match self.fields.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(String::from)).collect(),
            _ => Vec::new(),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Entity for Document {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Object for Document {
    fn access_list(&self) -> Option<&AccessList> {
        self.acl.as_ref()
    }

    fn access_list_mut(&mut self) -> &mut AccessList {
        self.acl.get_or_insert_with(AccessList::new)
    }

    fn mark_dirty(&mut self, field: &str) {
        self.dirty.insert(field.to_string());
    }

    fn object_options(&self) -> &ObjectOptions {
        &self.schema.object
    }
}

impl ParentCapable for Document {
    fn as_object(&self) -> &dyn Object {
        self
    }
}

impl Subject for Document {
    fn subject_options(&self) -> &SubjectOptions {
        &self.schema.subject
    }

    fn additional_keys(&self) -> Vec<String> {
        match &self.schema.subject.additional_keys {
            Some(ak) => self.string_list(&ak.field).into_iter().map(|v| format!("{}{}", ak.prefix, v)).collect(),
            None => Vec::new(),
        }
    }

    fn roles(&self) -> Vec<String> {
        self.string_list(ROLES_FIELD)
    }
}

/// Random 12-byte id rendered as hex
pub fn generate_id() -> Result<String> {
    let mut bytes = [0u8; 12];
    getrandom::getrandom(&mut bytes).map_err(|e| AclError::Store(e.to_string()))?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionSet;
    use serde_json::json;

    #[test]
    fn test_set_access_marks_acl_dirty() {
        let mut d = Document::new("1");
        assert!(!d.is_dirty());
        Object::set_access(&mut d, "foo", ["bar"].into());
        assert_eq!(d.dirty_fields().collect::<Vec<_>>(), vec!["_acl"]);
        assert_eq!(Object::get_access(&d, "foo"), PermissionSet::from(["bar"]));
        d.clear_dirty();
        assert!(!d.is_dirty());
    }

    #[test]
    fn test_to_json_hides_acl() {
        let mut d = Document::new("1");
        d.set_field("name", json!("report"));
        Object::set_access(&mut d, "subject:2", ["read"].into());
        let out = serde_json::to_value(&d).unwrap();
        assert_eq!(out, json!({"_id": "1", "name": "report"}));
    }

    #[test]
    fn test_reserved_fields() {
        let mut d = Document::new("1");
        assert!(!d.set_field("_acl", json!({})));
        assert!(!d.set_field("_id", json!("2")));
        assert!(d.fields().is_empty());
    }

    #[test]
    fn test_record_roundtrip_keeps_acl() {
        let mut d = Document::new("1");
        d.set_field("title", json!("t"));
        d.set_role("owner", ["x"].into());
        let record = d.to_record().unwrap();
        assert_eq!(record["_acl"]["role:owner"], json!(["x"]));

        let back = Document::from_record(record, d.schema().clone()).unwrap();
        assert_eq!(back.id(), "1");
        assert_eq!(back.field("title"), Some(&json!("t")));
        assert_eq!(Object::get_access(&back, "role:owner"), PermissionSet::from(["x"]));
        assert!(!back.is_dirty());
    }

    #[test]
    fn test_from_record_rejects_missing_id() {
        assert!(Document::from_record(json!({"a": 1}), Schema::default().shared()).is_err());
        assert!(Document::from_record(json!([1]), Schema::default().shared()).is_err());
    }

    #[test]
    fn test_custom_acl_path() {
        let schema = Schema { object: ObjectOptions { path: "perms".into(), ..Default::default() }, ..Default::default() };
        let mut d = Document::with_schema("1", schema.shared());
        Object::set_access(&mut d, "k", ["a"].into());
        assert!(d.to_record().unwrap().get("perms").is_some());
        assert!(d.to_json().get("perms").is_none());
    }

    #[test]
    fn test_subject_keys_from_fields() {
        let schema = Schema {
            subject: SubjectOptions::default().with_public_key("*").with_additional_keys("teams", "additional:"),
            ..Default::default()
        };
        let mut d = Document::with_schema("u1", schema.shared());
        d.set_field("teams", json!(["foo", "bar"]));
        d.set_field("roles", json!(["admin", 3]));
        assert_eq!(d.get_access_keys(), vec!["subject:u1", "*", "additional:foo", "additional:bar"]);
        assert_eq!(d.roles(), vec!["admin"]);
    }

    #[test]
    fn test_generate_id() {
        let a = generate_id().unwrap();
        assert_eq!(a.len(), 24);
        assert_ne!(a, generate_id().unwrap());
    }
}
