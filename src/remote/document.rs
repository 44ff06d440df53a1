//! Wire shape of a replicated record.
//!
//! Every entity maps onto the same envelope: id, owner, the two epoch-ms
//! timestamps, an `is_deleted` tombstone flag, and a flat map of
//! entity-specific fields. The local replication status never leaves the
//! device; deletion is the only state a remote document can express.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while mapping a remote document onto a local record.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document {id} has a malformed record id")]
    MalformedId { id: String },

    #[error("document {id} is missing field '{field}'")]
    MissingField { id: String, field: &'static str },

    #[error("document {id} has a malformed field '{field}'")]
    MalformedField { id: String, field: &'static str },
}

/// One document in a remote collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(
        id: Uuid,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        is_deleted: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            owner_id: owner_id.into(),
            is_deleted,
            created_at: created_at.timestamp_millis(),
            updated_at: updated_at.timestamp_millis(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Merge-write semantics: scalar envelope fields are overwritten, and
    /// every field present in `incoming` overwrites the stored one; fields
    /// absent from `incoming` are left untouched.
    pub fn merge_from(&mut self, incoming: &RemoteDocument) {
        self.owner_id = incoming.owner_id.clone();
        self.is_deleted = incoming.is_deleted;
        self.created_at = incoming.created_at;
        self.updated_at = incoming.updated_at;
        for (key, value) in &incoming.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    pub fn record_id(&self) -> Result<Uuid, DocumentError> {
        Uuid::parse_str(&self.id).map_err(|_| DocumentError::MalformedId {
            id: self.id.clone(),
        })
    }

    pub fn created(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.created_at).unwrap_or(DateTime::UNIX_EPOCH)
    }

    pub fn updated(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.updated_at).unwrap_or(DateTime::UNIX_EPOCH)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn i64_field(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    pub fn f64_field(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    pub fn require_str(&self, field: &'static str) -> Result<&str, DocumentError> {
        self.str_field(field).ok_or(DocumentError::MissingField {
            id: self.id.clone(),
            field,
        })
    }

    pub fn require_uuid(&self, field: &'static str) -> Result<Uuid, DocumentError> {
        Uuid::parse_str(self.require_str(field)?).map_err(|_| DocumentError::MalformedField {
            id: self.id.clone(),
            field,
        })
    }

    /// Decode a structured field (a JSON array or object) into `T`.
    /// A missing field decodes as `None`.
    pub fn decode_field<T: DeserializeOwned>(
        &self,
        field: &'static str,
    ) -> Result<Option<T>, DocumentError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|_| {
                DocumentError::MalformedField {
                    id: self.id.clone(),
                    field,
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(updated_ms: i64) -> RemoteDocument {
        RemoteDocument {
            id: Uuid::new_v4().to_string(),
            owner_id: "user1".to_string(),
            is_deleted: false,
            created_at: 500,
            updated_at: updated_ms,
            fields: Map::new(),
        }
    }

    #[test]
    fn test_json_roundtrip_flattens_fields() {
        let document = doc(1000).with_field("title", "Omelet").with_field("servings", 2);

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["title"], "Omelet");
        assert_eq!(json["updated_at"], 1000);

        let parsed: RemoteDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn test_is_deleted_defaults_to_false() {
        let parsed: RemoteDocument = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "owner_id": "user1",
            "created_at": 1,
            "updated_at": 2,
        }))
        .unwrap();
        assert!(!parsed.is_deleted);
    }

    #[test]
    fn test_merge_overwrites_present_fields_only() {
        let mut stored = doc(1000)
            .with_field("title", "Omelet")
            .with_field("servings", 2);
        let incoming = doc(2000).with_field("title", "Omelet v2");
        stored.merge_from(&incoming);

        assert_eq!(stored.updated_at, 2000);
        assert_eq!(stored.str_field("title"), Some("Omelet v2"));
        assert_eq!(stored.i64_field("servings"), Some(2));
    }

    #[test]
    fn test_require_str_reports_missing_field() {
        let document = doc(1000);
        let err = document.require_str("title").unwrap_err();
        assert!(matches!(err, DocumentError::MissingField { field: "title", .. }));
    }

    #[test]
    fn test_require_uuid_rejects_garbage() {
        let document = doc(1000).with_field("recipe_id", "not-a-uuid");
        assert!(document.require_uuid("recipe_id").is_err());
    }

    #[test]
    fn test_decode_field() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Pair {
            a: i32,
        }
        let document = doc(1000).with_field("pair", serde_json::json!({"a": 7}));
        assert_eq!(
            document.decode_field::<Pair>("pair").unwrap(),
            Some(Pair { a: 7 })
        );
        assert_eq!(document.decode_field::<Pair>("missing").unwrap(), None);
    }
}
