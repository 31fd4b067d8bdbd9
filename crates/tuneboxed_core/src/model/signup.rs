//! Signup record model.
//!
//! # Responsibility
//! - Define the visitor signup record and its deduplication key.
//! - Generate fresh record ids.
//!
//! # Invariants
//! - `id` is generated once at write time and never recomputed.
//! - Identity key is `email` when non-empty, otherwise `id`. Emails compare
//!   ASCII case-insensitively, so `A@x.com` and `a@x.com` are one signup.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

/// Opaque signup identifier.
///
/// Kept as a string because records written by other hosts may carry ids
/// that are not UUIDs.
pub type SignupId = String;

/// One visitor signup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignupRecord {
    pub id: SignupId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// RFC 3339 UTC timestamp, millisecond precision.
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl SignupRecord {
    /// Creates a record with a freshly generated id.
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: new_signup_id(),
            email: email.into(),
            name: name.into(),
            created_at: created_at.into(),
        }
    }

    /// Returns the key used to deduplicate signups across backends.
    pub fn identity_key(&self) -> Cow<'_, str> {
        identity_key_of(&self.email, &self.id)
    }
}

/// Identity key for an `(email, id)` pair without building a record.
///
/// Borrows unless the email carries uppercase ASCII.
pub fn identity_key_of<'a>(email: &'a str, id: &'a str) -> Cow<'a, str> {
    if email.is_empty() {
        Cow::Borrowed(id)
    } else if email.bytes().any(|byte| byte.is_ascii_uppercase()) {
        Cow::Owned(email.to_ascii_lowercase())
    } else {
        Cow::Borrowed(email)
    }
}

/// Generates a new time-ordered id (UUIDv7: Unix-millisecond prefix plus
/// random bits).
pub fn new_signup_id() -> SignupId {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::{new_signup_id, SignupRecord};

    #[test]
    fn identity_key_prefers_email() {
        let record = SignupRecord::new("a@x.com", "Ann", "2024-05-01T12:00:00.000Z");
        assert_eq!(record.identity_key(), "a@x.com");
    }

    #[test]
    fn identity_key_ignores_email_case() {
        let upper = SignupRecord::new("Ann@X.com", "Ann", "2024-05-01T12:00:00.000Z");
        let lower = SignupRecord::new("ann@x.com", "Ann", "2024-05-01T12:00:00.000Z");
        assert_eq!(upper.identity_key(), lower.identity_key());
        assert_eq!(upper.email, "Ann@X.com");
    }

    #[test]
    fn identity_key_falls_back_to_id_for_empty_email() {
        let record = SignupRecord::new("", "Anonymous", "2024-05-01T12:00:00.000Z");
        assert_eq!(record.identity_key(), record.id);
    }

    #[test]
    fn generated_ids_are_unique_and_ordered() {
        let first = new_signup_id();
        let second = new_signup_id();
        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn json_shape_uses_camel_case_timestamp() {
        let record = SignupRecord {
            id: "u1".to_string(),
            email: "a@x.com".to_string(),
            name: "Ann".to_string(),
            created_at: "2024-05-01T12:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["createdAt"], "2024-05-01T12:00:00.000Z");
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn missing_optional_fields_deserialize_as_empty() {
        let record: SignupRecord =
            serde_json::from_str(r#"{"id":"u9","createdAt":"2024-05-01T12:00:00.000Z"}"#)
                .unwrap();
        assert_eq!(record.email, "");
        assert_eq!(record.identity_key(), "u9");
    }
}
