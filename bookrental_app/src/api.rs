use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bookrental_store::document_store::DocumentStoreError;

pub type UserId = String;
pub type BookId = String;
pub type OrderId = String;

pub const USERS: &str = "users";
pub const BOOKS: &str = "books";
pub const ORDERS: &str = "orders";

/// Decodes a raw store document into a typed record.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, DocumentStoreError> {
    Ok(serde_json::from_value(value)?)
}

pub fn decode_list<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>, DocumentStoreError> {
    values.into_iter().map(decode).collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Plaintext, as stored by the document store. Login is a lookup.
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub favorites: Vec<BookId>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub year: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Single-slot rental lock: the id of the user currently renting the
    /// book. Missing and null are equivalent.
    #[serde(default)]
    pub rented_by: Option<UserId>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.rented_by.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub rented_at: String,
    #[serde(default)]
    pub returned_at: Option<String>,
}

impl Order {
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }
}

/// Order payload for POST; the store assigns the id.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: UserId,
    pub book_id: BookId,
    pub rented_at: String,
    pub returned_at: Option<String>,
}

/// Partial update for a user record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<BookId>>,
}

/// Partial update for a book record. Nullable fields use a double Option
/// so an explicit null can be sent to clear them.
#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rented_by: Option<Option<UserId>>,
}

impl BookPatch {
    pub fn rented_by(user_id: Option<UserId>) -> Self {
        Self {
            rented_by: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<Option<String>>,
}

#[cfg(test)]
mod api_tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_book_wire_format() {
        let book: Book = serde_json::from_value(json!({
            "id": "1",
            "title": "Dune",
            "author": "Frank Herbert",
            "year": "1965",
            "image": null,
            "description": "Spice",
            "rentedBy": "u1",
        }))
        .expect("Failed to deserialize book");
        assert_eq!(book.rented_by.as_deref(), Some("u1"));
        assert!(!book.is_available());

        // A patched-away rentedBy key reads back as available
        let book: Book = serde_json::from_value(json!({
            "id": "1",
            "title": "Dune",
            "author": "Frank Herbert",
            "year": "1965",
        }))
        .expect("Failed to deserialize book");
        assert!(book.is_available());
        assert_eq!(book.image, None);
    }

    #[test]
    fn test_patch_serialization_keeps_explicit_nulls_only() {
        let patch = BookPatch::rented_by(None);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"rentedBy": null}));

        let patch = BookPatch::rented_by(Some("u1".to_string()));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"rentedBy": "u1"})
        );

        let patch = UserPatch {
            favorites: Some(vec!["1".to_string()]),
            ..UserPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"favorites": ["1"]})
        );
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "name": "Ana",
            "email": "ana@example.com",
            "password": "secret",
            "role": "user",
        }))
        .expect("Failed to deserialize user");
        assert_eq!(user.role, Role::User);
        assert!(user.favorites.is_empty());
    }
}
