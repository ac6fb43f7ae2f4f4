//! User data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity.
///
/// `id` is `None` until the repository persists the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
}

impl User {
    /// Create a not-yet-persisted user.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Create a user carrying an existing identifier.
    pub fn with_id(id: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(name, email)
        }
    }

    /// Drop any caller-supplied identifier so the repository assigns one.
    pub fn into_new(self) -> Self {
        Self { id: None, ..self }
    }

    /// Overlay the fields present in `update`, keeping the id and any
    /// field the update leaves out.
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
    }
}

/// Request body for updating an existing user.
///
/// `id` is accepted so clients can send a full `User` back, but it never
/// overrides the id taken from the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}
