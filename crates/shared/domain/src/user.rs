//! User domain entity and related types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::constants::REQUIRED_FIELDS_MESSAGE;
use crate::error::{DomainError, DomainResult};

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl User {
    /// Create a user from its parts
    pub fn new(id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Overwrite both mutable fields from a validated draft
    pub fn apply(&mut self, draft: UserDraft) {
        self.name = draft.name;
        self.email = draft.email;
    }
}

/// Request body for creating or updating a user.
///
/// Both fields are optional on the wire so that a missing field surfaces as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserRequest {
    /// User display name
    #[cfg_attr(feature = "openapi", schema(example = "Ana"))]
    pub name: Option<String>,
    /// User email address
    #[cfg_attr(feature = "openapi", schema(example = "ana@example.com"))]
    pub email: Option<String>,
}

/// A name/email pair that passed the presence invariants.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct UserDraft {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub email: String,
}

impl UserDraft {
    /// Build a draft, rejecting absent or empty fields.
    ///
    /// A partial pair (only one field supplied) is rejected exactly like a
    /// pair with both fields missing.
    pub fn new(name: Option<String>, email: Option<String>) -> DomainResult<Self> {
        let (Some(name), Some(email)) = (name, email) else {
            return Err(DomainError::validation(REQUIRED_FIELDS_MESSAGE));
        };

        let draft = Self { name, email };
        draft
            .validate()
            .map_err(|_| DomainError::validation(REQUIRED_FIELDS_MESSAGE))?;

        Ok(draft)
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    /// User display name
    pub name: String,
    /// User email address
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}
