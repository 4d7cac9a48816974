//! Notification request value object.
//!
//! This is the message that crosses the broker: the user service serializes
//! it as `{"to", "subject", "body"}` and the email service decodes the same
//! shape. It has no identity and is never persisted.

use serde::{Deserialize, Serialize};

use crate::constants::{welcome_body, WELCOME_SUBJECT};
use crate::user::User;

/// Email notification payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Recipient email address
    pub to: String,
    /// Email subject line
    pub subject: String,
    /// Email body content
    pub body: String,
}

impl NotificationRequest {
    /// Create a new notification request
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Welcome message for a freshly created user
    pub fn welcome(user: &User) -> Self {
        Self::new(user.email.clone(), WELCOME_SUBJECT, welcome_body(&user.name))
    }
}
