//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Both services share these types: the user service produces
//! [`NotificationRequest`] values and the email service consumes them.

pub mod constants;
pub mod error;
pub mod notification;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use notification::NotificationRequest;
pub use user::{User, UserDraft, UserRequest, UserResponse};
