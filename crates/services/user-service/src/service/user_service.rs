//! User service - Handles user-related business logic.
//!
//! Creation is a two-step workflow: commit the user, then attempt the
//! welcome notification. The second step is best-effort and can never fail
//! the first.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{NotificationRequest, User, UserDraft};

use crate::notifier::NotificationPublisher;
use crate::repository::UserRepository;
use crate::telemetry::WELCOME_PUBLISH_FAILURES;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a user and publish its welcome notification.
    ///
    /// Fails with a validation error when either field is absent or empty.
    /// Publish failures are logged and swallowed.
    async fn create_user(&self, name: Option<String>, email: Option<String>) -> AppResult<User>;

    /// Get user by ID
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// List all users
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Replace both name and email of an existing user
    async fn update_user(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<User>;

    /// Delete user by ID (no notification is sent)
    async fn delete_user(&self, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UserService using repository and publisher.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
    notifier: Arc<dyn NotificationPublisher>,
}

impl UserManager {
    /// Create new user service instance
    pub fn new(repo: Arc<dyn UserRepository>, notifier: Arc<dyn NotificationPublisher>) -> Self {
        Self { repo, notifier }
    }

    async fn send_welcome(&self, user: &User) {
        let notification = NotificationRequest::welcome(user);
        debug!(user_id = %user.id, "Publishing welcome notification");

        match self.notifier.publish(&notification).await {
            Ok(()) => info!(user_id = %user.id, "Welcome notification published"),
            Err(e) => {
                metrics::counter!(WELCOME_PUBLISH_FAILURES).increment(1);
                error!(
                    user_id = %user.id,
                    error = %e,
                    "Failed to publish welcome notification, user was created"
                );
            }
        }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create_user(&self, name: Option<String>, email: Option<String>) -> AppResult<User> {
        let draft = UserDraft::new(name, email)?;

        let user = self.repo.create(draft).await?;
        info!(user_id = %user.id, "User saved");

        self.send_welcome(&user).await;

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_not_found()
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repo.list().await
    }

    async fn update_user(
        &self,
        id: Uuid,
        name: Option<String>,
        email: Option<String>,
    ) -> AppResult<User> {
        let mut user = self.repo.find_by_id(id).await?.ok_or_not_found()?;

        user.apply(UserDraft::new(name, email)?);

        self.repo.update(user).await
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.exists(id).await? {
            return Err(AppError::NotFound);
        }

        self.repo.delete(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
