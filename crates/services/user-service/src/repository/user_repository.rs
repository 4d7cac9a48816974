//! User repository implementation.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{User, UserDraft};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// This is the persistence store seen by the user service: a key-addressed
/// CRUD interface. Concurrent writes to one record are isolated by the
/// database, not by callers.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user with a freshly generated id
    async fn create(&self, draft: UserDraft) -> AppResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// List all users in store order
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Persist the current name and email of an existing user
    async fn update(&self, user: User) -> AppResult<User>;

    /// Remove user by ID
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Check whether a user with this ID exists
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn create(&self, draft: UserDraft) -> AppResult<User> {
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(draft.name),
            email: Set(draft.email),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let existing = UserEntity::find_by_id(user.id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(user.name);
        active.email = Set(user.email);

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(user::Column::Id.eq(id))
            .count(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(count > 0)
    }
}
