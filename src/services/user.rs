//! User Service
//!
//! Record keeping for users. Mirrors the account lifecycle: drafts are
//! transient, updates merge into the stored row or insert a new one.

use std::sync::Arc;

use crate::domain::{User, UserView};
use crate::error::{AppError, AppResult};
use crate::storage::{Access, Storage};

/// Service for user reads and writes
#[derive(Clone)]
pub struct UserService {
    storage: Arc<dyn Storage>,
}

impl UserService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Get user by id
    pub async fn get(&self, user_id: i64) -> AppResult<UserView> {
        let mut uow = self.storage.begin(Access::ReadOnly).await?;
        let user = uow
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;
        uow.commit().await?;

        Ok(UserView::from_entity(&user))
    }

    /// All users, in id order
    pub async fn list_all(&self) -> AppResult<Vec<UserView>> {
        let mut uow = self.storage.begin(Access::ReadOnly).await?;
        let users = uow.find_all_users().await?;
        uow.commit().await?;

        Ok(users.iter().map(UserView::from_entity).collect())
    }

    pub fn draft(&self) -> UserView {
        UserView::default()
    }

    /// Merge into the stored user with the same id, or insert.
    ///
    /// # Errors
    /// - `AppError::InvalidRequest` when the result has no username
    /// - `AppError::Storage(StorageError::Duplicate)` when the username
    ///   belongs to another user
    pub async fn update(&self, view: UserView) -> AppResult<UserView> {
        let mut uow = self.storage.begin(Access::ReadWrite).await?;

        let existing = match view.id {
            Some(id) => uow.find_user_for_update(id).await?,
            None => None,
        };

        let user = match existing {
            Some(mut user) => {
                view.merge_into(&mut user);
                user
            }
            None => {
                let mut user = User::default();
                view.merge_into(&mut user);
                user
            }
        };

        if user.username.trim().is_empty() {
            return Err(AppError::InvalidRequest("username is required".to_string()));
        }

        let saved = uow.save_user(&user).await?;
        uow.commit().await?;

        tracing::info!(user_id = saved.id, username = %saved.username, "User saved");

        Ok(UserView::from_entity(&saved))
    }
}
