use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::storage::{NewUser, UserStore};

/// User entity operations plus the friendship graph manager
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn add_user(&self, mut user: NewUser) -> AppResult<User> {
        apply_name_default(&mut user.name, &user.login);
        let user = self.store.add_user(user).await?;
        tracing::info!(user_id = user.id, login = %user.login, "user created");
        Ok(user)
    }

    pub async fn update_user(&self, mut user: User) -> AppResult<User> {
        apply_name_default(&mut user.name, &user.login);
        let user = self.store.update_user(user).await?;
        tracing::info!(user_id = user.id, "user updated");
        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id={} not found", id)))
    }

    pub async fn all_users(&self) -> AppResult<Vec<User>> {
        self.store.all_users().await
    }

    pub async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        if user_id == friend_id {
            return Err(AppError::Validation(
                "A user cannot add themself as a friend".to_string(),
            ));
        }
        self.store.add_friend(user_id, friend_id).await?;
        tracing::info!(user_id, friend_id, "friend added");
        Ok(())
    }

    pub async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.store.remove_friend(user_id, friend_id).await?;
        tracing::info!(user_id, friend_id, "friend removed");
        Ok(())
    }

    pub async fn friends(&self, user_id: i64) -> AppResult<Vec<User>> {
        let ids = self.store.friend_ids(user_id).await?;
        self.resolve(ids).await
    }

    /// Intersection of both users' outgoing friend sets. The identity case
    /// falls out of the set math: `common_friends(x, x)` is `friends(x)`.
    pub async fn common_friends(&self, user_id: i64, other_id: i64) -> AppResult<Vec<User>> {
        let ours: HashSet<i64> = self.store.friend_ids(user_id).await?.into_iter().collect();
        let theirs = self.store.friend_ids(other_id).await?;

        let mut common: Vec<i64> = theirs.into_iter().filter(|id| ours.contains(id)).collect();
        common.sort_unstable();
        self.resolve(common).await
    }

    async fn resolve(&self, ids: Vec<i64>) -> AppResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            users.push(self.get_user(id).await?);
        }
        Ok(users)
    }
}

/// The display name defaults to the login; decided once here, never
/// re-derived on later reads.
fn apply_name_default(name: &mut String, login: &str) {
    if name.trim().is_empty() {
        *name = login.to_string();
    }
}
