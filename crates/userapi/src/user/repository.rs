//! User repository for database operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, instrument};

use super::models::User;

/// Returned by `save` when the user it should overwrite no longer exists.
#[derive(Debug, Error)]
#[error("User not found: {0}")]
pub struct UserNotFound(pub i64);

/// Persistence operations the API needs for users.
///
/// Implementations assign identifiers on save and treat deleting a
/// missing id as a no-op.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, in storage order.
    async fn find_all(&self) -> Result<Vec<User>>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Insert a user without an id, or overwrite the row with the user's id.
    /// Returns the stored record, which always carries an id. Overwriting a
    /// missing row fails with [`UserNotFound`] rather than recreating it.
    async fn save(&self, user: User) -> Result<User>;

    /// Remove a user if present.
    async fn delete_by_id(&self, id: i64) -> Result<()>;
}

/// SQLite-backed user repository.
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        Ok(users)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        Ok(user)
    }

    #[instrument(skip(self, user), fields(id = ?user.id))]
    async fn save(&self, user: User) -> Result<User> {
        let saved = match user.id {
            None => {
                debug!("Inserting user: {}", user.name);
                sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (name, email)
                    VALUES (?, ?)
                    RETURNING id, name, email
                    "#,
                )
                .bind(&user.name)
                .bind(&user.email)
                .fetch_one(&self.pool)
                .await
                .context("Failed to insert user")?
            }
            Some(id) => {
                debug!("Writing user {}", id);
                sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users
                    SET name = ?, email = ?
                    WHERE id = ?
                    RETURNING id, name, email
                    "#,
                )
                .bind(&user.name)
                .bind(&user.email)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to update user")?
                .ok_or(UserNotFound(id))?
            }
        };

        Ok(saved)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        if result.rows_affected() == 0 {
            debug!("No user with id {} to delete", id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn repo() -> SqliteUserRepository {
        let db = Database::in_memory().await.unwrap();
        SqliteUserRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let repo = repo().await;

        let alice = repo
            .save(User::new("Alice Smith", "alice@example.com"))
            .await
            .unwrap();
        let bob = repo
            .save(User::new("Bob Johnson", "bob@example.com"))
            .await
            .unwrap();

        assert_eq!(alice.id, Some(1));
        assert_eq!(bob.id, Some(2));
        assert_eq!(bob.name, "Bob Johnson");
    }

    #[tokio::test]
    async fn test_find_all_returns_ascending_ids() {
        let repo = repo().await;
        assert!(repo.find_all().await.unwrap().is_empty());

        repo.save(User::new("Alice Smith", "alice@example.com"))
            .await
            .unwrap();
        repo.save(User::new("Bob Johnson", "bob@example.com"))
            .await
            .unwrap();

        let users = repo.find_all().await.unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let repo = repo().await;
        assert!(repo.find_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_with_id_overwrites() {
        let repo = repo().await;
        let alice = repo
            .save(User::new("Alice Smith", "alice@example.com"))
            .await
            .unwrap();

        let updated = repo
            .save(User {
                name: "Alice Wonderland".to_string(),
                email: "alice.w@example.com".to_string(),
                ..alice.clone()
            })
            .await
            .unwrap();

        assert_eq!(updated.id, alice.id);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
        assert_eq!(
            repo.find_by_id(1).await.unwrap(),
            Some(User::with_id(1, "Alice Wonderland", "alice.w@example.com"))
        );
    }

    #[tokio::test]
    async fn test_save_with_deleted_id_does_not_recreate() {
        let repo = repo().await;
        let alice = repo
            .save(User::new("Alice Smith", "alice@example.com"))
            .await
            .unwrap();
        repo.delete_by_id(1).await.unwrap();

        let err = repo
            .save(User {
                name: "Alice Wonderland".to_string(),
                ..alice
            })
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<UserNotFound>(), Some(UserNotFound(1))));
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_and_missing_is_noop() {
        let repo = repo().await;
        repo.save(User::new("Alice Smith", "alice@example.com"))
            .await
            .unwrap();

        repo.delete_by_id(1).await.unwrap();
        assert!(repo.find_by_id(1).await.unwrap().is_none());

        repo.delete_by_id(1).await.unwrap();
        repo.delete_by_id(42).await.unwrap();
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let repo = repo().await;
        repo.save(User::new("Alice Smith", "alice@example.com"))
            .await
            .unwrap();
        repo.delete_by_id(1).await.unwrap();

        let bob = repo
            .save(User::new("Bob Johnson", "bob@example.com"))
            .await
            .unwrap();
        assert_eq!(bob.id, Some(2));
    }
}
