//! Test utilities and common setup.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, header};
use serde_json::Value;
use userapi::api;
use userapi::db::Database;
use userapi::user::{SqliteUserRepository, User, UserNotFound, UserRepository};

/// Create a test application over an empty in-memory database.
pub async fn test_app() -> Router {
    let (app, _) = test_app_with_repo().await;
    app
}

/// Create a test application and hand back the repository behind it.
pub async fn test_app_with_repo() -> (Router, Arc<SqliteUserRepository>) {
    let db = Database::in_memory().await.unwrap();
    let repo = Arc::new(SqliteUserRepository::new(db.pool().clone()));
    let state = api::AppState::new(repo.clone());
    (api::create_router(state), repo)
}

/// Create a test application seeded with Alice (id 1) and Bob (id 2).
pub async fn seeded_app() -> Router {
    let (app, repo) = test_app_with_repo().await;
    repo.save(User::new("Alice Smith", "alice@example.com"))
        .await
        .unwrap();
    repo.save(User::new("Bob Johnson", "bob@example.com"))
        .await
        .unwrap();
    app
}

/// Create a test application over a mock repository.
pub fn mock_app(mock: Arc<MockUserRepository>) -> Router {
    api::create_router(api::AppState::new(mock))
}

pub fn alice() -> User {
    User::with_id(1, "Alice Smith", "alice@example.com")
}

pub fn bob() -> User {
    User::with_id(2, "Bob Johnson", "bob@example.com")
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> axum::body::Bytes {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ============================================================================
// Mock UserRepository for testing
// ============================================================================

/// Scripted repository that records the calls the API makes.
#[derive(Default)]
pub struct MockUserRepository {
    /// Records returned by lookups.
    pub users: Vec<User>,
    /// Fixed result for `save`; when unset, the input is echoed with id 100.
    pub save_result: Option<User>,
    /// Make every call fail.
    pub fail: bool,
    /// Report the record as gone when `save` tries to overwrite it.
    pub vanish_on_save: bool,
    pub saved: Mutex<Vec<User>>,
    pub deleted: Mutex<Vec<i64>>,
    pub lookups: Mutex<Vec<i64>>,
}

impl MockUserRepository {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn vanishing_on_save(mut self) -> Self {
        self.vanish_on_save = true;
        self
    }

    pub fn returning_on_save(mut self, user: User) -> Self {
        self.save_result = Some(user);
        self
    }

    pub fn saved(&self) -> Vec<User> {
        self.saved.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<i64> {
        self.lookups.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            bail!("database is locked");
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_all(&self) -> Result<Vec<User>> {
        self.check()?;
        Ok(self.users.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.check()?;
        self.lookups.lock().unwrap().push(id);
        Ok(self.users.iter().find(|u| u.id == Some(id)).cloned())
    }

    async fn save(&self, user: User) -> Result<User> {
        self.check()?;
        self.saved.lock().unwrap().push(user.clone());
        if let (true, Some(id)) = (self.vanish_on_save, user.id) {
            return Err(UserNotFound(id).into());
        }
        Ok(match &self.save_result {
            Some(result) => result.clone(),
            None => User {
                id: user.id.or(Some(100)),
                ..user
            },
        })
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.check()?;
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}
