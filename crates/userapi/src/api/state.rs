//! Application state shared across handlers.

use std::sync::Arc;

use crate::user::UserRepository;

/// CORS configuration for the API layer.
#[derive(Clone, Debug, Default)]
pub struct CorsState {
    /// Allowed origins. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// User persistence.
    pub users: Arc<dyn UserRepository>,
    pub cors: CorsState,
}

impl AppState {
    /// Create new application state.
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            cors: CorsState::default(),
        }
    }

    /// Restrict CORS to the given origins.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors.allowed_origins = origins;
        self
    }
}
