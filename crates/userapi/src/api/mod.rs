//! HTTP API module.
//!
//! REST endpoints for user records under `/api/users`.

mod error;
mod extract;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use extract::{AppJson, AppPath};
pub use routes::create_router;
pub use state::{AppState, CorsState};
