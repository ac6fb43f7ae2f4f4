//! User records.
//!
//! The entity, the update payload, and the repository seam the API talks to.

mod models;
mod repository;

pub use models::{User, UserUpdate};
pub use repository::{SqliteUserRepository, UserNotFound, UserRepository};
