//! User records REST service.
//!
//! CRUD endpoints for users backed by a repository trait with a SQLite
//! adapter.

pub mod api;
pub mod db;
pub mod settings;
pub mod user;
