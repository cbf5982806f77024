//! Roomies client core.
//!
//! Everything a Roomies front end needs below the screen layer:
//!
//! - `api`: typed client for the Roomies REST backend
//! - `auth`: session token lifecycle and user identity
//! - `cache`: in-memory profile picture cache
//! - `models`: rooms, chores, roommates, expenses, notifications
//! - `config`: persisted client configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthService, SessionSnapshot, UserIdentity};
pub use cache::ImageCache;
pub use config::Config;
