//! REST API client module for the Roomies backend.
//!
//! This module provides the `ApiClient` for rooms, chores, roommates,
//! expenses, notifications and profile data.
//!
//! Authenticated endpoints use the JWT bearer token obtained from `/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, ProfilePictureUpload, UserRef};
pub use error::ApiError;
