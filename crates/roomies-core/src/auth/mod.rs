//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `AuthService`: owns the session token and tells subscribers when it changes
//! - `SessionStore`: durable token storage (keychain, file or memory)
//! - `decode_identity`: reads the user id out of the token's `sub` claim
//!
//! Tokens are opaque to the client apart from that claim; they are never
//! verified or refreshed here.

pub mod claims;
pub mod service;
pub mod store;

pub use claims::{decode_identity, TokenError, UserIdentity};
pub use service::{AuthService, SessionSnapshot};
pub use store::{FileStore, KeyringStore, MemoryStore, SessionStore};
