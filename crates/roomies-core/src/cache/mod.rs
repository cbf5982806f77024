//! In-memory caching for profile pictures.
//!
//! This module provides the `ImageCache` that the API client consults
//! before fetching a profile picture. Entries live for the lifetime of the
//! cache object; there is no expiry and no size bound, since a room only
//! ever has a handful of roommates.

pub mod images;

pub use images::{format_base64_image, ImageCache};
