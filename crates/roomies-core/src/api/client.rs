//! API client for communicating with the Roomies REST backend.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests for rooms, chores, roommates, expenses and notifications.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use reqwest::{header, multipart, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{format_base64_image, ImageCache};
use crate::config::Config;
use crate::models::{
    ActionResult, Chore, ChoreUpdate, Expense, ExpensePeriod, NewChore, NewExpense,
    NewNotification, Notification, NotificationUpdate, ProfilePicture, Room, Roommate,
    RoommateWithPicture, User, UserUpdate,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ChoresEnvelope {
    #[serde(default)]
    chores: Vec<Chore>,
}

#[derive(Debug, Deserialize)]
struct ChoreEnvelope {
    chore: Chore,
}

#[derive(Debug, Deserialize)]
struct RoommatesEnvelope {
    #[serde(default)]
    roommates: Vec<Roommate>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct Registration<'a> {
    first_name: &'a str,
    last_name: &'a str,
    username: &'a str,
    password: &'a str,
}

/// Whose profile picture to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRef {
    /// The signed-in user
    Me,
    Id(i64),
}

impl UserRef {
    fn id(self) -> Option<i64> {
        match self {
            UserRef::Me => None,
            UserRef::Id(id) => Some(id),
        }
    }
}

impl From<i64> for UserRef {
    fn from(id: i64) -> Self {
        UserRef::Id(id)
    }
}

/// New profile picture for the signed-in user.
#[derive(Debug, Clone)]
pub enum ProfilePictureUpload {
    /// Base64 payload, sent as JSON
    Base64(String),
    /// Raw image file, sent as multipart form data
    File {
        bytes: Vec<u8>,
        file_name: String,
        mime_type: String,
    },
}

/// API client for the Roomies backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and the image cache is shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    images: Arc<ImageCache>,
}

// Never print the bearer token
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.token.is_some())
            .field("cached_images", &self.images.len())
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client against `base_url` with a fresh image cache
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            images: Arc::new(ImageCache::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(
            &config.api_url(),
            Duration::from_secs(config.request_timeout_secs()),
        )
    }

    /// Share an existing image cache instead of the client's own
    pub fn with_image_cache(mut self, images: Arc<ImageCache>) -> Self {
        self.images = images;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Create a new ApiClient with the given token, sharing the connection
    /// pool and image cache.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
            images: Arc::clone(&self.images),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn image_cache(&self) -> &Arc<ImageCache> {
        &self.images
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        debug!(method = %method, path = path, "API request");
        Ok(self
            .client
            .request(method, self.url(path))
            .headers(self.auth_headers()?))
    }

    /// Request for endpoints that never take a bearer token
    fn unauthenticated(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(method = %method, path = path, "API request (unauthenticated)");
        self.client.request(method, self.url(path))
    }

    /// Check if response is successful, returning the backend's message if not.
    async fn check_response(response: reqwest::Response, fallback: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "API request failed");
            Err(ApiError::from_status(status, &body, fallback).into())
        }
    }

    async fn send(builder: RequestBuilder) -> Result<reqwest::Response> {
        Ok(builder.send().await.map_err(ApiError::from)?)
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let url = response.url().to_string();
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
                .into()
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder, fallback: &str) -> Result<T> {
        let response = Self::send(builder).await?;
        let response = Self::check_response(response, fallback).await?;
        Self::parse_json(response).await
    }

    async fn send_empty(builder: RequestBuilder, fallback: &str) -> Result<()> {
        let response = Self::send(builder).await?;
        Self::check_response(response, fallback).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Exchange credentials for an access token.
    /// Should only be called through `AuthService`, which owns the session.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<String> {
        let builder = self
            .unauthenticated(Method::POST, "/login")
            .json(&Credentials { username, password });

        let response: TokenResponse = Self::send_json(builder, "Failed to sign in").await?;
        Ok(response.access_token)
    }

    /// Register a new account. Does not sign in.
    pub async fn create_account(
        &self,
        first_name: &str,
        last_name: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let builder = self.unauthenticated(Method::POST, "/register").json(&Registration {
            first_name,
            last_name,
            username,
            password,
        });

        Self::send_empty(builder, "Failed to create account").await
    }

    // ===== Rooms =====

    /// Fetch the signed-in user's room. A 404 means "not in a room" and
    /// yields `Room::none()`.
    pub async fn fetch_room(&self) -> Result<Room> {
        let response = Self::send(self.request(Method::GET, "/room")?).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("User is not in a room");
            return Ok(Room::none());
        }

        let response = Self::check_response(response, "Failed to fetch Room").await?;
        Self::parse_json(response).await
    }

    pub async fn create_room(&self, room_name: &str) -> Result<Room> {
        let builder = self
            .request(Method::POST, "/rooms")?
            .json(&serde_json::json!({ "room_name": room_name }));

        Self::send_json(builder, "Failed to create Room").await
    }

    pub async fn join_room(&self, invite_code: &str) -> Result<Room> {
        let builder = self
            .request(Method::POST, "/rooms/join")?
            .json(&serde_json::json!({ "invite_code": invite_code }));

        Self::send_json(builder, "Failed to join Room").await
    }

    pub async fn leave_room(&self) -> Result<ActionResult> {
        Self::send_json(self.request(Method::POST, "/rooms/leave")?, "Failed to leave Room").await
    }

    // ===== Chores =====

    pub async fn fetch_chores(&self) -> Result<Vec<Chore>> {
        let envelope: ChoresEnvelope =
            Self::send_json(self.request(Method::GET, "/chores")?, "Failed to get chores").await?;
        Ok(envelope.chores)
    }

    pub async fn create_chore(&self, chore: &NewChore) -> Result<Chore> {
        let builder = self.request(Method::POST, "/chores")?.json(chore);
        let envelope: ChoreEnvelope = Self::send_json(builder, "Failed to create chore").await?;
        Ok(envelope.chore)
    }

    pub async fn update_chore(&self, chore_id: i64, updates: &ChoreUpdate) -> Result<Chore> {
        let builder = self
            .request(Method::PUT, &format!("/chores/{}", chore_id))?
            .json(updates);
        let envelope: ChoreEnvelope = Self::send_json(builder, "Failed to update chore").await?;
        Ok(envelope.chore)
    }

    /// Mark a chore as done
    pub async fn complete_chore(&self, chore_id: i64) -> Result<Chore> {
        self.update_chore(chore_id, &ChoreUpdate::completed()).await
    }

    pub async fn delete_chore(&self, chore_id: i64) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/chores/{}", chore_id))?;
        Self::send_empty(builder, "Failed to delete chore").await
    }

    // ===== Roommates =====

    pub async fn fetch_roommates(&self) -> Result<Vec<Roommate>> {
        let envelope: RoommatesEnvelope =
            Self::send_json(self.request(Method::GET, "/roommates")?, "Failed to get roommates")
                .await?;
        Ok(envelope.roommates)
    }

    /// Fetch all roommates (except `exclude`, usually the signed-in user)
    /// together with their profile pictures.
    ///
    /// Pictures are fetched concurrently. A failed picture fetch degrades to
    /// `ProfilePicture::Unavailable` for that roommate instead of failing the
    /// whole batch; only the roommate list itself can fail.
    pub async fn fetch_roommates_with_pictures(
        &self,
        exclude: Option<i64>,
    ) -> Result<Vec<RoommateWithPicture>> {
        let roommates = self.fetch_roommates().await?;

        let futures: Vec<_> = roommates
            .into_iter()
            .filter(|r| Some(r.id) != exclude)
            .map(|roommate| async move {
                let picture = match self.fetch_profile_picture(UserRef::Id(roommate.id)).await {
                    Ok(picture) => ProfilePicture::from(picture),
                    Err(e) => {
                        warn!(roommate_id = roommate.id, error = %e, "Failed to fetch profile picture");
                        ProfilePicture::Unavailable(e.to_string())
                    }
                };
                RoommateWithPicture { roommate, picture }
            })
            .collect();

        Ok(futures::future::join_all(futures).await)
    }

    // ===== Expenses =====

    async fn list_expense_periods(&self) -> Result<Vec<ExpensePeriod>> {
        Self::send_json(self.request(Method::GET, "/expense_period")?, "Failed to get expenses").await
    }

    /// Fetch the room's expense periods.
    ///
    /// A new room has none, so an empty list creates the first period and
    /// lists once more. The second result is returned as-is, even if empty.
    pub async fn fetch_expense_periods(&self) -> Result<Vec<ExpensePeriod>> {
        let periods = self.list_expense_periods().await?;
        if !periods.is_empty() {
            return Ok(periods);
        }

        debug!("No expense periods yet, creating the first one");
        self.create_expense_period().await?;

        let periods = self.list_expense_periods().await?;
        if periods.is_empty() {
            warn!("Still no expense periods after creating the first one");
        }
        Ok(periods)
    }

    /// Open a new expense period. The response body is not used.
    pub async fn create_expense_period(&self) -> Result<()> {
        let builder = self
            .request(Method::POST, "/expense_period")?
            .json(&serde_json::json!({}));
        Self::send_empty(builder, "Failed to create initial expense period").await
    }

    pub async fn close_expense_period(&self) -> Result<ExpensePeriod> {
        let builder = self
            .request(Method::PUT, "/expense_period")?
            .json(&serde_json::json!({}));
        Self::send_json(builder, "Failed to close expense period").await
    }

    pub async fn create_expense(&self, expense: &NewExpense) -> Result<Expense> {
        let builder = self.request(Method::POST, "/expense")?.json(expense);
        Self::send_json(builder, "Failed to create expense").await
    }

    pub async fn delete_expense(&self, expense_id: i64) -> Result<()> {
        let builder = self
            .request(Method::DELETE, "/expense")?
            .json(&serde_json::json!({ "id": expense_id }));
        Self::send_empty(builder, "Failed to delete expense").await
    }

    // ===== Profile =====

    /// Fetch a profile picture as a normalized base64 data URI.
    ///
    /// Served from the image cache when possible. A 404 (or an empty body)
    /// means the user has no picture and yields `None`.
    pub async fn fetch_profile_picture(&self, user: UserRef) -> Result<Option<String>> {
        let key = ImageCache::profile_key(user.id());
        if let Some(cached) = self.images.get_cached_image(&key) {
            debug!(key = %key, "Profile picture served from cache");
            return Ok(Some(cached));
        }

        let path = match user {
            UserRef::Me => "/profile_picture".to_string(),
            UserRef::Id(id) => format!("/profile_picture?user_id={}", id),
        };
        let response = Self::send(self.request(Method::GET, &path)?).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_response(response, "Failed to fetch profile picture").await?;
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        if bytes.is_empty() {
            return Ok(None);
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let image = format_base64_image(&encoded);
        self.images.cache_image(&key, &image);
        Ok(Some(image))
    }

    /// Replace the signed-in user's profile picture
    pub async fn update_profile_picture(&self, upload: ProfilePictureUpload) -> Result<ActionResult> {
        let builder = self.request(Method::PUT, "/profile_picture")?;
        let builder = match upload {
            ProfilePictureUpload::Base64(data) => {
                builder.json(&serde_json::json!({ "profile_picture": data }))
            }
            ProfilePictureUpload::File {
                bytes,
                file_name,
                mime_type,
            } => {
                let part = multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(ApiError::from)?;
                builder.multipart(multipart::Form::new().part("file", part))
            }
        };

        let result = Self::send_json(builder, "Failed to update profile picture").await?;
        self.images.remove(&ImageCache::profile_key(None));
        Ok(result)
    }

    pub async fn update_user(&self, update: &UserUpdate) -> Result<User> {
        let builder = self.request(Method::PUT, "/user")?.json(update);
        Self::send_json(builder, "Failed to update user info").await
    }

    // ===== Notifications =====

    /// All notifications in the signed-in user's room
    pub async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        Self::send_json(
            self.request(Method::GET, "/notifications")?,
            "Failed to get notifications",
        )
        .await
    }

    /// Notifications addressed to `recipient`
    pub async fn fetch_notifications_for(&self, recipient: i64) -> Result<Vec<Notification>> {
        let mut notifications = self.fetch_notifications().await?;
        notifications.retain(|n| n.is_for(recipient));
        Ok(notifications)
    }

    pub async fn create_notification(&self, notification: &NewNotification) -> Result<Notification> {
        let builder = self.request(Method::POST, "/notifications")?.json(notification);
        Self::send_json(builder, "Failed to create notification").await
    }

    pub async fn update_notification(&self, update: &NotificationUpdate) -> Result<Notification> {
        let builder = self.request(Method::PUT, "/notifications")?.json(update);
        Self::send_json(builder, "Failed to update notification").await
    }

    pub async fn delete_notification(&self, notification_id: i64) -> Result<()> {
        let builder = self
            .request(Method::DELETE, "/notifications")?
            .json(&serde_json::json!({ "notification_id": notification_id }));
        Self::send_empty(builder, "Failed to delete notification").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_regex, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SESSION: &str = "fake-jwt-token";

    async fn setup() -> (MockServer, ApiClient) {
        let server = MockServer::start().await;
        let api = ApiClient::new(&server.uri())
            .expect("client builds")
            .with_token(SESSION.to_string());
        (server, api)
    }

    fn backend_error(status: u16, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(status).set_body_json(json!({ "message": message }))
    }

    fn api_error(err: &anyhow::Error) -> &ApiError {
        err.downcast_ref::<ApiError>().expect("root cause is an ApiError")
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = ApiClient::new("http://localhost:5000/").expect("client builds");
        assert_eq!(api.base_url(), "http://localhost:5000");
        assert_eq!(api.url("/room"), "http://localhost:5000/room");
    }

    #[test]
    fn test_with_token_shares_image_cache() {
        let api = ApiClient::new("http://localhost:5000").expect("client builds");
        let signed_in = api.with_token("t".to_string());
        signed_in.image_cache().cache_image("profile_1", "x");
        assert_eq!(api.image_cache().get_cached_image("profile_1").as_deref(), Some("x"));
        assert_eq!(api.token(), None);
        assert_eq!(signed_in.token(), Some("t"));
    }

    #[test]
    fn test_with_image_cache_injects_shared_cache() {
        let shared = Arc::new(ImageCache::new());
        shared.cache_image("profile_self", "data:image/jpeg;base64,AA");

        let api = ApiClient::new("http://localhost:5000")
            .expect("client builds")
            .with_image_cache(Arc::clone(&shared));
        assert!(Arc::ptr_eq(api.image_cache(), &shared));

        let signed_in = api.with_token("t".to_string());
        assert!(Arc::ptr_eq(signed_in.image_cache(), &shared));
        assert_eq!(
            signed_in.image_cache().get_cached_image("profile_self").as_deref(),
            Some("data:image/jpeg;base64,AA")
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let api = ApiClient::new("http://localhost:5000")
            .expect("client builds")
            .with_token("secret-jwt".to_string());
        let printed = format!("{:?}", api);
        assert!(printed.contains("has_token: true"));
        assert!(!printed.contains("secret-jwt"));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_invalid_response() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/chores"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = api.fetch_chores().await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_sign_in_returns_access_token() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({ "username": "testuser", "password": "password123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "jwt-token" })))
            .expect(1)
            .mount(&server)
            .await;

        let token = api.sign_in("testuser", "password123").await.expect("sign in succeeds");
        assert_eq!(token, "jwt-token");

        // Login never carries a bearer token
        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_sign_in_failure_carries_backend_message() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(backend_error(401, "Invalid credentials"))
            .mount(&server)
            .await;

        let err = api.sign_in("testuser", "wrongpassword").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(api_error(&err).status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_sign_in_failure_without_message_uses_fallback() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let err = api.sign_in("testuser", "password123").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to sign in");
    }

    #[tokio::test]
    async fn test_create_account() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(body_json(json!({
                "first_name": "John",
                "last_name": "Doe",
                "username": "johndoe",
                "password": "password123"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        api.create_account("John", "Doe", "johndoe", "password123")
            .await
            .expect("registration succeeds");
    }

    #[tokio::test]
    async fn test_create_account_failure() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(backend_error(409, "Username already exists"))
            .mount(&server)
            .await;

        let err = api
            .create_account("John", "Doe", "existinguser", "password123")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");
    }

    #[tokio::test]
    async fn test_fetch_room() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/room"))
            .and(header("Authorization", "Bearer fake-jwt-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "room_id": 123, "name": "Test Room" })),
            )
            .mount(&server)
            .await;

        let room = api.fetch_room().await.expect("room lookup succeeds");
        assert_eq!(room.room_id, Some(123));
        assert_eq!(room.name.as_deref(), Some("Test Room"));
    }

    #[tokio::test]
    async fn test_fetch_room_not_found_is_no_room() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/room"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "room_id": null })))
            .mount(&server)
            .await;

        let room = api.fetch_room().await.expect("404 is not an error");
        assert_eq!(room, Room::none());
    }

    #[tokio::test]
    async fn test_fetch_room_error() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/room"))
            .respond_with(backend_error(401, "Unauthorized"))
            .mount(&server)
            .await;

        let err = api.fetch_room().await.unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_create_and_join_room() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .and(body_json(json!({ "room_name": "New Room" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "room_id": 123, "name": "New Room" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rooms/join"))
            .and(body_json(json!({ "invite_code": "ABC123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Roommate successfully joined the room",
                "room_id": 123,
                "invite_code": "ABC123"
            })))
            .mount(&server)
            .await;

        let created = api.create_room("New Room").await.expect("create succeeds");
        assert_eq!(created.room_id, Some(123));

        let joined = api.join_room("ABC123").await.expect("join succeeds");
        assert_eq!(joined.invite_code.as_deref(), Some("ABC123"));
        assert!(joined.is_member());
    }

    #[tokio::test]
    async fn test_join_room_invalid_code() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/rooms/join"))
            .respond_with(backend_error(404, "Invalid invite code"))
            .mount(&server)
            .await;

        let err = api.join_room("WRONG123").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid invite code");
    }

    #[tokio::test]
    async fn test_leave_room() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/rooms/leave"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&server)
            .await;

        let result = api.leave_room().await.expect("leave succeeds");
        assert_eq!(result.success, Some(true));
    }

    #[tokio::test]
    async fn test_fetch_chores_unwraps_envelope() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/chores"))
            .and(header("Authorization", "Bearer fake-jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chores": [
                    { "id": 1, "description": "Clean kitchen" },
                    { "id": 2, "description": "Take out trash" }
                ]
            })))
            .mount(&server)
            .await;

        let chores = api.fetch_chores().await.expect("chores load");
        assert_eq!(chores.len(), 2);
        assert_eq!(chores[1].description.as_deref(), Some("Take out trash"));
    }

    #[tokio::test]
    async fn test_create_chore_sends_snake_case_fields() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/chores"))
            .and(header("Authorization", "Bearer fake-jwt-token"))
            .and(body_json(json!({
                "description": "New chore",
                "start_date": "2023-01-01",
                "end_date": "2023-01-31",
                "is_task": false,
                "recurrence": "weekly",
                "assigned_roommate_id": 1,
                "rotation_order": [1, 2, 3]
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "chore": { "id": 1, "description": "New chore" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let chore = api
            .create_chore(&NewChore {
                description: "New chore".to_string(),
                start_date: "2023-01-01".to_string(),
                end_date: "2023-01-31".to_string(),
                is_task: false,
                recurrence: "weekly".to_string(),
                assigned_roommate_id: 1,
                rotation_order: vec![1, 2, 3],
            })
            .await
            .expect("create succeeds");
        assert_eq!(chore.id, 1);
        assert_eq!(chore.description.as_deref(), Some("New chore"));
    }

    #[tokio::test]
    async fn test_update_and_complete_chore() {
        let (server, api) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/chores/1"))
            .and(body_json(json!({ "description": "Updated chore", "completed": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chore": { "id": 1, "description": "Updated chore", "completed": true }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/chores/2"))
            .and(body_json(json!({ "completed": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chore": { "id": 2, "completed": true }
            })))
            .mount(&server)
            .await;

        let updates = ChoreUpdate {
            description: Some("Updated chore".to_string()),
            completed: Some(true),
            ..ChoreUpdate::default()
        };
        let chore = api.update_chore(1, &updates).await.expect("update succeeds");
        assert!(chore.is_completed());

        let done = api.complete_chore(2).await.expect("complete succeeds");
        assert_eq!(done.id, 2);
        assert!(done.is_completed());
    }

    #[tokio::test]
    async fn test_delete_chore() {
        let (server, api) = setup().await;
        Mock::given(method("DELETE"))
            .and(path("/chores/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/chores/2"))
            .respond_with(backend_error(404, "Failed to delete chore"))
            .mount(&server)
            .await;

        api.delete_chore(1).await.expect("delete succeeds");
        let err = api.delete_chore(2).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to delete chore");
    }

    #[tokio::test]
    async fn test_fetch_roommates() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/roommates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "roommates": [
                    { "id": 1, "first_name": "John", "last_name": "Doe" },
                    { "id": 2, "first_name": "Jane", "last_name": "Smith" }
                ]
            })))
            .mount(&server)
            .await;

        let roommates = api.fetch_roommates().await.expect("roommates load");
        assert_eq!(roommates.len(), 2);
        assert_eq!(roommates[1].full_name(), "Jane Smith");
    }

    #[tokio::test]
    async fn test_profile_picture_is_cached() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/profile_picture"))
            .and(query_param("user_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .expect(1)
            .mount(&server)
            .await;

        let first = api.fetch_profile_picture(UserRef::Id(7)).await.expect("fetch succeeds");
        assert_eq!(first.as_deref(), Some("data:image/jpeg;base64,/9j/"));

        let second = api.fetch_profile_picture(7.into()).await.expect("cache hit");
        assert_eq!(second, first);
        assert_eq!(api.image_cache().get_cached_image("profile_7"), first);
    }

    #[tokio::test]
    async fn test_profile_picture_not_found_is_none() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/profile_picture"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let picture = api.fetch_profile_picture(UserRef::Me).await.expect("404 is not an error");
        assert_eq!(picture, None);
        assert!(api.image_cache().is_empty());
    }

    #[tokio::test]
    async fn test_update_profile_picture_base64_and_file() {
        let (server, api) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/profile_picture"))
            .and(body_json(json!({ "profile_picture": "/9j/" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/profile_picture"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "uploaded" })))
            .expect(1)
            .mount(&server)
            .await;

        api.image_cache().cache_image("profile_self", "data:image/jpeg;base64,old");

        let result = api
            .update_profile_picture(ProfilePictureUpload::Base64("/9j/".to_string()))
            .await
            .expect("json upload succeeds");
        assert_eq!(result.message.as_deref(), Some("ok"));
        assert_eq!(api.image_cache().get_cached_image("profile_self"), None);

        let result = api
            .update_profile_picture(ProfilePictureUpload::File {
                bytes: vec![0xFF, 0xD8, 0xFF],
                file_name: "avatar.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
            })
            .await
            .expect("multipart upload succeeds");
        assert_eq!(result.message.as_deref(), Some("uploaded"));
    }

    #[tokio::test]
    async fn test_roommate_batch_tolerates_picture_failures() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/roommates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "roommates": [
                    { "id": 1, "first_name": "Me" },
                    { "id": 2, "first_name": "Has", "last_name": "Picture" },
                    { "id": 3, "first_name": "No", "last_name": "Picture" },
                    { "id": 4, "first_name": "Broken" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile_picture"))
            .and(query_param("user_id", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile_picture"))
            .and(query_param("user_id", "3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/profile_picture"))
            .and(query_param("user_id", "4"))
            .respond_with(backend_error(500, "storage offline"))
            .mount(&server)
            .await;

        let batch = api
            .fetch_roommates_with_pictures(Some(1))
            .await
            .expect("batch never fails on pictures");

        let ids: Vec<i64> = batch.iter().map(|r| r.roommate.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(batch[0].picture.data_uri(), Some("data:image/jpeg;base64,/9j/"));
        assert_eq!(batch[1].picture, ProfilePicture::Absent);
        assert_eq!(batch[2].picture, ProfilePicture::Unavailable("storage offline".to_string()));
        assert_eq!(batch[2].picture.data_uri(), None);
    }

    #[tokio::test]
    async fn test_expense_listing_creates_first_period_once() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/expense_period"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/expense_period"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1, "open": true })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/expense_period"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "open": true, "expenses": [] }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let periods = api.fetch_expense_periods().await.expect("listing succeeds");
        assert_eq!(periods.len(), 1);
        assert!(periods[0].open);
    }

    #[tokio::test]
    async fn test_expense_listing_retries_only_once() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/expense_period"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/expense_period"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let periods = api.fetch_expense_periods().await.expect("listing succeeds");
        assert!(periods.is_empty());
    }

    #[tokio::test]
    async fn test_expense_listing_error() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/expense_period"))
            .respond_with(backend_error(403, "Not in a room"))
            .mount(&server)
            .await;

        let err = api.fetch_expense_periods().await.unwrap_err();
        assert_eq!(err.to_string(), "Not in a room");
    }

    #[tokio::test]
    async fn test_create_and_delete_expense() {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/expense"))
            .and(body_json(json!({
                "title": "Groceries",
                "cost": 40.0,
                "description": "weekly shop",
                "expenses": [
                    { "roommate_id": 1, "percentage": 50.0 },
                    { "roommate_id": 2, "percentage": 50.0 }
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 9, "title": "Groceries", "cost": 40.0, "roommate_fkey": 1
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/expense"))
            .and(body_json(json!({ "id": 9 })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let expense = api
            .create_expense(&NewExpense::split_evenly("Groceries", 40.0, "weekly shop", &[1, 2]))
            .await
            .expect("create succeeds");
        assert_eq!(expense.id, 9);

        api.delete_expense(9).await.expect("delete succeeds");
    }

    #[tokio::test]
    async fn test_close_expense_period() {
        let (server, api) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/expense_period"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "open": false })))
            .mount(&server)
            .await;

        let closed = api.close_expense_period().await.expect("close succeeds");
        assert!(!closed.open);
    }

    #[tokio::test]
    async fn test_notifications_round() {
        let (server, api) = setup().await;
        Mock::given(method("GET"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "title": "Dishes", "notification_recipient": 5, "notification_sender": 6 },
                { "id": 2, "title": "Rent", "notification_recipient": 6, "notification_sender": 5 }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/notifications"))
            .and(body_json(json!({ "title": "Rent", "notification_recipient": 6 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 3, "title": "Rent", "notification_recipient": 6, "notification_sender": 5
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/notifications"))
            .and(body_json(json!({ "notification_id": 3, "description": "due Friday" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "title": "Rent", "description": "due Friday"
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/notifications"))
            .and(body_json(json!({ "notification_id": 3 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mine = api.fetch_notifications_for(5).await.expect("list succeeds");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, 1);

        let created = api
            .create_notification(&NewNotification {
                title: Some("Rent".to_string()),
                description: None,
                notification_recipient: 6,
                notification_sender: None,
            })
            .await
            .expect("create succeeds");
        assert_eq!(created.id, 3);

        let updated = api
            .update_notification(&NotificationUpdate {
                notification_id: 3,
                description: Some("due Friday".to_string()),
                ..NotificationUpdate::default()
            })
            .await
            .expect("update succeeds");
        assert_eq!(updated.description.as_deref(), Some("due Friday"));

        api.delete_notification(3).await.expect("delete succeeds");
    }

    #[tokio::test]
    async fn test_update_user() {
        let (server, api) = setup().await;
        Mock::given(method("PUT"))
            .and(path("/user"))
            .and(body_json(json!({ "first_name": "Johnny", "last_name": "Doe" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "first_name": "Johnny", "last_name": "Doe", "username": "johndoe"
            })))
            .mount(&server)
            .await;

        let user = api
            .update_user(&UserUpdate::names(" Johnny ", "Doe"))
            .await
            .expect("update succeeds");
        assert_eq!(user.first_name.as_deref(), Some("Johnny"));
    }

    #[tokio::test]
    async fn test_network_error_is_api_error() {
        // Reserve a free port, then close it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let api = ApiClient::new(&format!("http://{}", addr))
            .expect("client builds")
            .with_token(SESSION.to_string());

        let err = api.fetch_chores().await.unwrap_err();
        assert!(matches!(api_error(&err), ApiError::Network(_)));
    }
}
