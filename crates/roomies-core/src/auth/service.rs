use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};

use super::claims::{decode_identity, UserIdentity};
use super::store::SessionStore;

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    /// `None` when signed out or when the token could not be decoded
    pub identity: Option<UserIdentity>,
    /// True until the persisted session has been restored
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.identity.as_ref().and_then(UserIdentity::user_id)
    }
}

/// Owns the session token for the whole client.
///
/// Build one at startup and share it by `Arc`. Front ends call `subscribe()`
/// to be told whenever the session changes.
pub struct AuthService {
    api: ApiClient,
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionSnapshot>,
}

impl AuthService {
    /// `api` is used without a token for login and registration; clients for
    /// everything else come from `api()`.
    pub fn new(api: ApiClient, store: Arc<dyn SessionStore>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot {
            is_loading: true,
            ..SessionSnapshot::default()
        });

        Self { api, store, state }
    }

    /// Pick up the token persisted by an earlier run.
    /// A storage failure leaves the user signed out.
    pub fn restore(&self) {
        let token = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session");
                None
            }
        };

        debug!(restored = token.is_some(), "Session restore finished");
        self.apply(token);
    }

    /// Sign in and keep the returned token.
    ///
    /// On failure the backend's error comes back unchanged and the session
    /// is left as it was.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<()> {
        let token = self.api.sign_in(username, password).await?;

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "Failed to persist session token");
        }
        self.apply(Some(token));

        info!(username = username, user_id = ?self.user_id(), "Signed in");
        Ok(())
    }

    /// Forget the session locally. No network call; in-flight requests keep
    /// their token.
    pub fn sign_out(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to remove persisted session token");
        }
        self.apply(None);
        info!("Signed out");
    }

    /// Register a new account. The session is never touched; callers sign in
    /// separately.
    pub async fn create_account(
        &self,
        first_name: &str,
        last_name: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        self.api
            .create_account(first_name, last_name, username, password)
            .await
    }

    fn apply(&self, token: Option<String>) {
        let identity = token.as_deref().and_then(|t| match decode_identity(t) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Failed to decode session token");
                None
            }
        });

        self.state.send_replace(SessionSnapshot {
            token,
            identity,
            is_loading: false,
        });
    }

    pub fn session(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.state.borrow().identity.clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.state.borrow().user_id()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_signed_in()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// An API client carrying the current token, or `None` when signed out
    pub fn api(&self) -> Option<ApiClient> {
        self.token().map(|token| self.api.with_token(token))
    }

    /// Like `api()`, but signed out is an `ApiError::NotSignedIn`
    pub fn require_api(&self) -> Result<ApiClient> {
        self.api().ok_or_else(|| ApiError::NotSignedIn.into())
    }
}
