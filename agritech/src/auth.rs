//! Session handling for the dashboard backend.
//!
//! [`Auth`] owns the bearer token and user profile. The token is persisted
//! through an injected [`TokenStore`] so tests and callers decide where it
//! lives. A session counts as authenticated only once both the token and
//! the profile are known.

use crate::http::{HttpClient, RequestOptions};
use crate::types::{LoginCredentials, RegisterData, Session, User};
use crate::Error;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("token storage failed: {0}")]
    Io(#[from] io::Error),
}

/// Durable slot holding a single bearer token.
pub trait TokenStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<String>, StoreError>;

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, token: &str) -> Result<(), StoreError>;

    /// # Errors
    /// Returns an error if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), StoreError>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn get(&self) -> Result<Option<String>, StoreError> {
        (**self).get()
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        (**self).set(token)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// In-process store, scoped to its owner.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.token.lock().clone())
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.token.lock() = None;
        Ok(())
    }
}

/// Keeps the token in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Backend paths, relative to the [`HttpClient`] base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login: String,
    pub register: String,
    pub profile: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "auth/login".to_string(),
            register: "auth/register".to_string(),
            profile: "auth/me".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
    /// Set once the persisted token has been checked.
    pub initialized: bool,
    /// Last login/register failure, shown inline by auth screens.
    pub error: Option<String>,
}

impl AuthState {
    /// True iff both the profile and the token are known.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// The profile endpoint answers either `{"user": {...}}` or a bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileResponse {
    Wrapped { user: User },
    Bare(User),
}

impl From<ProfileResponse> for User {
    fn from(response: ProfileResponse) -> Self {
        match response {
            ProfileResponse::Wrapped { user } | ProfileResponse::Bare(user) => user,
        }
    }
}

fn bearer(token: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| Error::Application("Stored token is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

struct Inner {
    state: AuthState,
    /// Bumped whenever the session changes hands (sign in, sign out).
    generation: u64,
    bootstrapping: bool,
    requests: usize,
}

impl Inner {
    fn sync_loading(&mut self) {
        self.state.loading = self.bootstrapping || self.requests > 0;
    }
}

pub struct Auth<S: TokenStore> {
    http: HttpClient,
    store: S,
    endpoints: AuthEndpoints,
    inner: Mutex<Inner>,
}

impl<S: TokenStore> Auth<S> {
    #[must_use]
    pub fn new(http: HttpClient, store: S) -> Self {
        Self {
            http,
            store,
            endpoints: AuthEndpoints::default(),
            inner: Mutex::new(Inner {
                state: AuthState::default(),
                generation: 0,
                bootstrapping: false,
                requests: 0,
            }),
        }
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Restores a persisted session.
    ///
    /// A stored token is only trusted after the profile endpoint accepts
    /// it; any failure on the way clears the session. Runs once per
    /// instance, later calls just return the current state. If a sign in
    /// or sign out lands while the profile is in flight, that newer session
    /// is kept and the restore result is dropped.
    pub async fn initialize(&self) -> AuthState {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.state.initialized || inner.bootstrapping {
                return inner.state.clone();
            }
            inner.bootstrapping = true;
            inner.sync_loading();
            inner.generation
        };

        let token = self.store.get().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read stored token");
            None
        });
        let restored = match token {
            Some(token) => Some((self.fetch_profile(&token).await, token)),
            None => None,
        };

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!(generation, latest = inner.generation, "session changed during restore; keeping it");
        } else {
            match restored {
                Some((Ok(user), token)) => {
                    tracing::info!(user = %user.email, "restored session");
                    inner.state.user = Some(user);
                    inner.state.token = Some(token);
                }
                Some((Err(err), _)) => {
                    tracing::warn!(error = %err, "stored token rejected; signing out");
                    self.clear_session(&mut inner);
                }
                None => {}
            }
        }
        inner.bootstrapping = false;
        inner.state.initialized = true;
        inner.sync_loading();
        inner.state.clone()
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer(token)?);
        let response: ProfileResponse = self
            .http
            .request(
                &self.endpoints.profile,
                RequestOptions::new(Method::GET).with_headers(headers),
            )
            .await?;
        Ok(response.into())
    }

    /// # Errors
    /// Returns the backend failure; its message is also kept in [`Auth::error`].
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        self.begin();
        let result = self.http.post(&self.endpoints.login, credentials).await;
        self.settle("login", result)
    }

    /// # Errors
    /// Returns the backend failure; its message is also kept in [`Auth::error`].
    pub async fn register(&self, data: &RegisterData) -> Result<User, Error> {
        self.begin();
        let result = self.http.post(&self.endpoints.register, data).await;
        self.settle("register", result)
    }

    fn begin(&self) {
        let mut inner = self.inner.lock();
        inner.requests += 1;
        inner.state.error = None;
        inner.sync_loading();
    }

    fn settle(&self, action: &str, result: Result<Session, Error>) -> Result<User, Error> {
        let mut inner = self.inner.lock();
        inner.requests = inner.requests.saturating_sub(1);
        inner.sync_loading();
        match result {
            Ok(Session { token, user }) => {
                if let Err(err) = self.store.set(&token) {
                    tracing::warn!(error = %err, "could not persist token");
                }
                tracing::info!(action, user = %user.email, "signed in");
                inner.generation += 1;
                inner.state.user = Some(user.clone());
                inner.state.token = Some(token);
                inner.state.initialized = true;
                Ok(user)
            }
            Err(err) => {
                tracing::warn!(action, error = %err, "authentication failed");
                inner.state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Drops the session locally and in storage. No network call.
    pub fn logout(&self) {
        let mut inner = self.inner.lock();
        self.clear_session(&mut inner);
    }

    fn clear_session(&self, inner: &mut Inner) {
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "could not clear stored token");
        }
        inner.generation += 1;
        inner.state.user = None;
        inner.state.token = None;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().state.is_authenticated()
    }

    /// `Authorization: Bearer` for the current token, or an empty map.
    #[must_use]
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.token().and_then(|token| bearer(&token).ok()) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        let inner = self.inner.lock();
        match (&inner.state.token, &inner.state.user) {
            (Some(token), Some(user)) => Some(Session {
                token: token.clone(),
                user: user.clone(),
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.lock().state.user.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.lock().state.token.clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.lock().state.error.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.loading
    }

    pub fn clear_error(&self) {
        self.inner.lock().state.error = None;
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.lock().state.clone()
    }
}
