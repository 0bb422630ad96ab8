use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::instrument;

use crate::core::error::Error;
use crate::services::auth::AuthService;
use crate::token::claims::{self, ClaimSet};
use crate::token::role;
use crate::token::store::TokenStore;
use crate::types::response::TokenResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Restoring,
    Anonymous,
    Authenticated,
}

#[derive(Clone, Debug, PartialEq)]
enum Auth {
    Anonymous,
    Authenticated {
        token: String,
        claims: ClaimSet,
        is_admin: bool,
    },
}

impl Auth {
    fn from_token(token: String) -> Self {
        // A token we cannot read still authenticates requests; it just
        // carries no claims.
        let claims = claims::decode(&token).unwrap_or_default();
        let is_admin = role::claims_are_elevated(&claims);

        Auth::Authenticated {
            token,
            claims,
            is_admin,
        }
    }
}

/// Snapshot of who is signed in. Claims and the admin flag only exist
/// together with a token.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    loading: bool,
    auth: Auth,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match (&self.auth, self.loading) {
            (Auth::Authenticated { .. }, _) => SessionStatus::Authenticated,
            (Auth::Anonymous, true) => SessionStatus::Restoring,
            (Auth::Anonymous, false) => SessionStatus::Anonymous,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match &self.auth {
            Auth::Authenticated { token, .. } => Some(token),
            Auth::Anonymous => None,
        }
    }

    pub fn claims(&self) -> Option<&ClaimSet> {
        match &self.auth {
            Auth::Authenticated { claims, .. } => Some(claims),
            Auth::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.auth, Auth::Authenticated { is_admin: true, .. })
    }

    /// True until the stored token has been looked at once. Signing in or
    /// out does not touch it.
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    // bumped on every auth change so a slow restore can tell it lost the race
    revision: u64,
}

/// Who is signed in, for the lifetime of the process.
///
/// Owned by the root of the application and handed to consumers by
/// reference. `login`, `register` and `logout` are not serialized against
/// each other: callers must not start one while another is still running
/// (disable the trigger while busy). Overlapping calls race on the token
/// slot and the last write wins.
#[derive(Debug)]
pub struct Session<S> {
    auth: AuthService<S>,
    store: Arc<S>,
    inner: RwLock<Inner>,
}

impl<S: TokenStore> Session<S> {
    pub fn new(auth: AuthService<S>, store: Arc<S>) -> Self {
        Self {
            auth,
            store,
            inner: RwLock::new(Inner {
                state: SessionState {
                    loading: true,
                    auth: Auth::Anonymous,
                },
                revision: 0,
            }),
        }
    }

    /// Builds the session and immediately restores it from the store.
    pub async fn restored(auth: AuthService<S>, store: Arc<S>) -> Self {
        let session = Self::new(auth, store);
        session.restore().await;
        session
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state.clone()
    }

    /// Loads the persisted token, if any. Only the first call does anything;
    /// the session never goes back to loading. A sign-in or sign-out that
    /// lands while the store is being read wins over what was read.
    #[instrument(skip_all)]
    pub async fn restore(&self) {
        let revision = {
            let inner = self.inner.read().await;
            if !inner.state.loading {
                tracing::debug!("Session already restored");
                return;
            }
            inner.revision
        };

        let restored = match self.store.get().await {
            Ok(Some(token)) if !token.is_empty() => Auth::from_token(token),
            Ok(_) => Auth::Anonymous,
            Err(e) => {
                tracing::error!("Error loading auth token: {}", e);
                Auth::Anonymous
            }
        };

        let mut inner = self.inner.write().await;
        if inner.revision == revision {
            inner.state.auth = restored;
        } else {
            tracing::debug!("Session changed while restoring, keeping it");
        }
        inner.state.loading = false;

        tracing::info!("Session restored as {:?}", inner.state.status());
    }

    /// Signs in. `Ok(false)` when the backend answered without a token;
    /// service failures are returned untouched and leave the session as it
    /// was.
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str) -> Result<bool, Error> {
        let response = self.auth.login(username, password).await.inspect_err(|e| {
            tracing::error!("Login failed: {}", e);
        })?;

        Ok(self.accept(response).await)
    }

    /// Same contract as [`login`](Self::login), against the registration
    /// endpoint.
    #[instrument(skip_all)]
    pub async fn register(&self, username: &str, password: &str) -> Result<bool, Error> {
        let response = self
            .auth
            .register(username, password)
            .await
            .inspect_err(|e| {
                tracing::error!("Registration failed: {}", e);
            })?;

        Ok(self.accept(response).await)
    }

    /// Forgets the token. Always succeeds; a store that cannot be cleared is
    /// only logged.
    #[instrument(skip_all)]
    pub async fn logout(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!("Could not clear stored token: {}", e);
        }

        self.set_auth(Auth::Anonymous).await;

        tracing::info!("Logged out");
    }

    async fn set_auth(&self, auth: Auth) {
        let mut inner = self.inner.write().await;
        inner.state.auth = auth;
        inner.revision = inner.revision.wrapping_add(1);
    }

    async fn accept(&self, response: TokenResponse) -> bool {
        let Some(token) = response.token.filter(|t| !t.is_empty()) else {
            tracing::warn!("Auth response carried no token");
            return false;
        };

        if let Err(e) = self.store.set(&token).await {
            tracing::warn!("Could not persist token: {}", e);
        }

        let next = Auth::from_token(token);
        if let Auth::Authenticated {
            claims, is_admin, ..
        } = &next
        {
            tracing::info!(subject = claims.subject(), admin = *is_admin, "Signed in");
        }

        self.set_auth(next).await;

        true
    }
}
