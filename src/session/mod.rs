//! Client-side session state.
//!
//! [`SessionStore`] is the single authority on "who is logged in". It holds a
//! [`Session`] snapshot that is replaced wholesale on every auth transition
//! and read from anywhere via [`SessionStore::snapshot`]. Screens that need
//! an authenticated user consult [`SessionStore::guard`] and nothing else.
//!
//! The store never touches credentials storage itself: the session cookie
//! established by a successful login lives in the HTTP client's jar and is
//! attached to requests by the transport.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::api::models::{Credentials, SignupDetails, UserIdentity};
use crate::api::{ApiError, RecallBackend};

/// Where the store is in its lifecycle.
///
/// `Initializing` is the sole initial state; it is left exactly once, when
/// the first identity check resolves. `Busy` covers an in-flight login or
/// signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Idle,
    Busy,
}

/// One immutable view of the session.
#[derive(Debug, Clone)]
pub struct Session {
    pub status: SessionStatus,
    /// The authenticated user; `None` means not logged in.
    pub identity: Option<UserIdentity>,
    /// Message from the last failed login/signup. Cleared when a new attempt
    /// starts, never by anything running in the background.
    pub last_error: Option<String>,
}

impl Session {
    fn initial() -> Self {
        Self {
            status: SessionStatus::Initializing,
            identity: None,
            last_error: None,
        }
    }
}

/// What a protected screen should do, given the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The first identity check has not resolved yet; hold rendering.
    Pending,
    /// An identity is present; render the protected screen.
    Admit,
    /// No identity; show the login screen instead.
    RedirectToLogin,
}

/// Holds the authenticated-user identity and mediates auth calls.
///
/// Constructed once at startup and passed by handle to whatever needs it;
/// there is no ambient global.
pub struct SessionStore {
    backend: Arc<dyn RecallBackend>,
    session: ArcSwap<Session>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn RecallBackend>) -> Self {
        Self {
            backend,
            session: ArcSwap::from_pointee(Session::initial()),
        }
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> Arc<Session> {
        self.session.load_full()
    }

    /// Route-guard decision from the `{status, identity}` pair.
    pub fn guard(&self) -> GuardDecision {
        let session = self.session.load();
        if session.status == SessionStatus::Initializing {
            GuardDecision::Pending
        } else if session.identity.is_some() {
            GuardDecision::Admit
        } else {
            GuardDecision::RedirectToLogin
        }
    }

    fn store(
        &self,
        status: SessionStatus,
        identity: Option<UserIdentity>,
        last_error: Option<String>,
    ) {
        self.session.store(Arc::new(Session {
            status,
            identity,
            last_error,
        }));
    }

    /// Ask the backend who we are and replace the identity with the answer.
    ///
    /// Any failure (401, network, anything) resolves to "not logged in":
    /// identity becomes `None`, `last_error` is left untouched, and no error
    /// is reported. Must run once at startup before any guard decision.
    pub async fn refresh_identity(&self) {
        let prior = self.snapshot();
        match self.backend.me().await {
            Ok(user) => {
                tracing::debug!(email = %user.email, "Session check: authenticated");
                self.store(SessionStatus::Idle, Some(user), prior.last_error.clone());
            }
            Err(e) => {
                // Not having a session is an expected state, not an error.
                tracing::debug!(error = %e, "Session check: not authenticated");
                self.store(SessionStatus::Idle, None, prior.last_error.clone());
            }
        }
    }

    /// Log in, then fetch the canonical identity (the login endpoint itself
    /// returns no user payload).
    ///
    /// On failure the identity is left exactly as it was, `last_error`
    /// carries the backend's message, and the error is returned so the
    /// calling view can decide what to do; navigation is not this store's
    /// call. The status is back to `Idle` on every exit path.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let prior = self.snapshot();
        self.store(SessionStatus::Busy, prior.identity.clone(), None);
        let result = self.backend.login(credentials).await;
        self.finish_auth(prior.identity.clone(), result).await
    }

    /// Create an account, then fetch the canonical identity. Same contract
    /// as [`SessionStore::login`].
    pub async fn signup(&self, details: &SignupDetails) -> Result<(), ApiError> {
        let prior = self.snapshot();
        self.store(SessionStatus::Busy, prior.identity.clone(), None);
        let result = self.backend.signup(details).await;
        self.finish_auth(prior.identity.clone(), result).await
    }

    async fn finish_auth(
        &self,
        prior_identity: Option<UserIdentity>,
        auth_result: Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        let outcome = match auth_result {
            Ok(()) => self.backend.me().await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(user) => {
                tracing::info!(email = %user.email, "Authenticated");
                self.store(SessionStatus::Idle, Some(user), None);
                Ok(())
            }
            Err(e) => {
                self.store(SessionStatus::Idle, prior_identity, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Log out. The local session is cleared no matter what the backend
    /// says; a client that asked to log out must never still look
    /// authenticated. Never fails.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
        }
        self.store(SessionStatus::Idle, None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fakes::{identity, ScriptedBackend};

    fn store_with(backend: &Arc<ScriptedBackend>) -> SessionStore {
        SessionStore::new(backend.clone())
    }

    #[test]
    fn test_initial_state_is_initializing() {
        let backend = ScriptedBackend::new();
        let store = store_with(&backend);

        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Initializing);
        assert!(session.identity.is_none());
        assert!(session.last_error.is_none());
        assert_eq!(store.guard(), GuardDecision::Pending);
    }

    #[tokio::test]
    async fn test_refresh_success_admits() {
        let backend = ScriptedBackend::new();
        backend.script_me(Ok(identity(1, "Ada", "ada@example.com")));
        let store = store_with(&backend);

        store.refresh_identity().await;

        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Idle);
        assert_eq!(session.identity.as_ref().unwrap().email, "ada@example.com");
        assert_eq!(store.guard(), GuardDecision::Admit);
    }

    #[tokio::test]
    async fn test_refresh_unauthenticated_is_not_an_error() {
        let backend = ScriptedBackend::new();
        backend.script_me(Err(ApiError::NotAuthenticated));
        let store = store_with(&backend);

        store.refresh_identity().await;

        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.identity.is_none());
        assert!(session.last_error.is_none());
        assert_eq!(store.guard(), GuardDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn test_login_fetches_canonical_identity() {
        let backend = ScriptedBackend::new();
        backend.script_login(Ok(()));
        backend.script_me(Ok(identity(1, "Ada", "ada@example.com")));
        let store = store_with(&backend);

        let creds = Credentials {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        store.login(&creds).await.unwrap();

        // The identity comes from /api/me, not from the login response.
        assert_eq!(backend.calls(), vec!["login", "me"]);
        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Idle);
        assert_eq!(session.identity.as_ref().unwrap().id, 1);
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_identity_and_surfaces_message() {
        let backend = ScriptedBackend::new();
        backend.script_login(Err(ApiError::AuthRejected(
            "invalid credentials".to_string(),
        )));
        let store = store_with(&backend);

        let creds = Credentials {
            email: "e@x.com".to_string(),
            password: "bad".to_string(),
        };
        let err = store.login(&creds).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthRejected(_)));

        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.identity.is_none());
        assert_eq!(session.last_error.as_deref(), Some("invalid credentials"));
    }

    #[tokio::test]
    async fn test_failed_login_does_not_drop_existing_identity() {
        let backend = ScriptedBackend::new();
        backend.script_me(Ok(identity(1, "Ada", "ada@example.com")));
        backend.script_login(Err(ApiError::AuthRejected("nope".to_string())));
        let store = store_with(&backend);

        store.refresh_identity().await;
        let creds = Credentials {
            email: "other@x.com".to_string(),
            password: "bad".to_string(),
        };
        let _ = store.login(&creds).await;

        let session = store.snapshot();
        assert_eq!(session.identity.as_ref().unwrap().email, "ada@example.com");
        assert_eq!(session.last_error.as_deref(), Some("nope"));
    }

    #[tokio::test]
    async fn test_login_ok_but_identity_check_fails() {
        let backend = ScriptedBackend::new();
        backend.script_login(Ok(()));
        backend.script_me(Err(ApiError::Backend("session store down".to_string())));
        let store = store_with(&backend);

        let creds = Credentials {
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(store.login(&creds).await.is_err());

        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.identity.is_none());
        assert_eq!(session.last_error.as_deref(), Some("session store down"));
    }

    #[tokio::test]
    async fn test_signup_follows_login_contract() {
        let backend = ScriptedBackend::new();
        backend.script_signup(Ok(()));
        backend.script_me(Ok(identity(2, "Grace", "grace@example.com")));
        let store = store_with(&backend);

        let details = SignupDetails {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        store.signup(&details).await.unwrap();

        assert_eq!(backend.calls(), vec!["signup", "me"]);
        assert_eq!(store.guard(), GuardDecision::Admit);
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_when_backend_fails() {
        let backend = ScriptedBackend::new();
        backend.script_me(Ok(identity(1, "Ada", "ada@example.com")));
        backend.script_logout(Err(ApiError::Backend("boom".to_string())));
        let store = store_with(&backend);

        store.refresh_identity().await;
        assert_eq!(store.guard(), GuardDecision::Admit);

        store.logout().await;

        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.identity.is_none());
        assert!(session.last_error.is_none());
        assert_eq!(store.guard(), GuardDecision::RedirectToLogin);
    }

    #[tokio::test]
    async fn test_refresh_leaves_last_error_untouched() {
        let backend = ScriptedBackend::new();
        backend.script_login(Err(ApiError::AuthRejected("bad".to_string())));
        backend.script_me(Err(ApiError::NotAuthenticated));
        let store = store_with(&backend);

        let creds = Credentials {
            email: "e@x.com".to_string(),
            password: "bad".to_string(),
        };
        let _ = store.login(&creds).await;
        store.refresh_identity().await;

        // refresh_identity neither sets nor clears the login error.
        let session = store.snapshot();
        assert_eq!(session.last_error.as_deref(), Some("bad"));
    }

    #[tokio::test]
    async fn test_login_is_busy_while_in_flight() {
        let backend = ScriptedBackend::new();
        let gate = backend.gate("login");
        backend.script_login(Ok(()));
        backend.script_me(Ok(identity(1, "Ada", "ada@example.com")));
        let mut started = backend.watch_calls();
        let store = Arc::new(store_with(&backend));

        let task = tokio::spawn({
            let store = store.clone();
            async move {
                let creds = Credentials {
                    email: "ada@example.com".to_string(),
                    password: "hunter2".to_string(),
                };
                store.login(&creds).await
            }
        });

        assert_eq!(started.recv().await.as_deref(), Some("login"));
        let session = store.snapshot();
        assert_eq!(session.status, SessionStatus::Busy);
        assert!(session.last_error.is_none());

        gate.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(store.snapshot().status, SessionStatus::Idle);
    }
}
