use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use routing::{Navigator, DASHBOARD_PATH, HOME_PATH};
use shared::domain::{Identity, SessionState, UserId};
use storage::KeyValueStore;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Persistence key holding the JSON-serialized identity.
pub const SESSION_KEY: &str = "user";

const DEFAULT_ROUND_TRIP: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("superseded by a newer credential request")]
    Superseded,
    #[error("failed to persist session: {0}")]
    Persistence(String),
    #[error("credential backend failed: {0}")]
    Backend(String),
}

/// The network seam for credential operations. The default implementation
/// below simulates the round trip; a real deployment swaps in a backend
/// that actually verifies credentials.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError>;
}

/// Simulated backend: sleeps one round trip, then synthesizes an identity
/// from the submitted fields. No credential verification happens here.
pub struct SimulatedCredentialBackend {
    round_trip: Duration,
}

impl SimulatedCredentialBackend {
    pub fn with_round_trip(round_trip: Duration) -> Self {
        Self { round_trip }
    }
}

impl Default for SimulatedCredentialBackend {
    fn default() -> Self {
        Self::with_round_trip(DEFAULT_ROUND_TRIP)
    }
}

#[async_trait]
impl CredentialBackend for SimulatedCredentialBackend {
    async fn login(&self, email: &str, _password: &str) -> Result<Identity, AuthError> {
        tokio::time::sleep(self.round_trip).await;
        let name = email.split('@').next().unwrap_or(email).to_string();
        Ok(Identity {
            id: UserId(Uuid::new_v4()),
            email: email.to_string(),
            name,
        })
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        _password: &str,
    ) -> Result<Identity, AuthError> {
        tokio::time::sleep(self.round_trip).await;
        Ok(Identity {
            id: UserId(Uuid::new_v4()),
            email: email.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoadingChanged(bool),
    IdentityChanged(Option<Identity>),
}

struct StoreState {
    session: SessionState,
    latest_request: u64,
}

/// Owner of the authenticated identity. Navigation is requested through
/// the `Navigator` capability, never performed directly; persistence goes
/// through the `KeyValueStore` seam under `SESSION_KEY`.
pub struct SessionStore {
    persistence: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    backend: Arc<dyn CredentialBackend>,
    inner: Mutex<StoreState>,
    request_seq: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(persistence: Arc<dyn KeyValueStore>, navigator: Arc<dyn Navigator>) -> Arc<Self> {
        Self::with_backend(
            persistence,
            navigator,
            Arc::new(SimulatedCredentialBackend::default()),
        )
    }

    pub fn with_backend(
        persistence: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        backend: Arc<dyn CredentialBackend>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            persistence,
            navigator,
            backend,
            inner: Mutex::new(StoreState {
                session: SessionState::default(),
                latest_request: 0,
            }),
            request_seq: AtomicU64::new(0),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.session.clone()
    }

    /// Loads the persisted identity into memory. Must settle before the
    /// route guard evaluates the first navigation; a malformed or
    /// unreadable stored value is treated as logged out, never as a
    /// failure.
    pub async fn restore(&self) -> SessionState {
        let restored = match self.persistence.get(SESSION_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => Some(identity),
                Err(error) => {
                    warn!(%error, "persisted session is malformed; treating as logged out");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(%error, "failed to read persisted session; treating as logged out");
                None
            }
        };

        let state = {
            let mut inner = self.inner.lock().await;
            inner.session.identity = restored;
            inner.session.loading = false;
            inner.session.clone()
        };
        self.emit(SessionEvent::IdentityChanged(state.identity.clone()));
        self.emit(SessionEvent::LoadingChanged(false));
        state
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let request = self.begin_request().await;
        let outcome = self.backend.login(email, password).await;
        self.settle(request, outcome).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let request = self.begin_request().await;
        let outcome = self.backend.register(name, email, password).await;
        self.settle(request, outcome).await
    }

    /// Clears the persisted and in-memory identity and requests navigation
    /// home. A persistence failure is logged and does not block the
    /// in-memory logout.
    pub async fn logout(&self) {
        if let Err(error) = self.persistence.remove(SESSION_KEY).await {
            warn!(%error, "failed to clear persisted session; continuing with in-memory logout");
        }
        {
            let mut inner = self.inner.lock().await;
            inner.session.identity = None;
        }
        self.emit(SessionEvent::IdentityChanged(None));
        self.navigator.redirect(HOME_PATH);
        info!("signed out");
    }

    /// Claims a request sequence number and marks the session loading.
    /// Only the settlement of the latest claimed request may apply state.
    async fn begin_request(&self) -> u64 {
        let request = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let newly_loading = {
            let mut inner = self.inner.lock().await;
            inner.latest_request = request;
            let newly = !inner.session.loading;
            inner.session.loading = true;
            newly
        };
        if newly_loading {
            self.emit(SessionEvent::LoadingChanged(true));
        }
        request
    }

    async fn settle(
        &self,
        request: u64,
        outcome: Result<Identity, AuthError>,
    ) -> Result<Identity, AuthError> {
        let applied = match outcome {
            Ok(identity) => self.apply_identity(request, identity).await,
            Err(err) => Err(err),
        };
        // A superseded settlement leaves `loading` to the request that
        // superseded it.
        if !matches!(applied, Err(AuthError::Superseded)) {
            self.finish_loading(request).await;
        }
        applied
    }

    async fn apply_identity(
        &self,
        request: u64,
        identity: Identity,
    ) -> Result<Identity, AuthError> {
        if !self.is_latest_request(request).await {
            debug!(request, "credential settlement superseded before persist; dropping");
            return Err(AuthError::Superseded);
        }

        let raw = serde_json::to_string(&identity)
            .map_err(|error| AuthError::Persistence(error.to_string()))?;
        self.persistence
            .set(SESSION_KEY, &raw)
            .await
            .map_err(|error| AuthError::Persistence(error.to_string()))?;

        {
            let mut inner = self.inner.lock().await;
            if inner.latest_request != request {
                debug!(request, "credential settlement superseded after persist; dropping");
                return Err(AuthError::Superseded);
            }
            inner.session.identity = Some(identity.clone());
        }
        self.emit(SessionEvent::IdentityChanged(Some(identity.clone())));
        self.navigator.redirect(DASHBOARD_PATH);
        info!(user_id = %identity.id, email = %identity.email, "signed in");
        Ok(identity)
    }

    async fn finish_loading(&self, request: u64) {
        let cleared = {
            let mut inner = self.inner.lock().await;
            if inner.latest_request == request && inner.session.loading {
                inner.session.loading = false;
                true
            } else {
                false
            }
        };
        if cleared {
            self.emit(SessionEvent::LoadingChanged(false));
        }
    }

    async fn is_latest_request(&self, request: u64) -> bool {
        self.inner.lock().await.latest_request == request
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
