use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use super::listener::ListenerSlot;
use super::persisted;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::http::{
    json_body, HttpClient, HttpMethod, JsonCodec, RequestDescriptor, RequestOptions,
    ReqwestTransport, Transport,
};
use crate::store::SecretStore;
use crate::types::requests::{
    ForgotPasswordRequest, RefreshRequest, ResendOtpRequest, ResetPasswordRequest, SignInRequest,
    SignUpRequest, UpdatePasswordRequest, VerifyOtpRequest,
};
use crate::types::user::UserEnvelope;
use crate::types::{
    AuthResponse, AuthState, AuthStateChange, IdentifierKind, OtpType, Session, User,
};
use crate::value::AnyJson;

struct SessionState {
    session: Option<Session>,
    user: Option<User>,
    last_state: AuthState,
    // Bumped on every commit, clear and restore. Responses to calls made on
    // behalf of one session are only applied while it is unchanged.
    generation: u64,
}

struct Inner {
    config: AuthConfig,
    http: HttpClient,
    store: Arc<dyn SecretStore>,
    state: Mutex<SessionState>,
    // Serializes commit, clear and restore so state, storage and
    // notifications are always applied in the same order.
    gate: tokio::sync::Mutex<()>,
    listener: ListenerSlot,
    restored: watch::Sender<bool>,
}

/// Owns the current session and mediates every auth call.
///
/// On construction the persisted session is loaded in the background and
/// announced as [`AuthState::InitialSession`]. Every operation waits for that
/// load before running. Sessions returned by the backend are persisted first,
/// then adopted in memory, then announced as [`AuthState::SignedIn`]; if the
/// store rejects the write nothing else happens and the error is returned.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use restauth::config::AuthConfig;
/// use restauth::session::SessionManager;
/// use restauth::store::FileSecretStore;
/// use restauth::types::IdentifierKind;
///
/// # async fn example() -> restauth::error::Result<()> {
/// let manager = SessionManager::new(
///     AuthConfig::new("https://api.example.com"),
///     Arc::new(FileSecretStore::new_default()),
/// );
/// manager.on_auth_state_change(|change| println!("{} {:?}", change.state, change.session.is_some()));
/// manager.sign_in("ada@example.com", "hunter2", IdentifierKind::Email).await?;
/// assert!(manager.is_valid());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.inner.config.base_url)
            .field("has_session", &self.current_session().is_some())
            .field("last_state", &self.last_state())
            .finish()
    }
}

impl SessionManager {
    /// Create a manager using the default `reqwest` transport.
    pub fn new(config: AuthConfig, store: Arc<dyn SecretStore>) -> Self {
        Self::with_transport(config, store, Arc::new(ReqwestTransport::new()))
    }

    /// Create a manager with a caller-supplied transport.
    ///
    /// Never blocks on the network and never fails. Inside a Tokio runtime
    /// the persisted session is restored on the blocking pool; outside one it
    /// is restored before returning.
    pub fn with_transport(
        config: AuthConfig,
        store: Arc<dyn SecretStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let http = HttpClient::new(config.base_url.clone(), transport)
            .with_codec(JsonCodec::new(config.key_convention))
            .with_default_headers(
                config
                    .headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            )
            .with_timeout(config.timeout());
        let (restored, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            config,
            http,
            store,
            state: Mutex::new(SessionState {
                session: None,
                user: None,
                last_state: AuthState::Unknown,
                generation: 0,
            }),
            gate: tokio::sync::Mutex::new(()),
            listener: ListenerSlot::default(),
            restored,
        });

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task_inner = Arc::clone(&inner);
                handle.spawn(async move {
                    let _gate = task_inner.gate.lock().await;
                    let restore = Arc::clone(&task_inner);
                    if let Err(err) = tokio::task::spawn_blocking(move || restore.restore_locked()).await {
                        warn!(error = %err, "session restore task failed");
                        task_inner.restored.send_replace(true);
                    }
                });
            }
            Err(_) => {
                let _gate = inner.gate.blocking_lock();
                inner.restore_locked();
            }
        }

        Self { inner }
    }

    /// Resolves once the persisted session has been loaded (or found absent).
    pub async fn restored(&self) {
        let mut rx = self.inner.restored.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.lock_state().session.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.lock_state().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.bearer()
    }

    /// `true` when a session is held and its absolute expiry, if any, is in the future.
    pub fn is_valid(&self) -> bool {
        self.inner
            .lock_state()
            .session
            .as_ref()
            .is_some_and(Session::is_valid)
    }

    /// Label of the latest published transition; `Unknown` before the initial load.
    pub fn last_state(&self) -> AuthState {
        self.inner.lock_state().last_state
    }

    /// Register the single state listener, replacing any previous one.
    ///
    /// The listener immediately receives the current state as
    /// [`AuthState::InitialSession`].
    pub fn on_auth_state_change<F>(&self, listener: F)
    where
        F: Fn(AuthStateChange) + Send + Sync + 'static,
    {
        self.inner
            .listener
            .replace(Box::new(listener), || self.inner.snapshot());
    }

    pub fn remove_auth_state_listener(&self) {
        self.inner.listener.clear();
    }

    /// Stream surface over the same single listener slot.
    ///
    /// The stream ends when another listener (or stream) is registered.
    pub fn auth_state_changes(&self) -> impl Stream<Item = AuthStateChange> + Send + Unpin + 'static {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_auth_state_change(move |change| {
            let _ = tx.send(change);
        });
        UnboundedReceiverStream::new(rx)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<&BTreeMap<String, AnyJson>>,
    ) -> Result<AuthResponse> {
        let body = SignUpRequest {
            email,
            password,
            metadata,
        };
        let path = &self.inner.config.paths.sign_up;
        self.authenticate(path, HttpMethod::Post, &body, false).await
    }

    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &str,
        kind: IdentifierKind,
    ) -> Result<AuthResponse> {
        let body = SignInRequest::new(identifier, password, kind);
        let path = &self.inner.config.paths.sign_in;
        self.authenticate(path, HttpMethod::Post, &body, false).await
    }

    /// Sign in with a caller-defined credential body.
    pub async fn sign_in_with<C: Serialize + ?Sized>(&self, credentials: &C) -> Result<AuthResponse> {
        let path = &self.inner.config.paths.sign_in;
        self.authenticate(path, HttpMethod::Post, credentials, false)
            .await
    }

    /// Sign out locally, telling the server on a best-effort basis.
    ///
    /// A failed server call is logged and ignored; the local session is
    /// always cleared. Only a failure to delete the persisted blob is returned.
    pub async fn sign_out(&self) -> Result<()> {
        self.restored().await;
        let token = self.inner.bearer().ok_or(AuthError::NoSession)?;
        let request =
            descriptor::<()>(&self.inner.config.paths.sign_out, HttpMethod::Post, None, true)?;
        if let Err(err) = self.inner.http.execute_empty(&request, Some(&token)).await {
            warn!(error = %err, "server sign-out failed; clearing local session anyway");
        }
        self.inner.clear().await
    }

    /// Fetch the user for the current session. Only the in-memory user is updated,
    /// and only if the session is still the one the request was made with.
    pub async fn get_current_user(&self) -> Result<User> {
        self.restored().await;
        let (token, generation) = self.inner.bound_bearer().ok_or(AuthError::NoSession)?;
        let request = descriptor::<()>(&self.inner.config.paths.user, HttpMethod::Get, None, true)?;
        let user: User = self
            .inner
            .http
            .execute::<UserEnvelope>(&request, Some(&token))
            .await?
            .into();

        let _gate = self.inner.gate.lock().await;
        let mut state = self.inner.lock_state();
        if state.generation == generation {
            state.user = Some(user.clone());
        } else {
            debug!("session changed while fetching the user; not applied");
        }
        Ok(user)
    }

    pub async fn resend_otp(&self, email: &str, kind: OtpType) -> Result<()> {
        let body = ResendOtpRequest { email, kind };
        self.send_empty(&self.inner.config.paths.resend_otp, &body).await
    }

    pub async fn verify_otp(&self, email: &str, token: &str, kind: OtpType) -> Result<AuthResponse> {
        let body = VerifyOtpRequest { email, token, kind };
        let path = &self.inner.config.paths.verify_otp;
        self.authenticate(path, HttpMethod::Post, &body, false).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let body = ForgotPasswordRequest { email };
        self.send_empty(&self.inner.config.paths.forgot_password, &body)
            .await
    }

    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<AuthResponse> {
        let body = ResetPasswordRequest {
            reset_token,
            new_password,
        };
        let path = &self.inner.config.paths.reset_password;
        self.authenticate(path, HttpMethod::Post, &body, false).await
    }

    pub async fn update_password(&self, new_password: &str) -> Result<AuthResponse> {
        let body = UpdatePasswordRequest { new_password };
        let path = &self.inner.config.paths.update_password;
        self.authenticate(path, HttpMethod::Put, &body, true).await
    }

    /// Exchange the held refresh token for a new session.
    ///
    /// Fails with [`AuthError::NoSession`] if the session was cleared or
    /// replaced while the refresh was in flight; the result is then dropped.
    pub async fn refresh_session(&self) -> Result<Session> {
        self.restored().await;
        let (refresh_token, generation) = {
            let state = self.inner.lock_state();
            let session = state.session.as_ref().ok_or(AuthError::NoSession)?;
            let refresh_token = session.refresh_token.clone().ok_or(AuthError::NoSession)?;
            (refresh_token, state.generation)
        };

        let body = RefreshRequest {
            refresh_token: &refresh_token,
        };
        let request = descriptor(
            &self.inner.config.paths.refresh,
            HttpMethod::Post,
            Some(&body),
            false,
        )?;
        let response: AuthResponse = self.inner.http.execute(&request, None).await?;
        let session = response.session.ok_or_else(|| {
            AuthError::Decoding(<serde_json::Error as serde::de::Error>::custom(
                "refresh response carried no session",
            ))
        })?;
        self.inner
            .commit(session, response.user, Some(generation))
            .await
    }

    /// Adopt a session obtained elsewhere, persisting and announcing it.
    pub async fn set_session(&self, session: Session) -> Result<Session> {
        self.restored().await;
        self.inner.commit(session, None, None).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request::<(), T>(HttpMethod::Get, path, None, options)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Post, path, body, options).await
    }

    pub async fn put<B, T>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Put, path, body, options).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Patch, path, body, options).await
    }

    pub async fn delete<B, T>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(HttpMethod::Delete, path, body, options).await
    }

    /// Call an application endpoint with the current bearer token, if any.
    ///
    /// Never touches session state.
    pub async fn request<B, T>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = passthrough(method, path, body, options)?;
        self.restored().await;
        let token = self.inner.bearer();
        self.inner.http.execute(&request, token.as_deref()).await
    }

    /// Like [`request`](Self::request) but ignores the response body.
    pub async fn request_empty<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let request = passthrough(method, path, body, options)?;
        self.restored().await;
        let token = self.inner.bearer();
        self.inner.http.execute_empty(&request, token.as_deref()).await
    }

    async fn authenticate<B: Serialize + ?Sized>(
        &self,
        path: &str,
        method: HttpMethod,
        body: &B,
        requires_auth: bool,
    ) -> Result<AuthResponse> {
        self.restored().await;
        let (token, bound_to) = if requires_auth {
            let (token, generation) = self.inner.bound_bearer().ok_or(AuthError::NoSession)?;
            (Some(token), Some(generation))
        } else {
            (None, None)
        };
        let request = descriptor(path, method, Some(body), requires_auth)?;
        let mut response: AuthResponse = self.inner.http.execute(&request, token.as_deref()).await?;
        if let Some(session) = response.session.take() {
            let committed = self
                .inner
                .commit(session, response.user.clone(), bound_to)
                .await?;
            response.session = Some(committed);
        }
        Ok(response)
    }

    async fn send_empty<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.restored().await;
        let request = descriptor(path, HttpMethod::Post, Some(body), false)?;
        self.inner.http.execute_empty(&request, None).await
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bearer(&self) -> Option<String> {
        self.lock_state()
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    /// Token plus the generation it belongs to.
    fn bound_bearer(&self) -> Option<(String, u64)> {
        let state = self.lock_state();
        state
            .session
            .as_ref()
            .map(|session| (session.access_token.clone(), state.generation))
    }

    fn snapshot(&self) -> AuthStateChange {
        AuthStateChange::new(AuthState::InitialSession, self.lock_state().session.clone())
    }

    /// Must run with `gate` held.
    fn restore_locked(&self) {
        let key = &self.config.storage_key;
        let session = match self.store.load(key) {
            Ok(Some(bytes)) => match persisted::decode(&bytes) {
                Some(session) if session.is_valid() => Some(session),
                Some(_) => {
                    debug!("discarding expired persisted session");
                    if let Err(err) = self.store.delete(key) {
                        warn!(error = %err, "failed to delete expired session");
                    }
                    None
                }
                None => None,
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to load persisted session");
                None
            }
        };
        debug!(restored = session.is_some(), "initial session load finished");

        let change = {
            let mut state = self.lock_state();
            state.user = session.as_ref().and_then(|s| s.user.clone());
            state.session = session;
            state.last_state = AuthState::InitialSession;
            state.generation += 1;
            AuthStateChange::new(AuthState::InitialSession, state.session.clone())
        };
        self.listener.emit(change);
        self.restored.send_replace(true);
    }

    /// `bound_to` is the generation a session-bound call started from; the
    /// commit is refused with `NoSession` if the session changed since, and
    /// the held user then serves as the fallback user.
    async fn commit(
        &self,
        mut session: Session,
        user: Option<User>,
        bound_to: Option<u64>,
    ) -> Result<Session> {
        let _gate = self.gate.lock().await;
        let held_user = {
            let state = self.lock_state();
            match bound_to {
                Some(generation) if generation != state.generation => {
                    debug!("session changed while the request was in flight; result dropped");
                    return Err(AuthError::NoSession);
                }
                Some(_) => state.user.clone(),
                None => None,
            }
        };
        let user = user.or_else(|| session.user.clone()).or(held_user);
        if session.user.is_none() {
            session.user = user.clone();
        }

        let blob = persisted::encode(&session)?;
        if let Err(err) = self.store.save(&self.config.storage_key, &blob) {
            warn!(error = %err, "failed to persist session");
            return Err(err);
        }
        {
            let mut state = self.lock_state();
            state.session = Some(session.clone());
            state.user = user;
            state.last_state = AuthState::SignedIn;
            state.generation += 1;
        }
        debug!("session committed");
        self.listener.emit(AuthStateChange::new(
            AuthState::SignedIn,
            Some(session.clone()),
        ));
        Ok(session)
    }

    async fn clear(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        let deleted = self.store.delete(&self.config.storage_key);
        if let Err(err) = &deleted {
            warn!(error = %err, "failed to delete persisted session");
        }
        {
            let mut state = self.lock_state();
            state.session = None;
            state.user = None;
            state.last_state = AuthState::SignedOut;
            state.generation += 1;
        }
        debug!("session cleared");
        self.listener
            .emit(AuthStateChange::new(AuthState::SignedOut, None));
        deleted
    }
}

fn descriptor<B: Serialize + ?Sized>(
    path: &str,
    method: HttpMethod,
    body: Option<&B>,
    requires_auth: bool,
) -> Result<RequestDescriptor> {
    Ok(RequestDescriptor::builder()
        .path(path)
        .method(method)
        .maybe_body(body.map(json_body).transpose()?)
        .requires_auth(requires_auth)
        .build())
}

fn passthrough<B: Serialize + ?Sized>(
    method: HttpMethod,
    path: &str,
    body: Option<&B>,
    options: RequestOptions,
) -> Result<RequestDescriptor> {
    Ok(RequestDescriptor::builder()
        .path(path)
        .method(method)
        .maybe_body(body.map(json_body).transpose()?)
        .query(options.query)
        .headers(options.headers)
        .requires_auth(true)
        .build())
}
