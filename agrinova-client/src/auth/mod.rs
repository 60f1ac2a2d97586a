//! Who is signed in, and to which organization.
//!
//! [`SessionManager`] owns the cached [`Session`], publishes every change on a
//! watch channel and keeps the local cache in step with the identity provider.

use std::sync::Arc;

use agrinova_shared::session::{ScreenStack, Session};
use agrinova_shared::users::Profile;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{AuthEvent, Backend};
use crate::error::{ClientError, ClientResult, SignupStep};

pub mod signup;
pub mod store;

pub use signup::{FarmerSignup, ManagerSignup};
pub use store::SessionStore;

pub struct SessionManager {
    backend: Backend,
    store: SessionStore,
    state: watch::Sender<Option<Session>>,
}

impl SessionManager {
    pub fn new(backend: Backend, store: SessionStore) -> Self {
        let (state, _rx) = watch::channel(None);
        Self {
            backend,
            store,
            state,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Restores the session at startup. A cached session is only trusted
    /// while the identity provider still holds a remote session for it.
    pub async fn initialize(&self) -> ClientResult<Option<Session>> {
        let Some(remote) = self.backend.identity.current_session().await? else {
            debug!("no remote session");
            self.store.clear()?;
            self.publish(None);
            return Ok(None);
        };

        let cached = self
            .store
            .load()?
            .filter(|s| s.user_id == remote.user_id);
        let session = match cached {
            Some(session) => Some(session),
            None => match self.rebuild(&remote.user_id).await {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(user_id = %remote.user_id, error = %e, "could not rebuild session");
                    None
                }
            },
        };

        if let Some(session) = &session {
            info!(user_id = %session.user_id, role = %session.role, "session restored");
        }
        self.publish(session.clone());
        Ok(session)
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn stack(&self) -> ScreenStack {
        ScreenStack::for_session(self.state.borrow().as_ref())
    }

    /// The current session, or [`ClientError::NotAuthenticated`].
    pub fn require(&self) -> ClientResult<Session> {
        self.current().ok_or(ClientError::NotAuthenticated)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let fields = signup::missing(&[
            ("email", &email.to_string()),
            ("password", &password.to_string()),
        ]);
        if !fields.is_empty() {
            return Err(ClientError::MissingFields(fields));
        }

        let remote = self
            .backend
            .identity
            .sign_in(email.trim(), password)
            .await
            .map_err(|e| match e {
                ClientError::Remote { status, message } if (400..500).contains(&status) => {
                    ClientError::InvalidCredentials(message)
                }
                other => other,
            })?;

        let profile = match self.backend.data.profile_by_id(&remote.user_id).await {
            Ok(Some(profile)) => profile,
            result => {
                if let Err(e) = result {
                    warn!(user_id = %remote.user_id, error = %e, "profile lookup failed");
                }
                if let Err(e) = self.backend.identity.sign_out().await {
                    warn!(error = %e, "sign out after missing profile");
                }
                return Err(ClientError::ProfileNotFound(remote.user_id));
            }
        };

        let session = self.session_for(profile).await;
        self.store.save(&session)?;
        info!(user_id = %session.user_id, role = %session.role, "logged in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Creates the identity, organization and manager profile. Returns the
    /// new session and the organization's join code.
    pub async fn signup_as_manager(&self, input: ManagerSignup) -> ClientResult<(Session, String)> {
        let (records, saga) = signup::create_manager(&self.backend, &input).await?;
        let session = Session::from_profile(records.profile, Some(records.organization_name));
        if let Err(e) = self.store.save(&session) {
            return Err(saga.abort(SignupStep::PersistSession, e).await);
        }
        debug!(user_id = %records.user_id, "manager session cached");
        self.publish(Some(session.clone()));
        Ok((session, records.join_code))
    }

    pub async fn signup_as_farmer(&self, input: FarmerSignup) -> ClientResult<Session> {
        let (profile, org_name, saga) = signup::create_farmer(&self.backend, &input).await?;
        let session = Session::from_profile(profile, Some(org_name));
        if let Err(e) = self.store.save(&session) {
            return Err(saga.abort(SignupStep::PersistSession, e).await);
        }
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Local state is cleared even when the remote sign-out fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let cleared = self.store.clear();
        if let Err(e) = self.backend.identity.sign_out().await {
            warn!(error = %e, "remote sign out failed");
        }
        self.publish(None);
        info!("logged out");
        cleared
    }

    /// Clears the session whenever the identity provider reports that the
    /// remote session ended. Runs until `cancel` fires.
    pub fn spawn_auth_listener(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut events = self.backend.identity.subscribe();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(AuthEvent::SignedOut) => manager.on_remote_sign_out().await,
                    Ok(other) => debug!(?other, "auth event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "auth listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("auth listener stopped");
        })
    }

    async fn on_remote_sign_out(&self) {
        if self.current().is_none() {
            return;
        }
        // a newer sign-in may already have replaced the ended session
        match self.backend.identity.current_session().await {
            Ok(Some(remote)) if self.current().is_some_and(|s| s.user_id == remote.user_id) => {
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "could not confirm remote session"),
        }
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "could not clear cached session");
        }
        self.publish(None);
        info!("remote session ended, signed out locally");
    }

    async fn rebuild(&self, user_id: &str) -> ClientResult<Session> {
        let profile = self
            .backend
            .data
            .profile_by_id(user_id)
            .await?
            .ok_or_else(|| ClientError::ProfileNotFound(user_id.to_string()))?;
        let session = self.session_for(profile).await;
        self.store.save(&session)?;
        Ok(session)
    }

    async fn session_for(&self, profile: Profile) -> Session {
        let org_name = match self
            .backend
            .data
            .organization_by_id(&profile.organization_id)
            .await
        {
            Ok(org) => org.map(|o| o.name),
            Err(e) => {
                warn!(organization_id = %profile.organization_id, error = %e, "organization name unavailable");
                None
            }
        };
        Session::from_profile(profile, org_name)
    }

    fn publish(&self, session: Option<Session>) {
        self.state.send_replace(session);
    }
}
