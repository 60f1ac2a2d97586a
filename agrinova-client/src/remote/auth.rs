use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::{ApiContext, check};
use crate::backend::{AuthEvent, IdentityProvider, RemoteSession, SignUpOutcome};
use crate::error::{ClientError, ClientResult};

const REFRESH_LEEWAY_SECS: i64 = 20;

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, fallback_email: &str) -> RemoteSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));
        RemoteSession {
            user_id: self.user.id,
            email: self.user.email.unwrap_or_else(|| fallback_email.to_string()),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Sign-up answers with a full token response, or with just the user while
/// the address awaits confirmation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

pub struct HostedIdentity {
    api: ApiContext,
    service_role_key: Option<String>,
    events: broadcast::Sender<AuthEvent>,
    refresh_guard: Mutex<()>,
}

impl HostedIdentity {
    pub(crate) fn new(api: ApiContext, service_role_key: Option<String>) -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self {
            api,
            service_role_key,
            events,
            refresh_guard: Mutex::new(()),
        }
    }

    async fn store(&self, session: &RemoteSession, event: AuthEvent) -> ClientResult<()> {
        self.api.tokens.set(session.clone()).await?;
        let _ = self.events.send(event);
        Ok(())
    }

    async fn drop_session(&self) -> ClientResult<()> {
        self.api.tokens.clear().await?;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn refresh(&self, current: &RemoteSession, refresh_token: &str) -> ClientResult<RemoteSession> {
        let resp = self
            .api
            .http
            .post(self.api.url("/auth/v1/token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.api.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = check(resp).await?.json().await?;
        Ok(token.into_session(&current.email))
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> ClientResult<SignUpOutcome> {
        let resp = self
            .api
            .http
            .post(self.api.url("/auth/v1/signup"))
            .header("apikey", &self.api.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: SignUpResponse = check(resp).await?.json().await?;

        match body {
            SignUpResponse::Session(token) => {
                let session = token.into_session(email);
                self.store(
                    &session,
                    AuthEvent::SignedIn {
                        user_id: session.user_id.clone(),
                    },
                )
                .await?;
                info!(user_id = %session.user_id, "identity created");
                Ok(SignUpOutcome {
                    user_id: session.user_id.clone(),
                    session: Some(session),
                })
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "identity created, awaiting confirmation");
                Ok(SignUpOutcome {
                    user_id: user.id,
                    session: None,
                })
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<RemoteSession> {
        let resp = self
            .api
            .http
            .post(self.api.url("/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = check(resp).await?.json().await?;
        let session = token.into_session(email);
        self.store(
            &session,
            AuthEvent::SignedIn {
                user_id: session.user_id.clone(),
            },
        )
        .await?;
        Ok(session)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        let Some(session) = self.api.tokens.get().await else {
            return Ok(());
        };
        let result = self
            .api
            .http
            .post(self.api.url("/auth/v1/logout"))
            .header("apikey", &self.api.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        // local tokens go regardless of what the server said
        self.drop_session().await?;

        match result {
            Ok(resp) => check(resp).await.map(|_| ()),
            Err(e) => Err(e.into()),
        }
    }

    async fn current_session(&self) -> ClientResult<Option<RemoteSession>> {
        let _guard = self.refresh_guard.lock().await;
        let Some(session) = self.api.tokens.get().await else {
            return Ok(None);
        };
        if !session.expires_soon(Duration::seconds(REFRESH_LEEWAY_SECS)) {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token.clone() else {
            debug!("session expired and cannot be refreshed");
            self.drop_session().await?;
            return Ok(None);
        };

        match self.refresh(&session, &refresh_token).await {
            Ok(fresh) => {
                self.store(
                    &fresh,
                    AuthEvent::TokenRefreshed {
                        user_id: fresh.user_id.clone(),
                    },
                )
                .await?;
                debug!(user_id = %fresh.user_id, "session refreshed");
                Ok(Some(fresh))
            }
            Err(e) if e.is_rejection() => {
                info!("refresh token rejected, session ended");
                self.drop_session().await?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "could not refresh session, keeping cached tokens");
                Ok(Some(session))
            }
        }
    }

    async fn delete_identity(&self, user_id: &str) -> ClientResult<()> {
        let key = self.service_role_key.as_deref().ok_or_else(|| {
            ClientError::Config("service_role_key is required to delete identities".into())
        })?;
        let resp = self
            .api
            .http
            .delete(self.api.url(&format!("/auth/v1/admin/users/{user_id}")))
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await?;
        check(resp).await?;

        if self
            .api
            .tokens
            .get()
            .await
            .is_some_and(|s| s.user_id == user_id)
        {
            self.drop_session().await?;
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
