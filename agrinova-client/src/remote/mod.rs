//! HTTP implementations of the backend seams, speaking the hosted
//! auth/rest/storage API and the weather API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::backend::{Backend, RemoteSession};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::util::persist;

pub mod auth;
pub mod rest;
pub mod storage;
pub mod weather;

pub use auth::HostedIdentity;
pub use rest::HostedTables;
pub use storage::HostedStorage;
pub use weather::WeatherApiClient;

pub fn connect(config: &Config) -> ClientResult<Backend> {
    connect_with(config, Some(Config::credentials_file_path()?))
}

/// Like [`connect`], but with an explicit token file. `None` keeps tokens in
/// memory only.
pub fn connect_with(config: &Config, credentials_path: Option<PathBuf>) -> ClientResult<Backend> {
    let base_url = config.backend_url()?.to_string();
    let http = get_client(
        config.trust_invalid_server_cert,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let tokens = Arc::new(TokenStore::open(credentials_path)?);
    let api = ApiContext {
        http: http.clone(),
        base_url,
        anon_key: config.anon_key.clone(),
        tokens: tokens.clone(),
    };

    Ok(Backend {
        identity: Arc::new(HostedIdentity::new(
            api.clone(),
            config.service_role_key.clone(),
        )),
        data: Arc::new(HostedTables::new(api.clone())),
        storage: Arc::new(HostedStorage::new(api)),
        weather: Arc::new(WeatherApiClient::new(
            http,
            &config.weather_api_url,
            config.weather_api_key.clone(),
        )),
    })
}

pub(crate) fn get_client(trust_invalid_server_cert: bool, timeout: Duration) -> ClientResult<Client> {
    let mut builder = Client::builder().timeout(timeout);
    // only for local stacks with self-signed certificates
    if trust_invalid_server_cert {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder
        .build()
        .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))
}

/// Remote tokens, in memory and optionally mirrored to a private file.
pub struct TokenStore {
    path: Option<PathBuf>,
    inner: RwLock<Option<RemoteSession>>,
}

impl TokenStore {
    pub fn open(path: Option<PathBuf>) -> ClientResult<Self> {
        let session = match &path {
            Some(p) => persist::read_json::<RemoteSession>(p)?,
            None => None,
        };
        Ok(Self {
            path,
            inner: RwLock::new(session),
        })
    }

    pub async fn get(&self) -> Option<RemoteSession> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, session: RemoteSession) -> ClientResult<()> {
        if let Some(path) = &self.path {
            persist::write_private_json(path, &session)?;
        }
        *self.inner.write().await = Some(session);
        Ok(())
    }

    pub async fn clear(&self) -> ClientResult<()> {
        *self.inner.write().await = None;
        if let Some(path) = &self.path {
            persist::remove_file(path)?;
        }
        Ok(())
    }
}

/// What every hosted call needs: the http client, the project URL and key,
/// and the signed-in user's tokens.
#[derive(Clone)]
pub(crate) struct ApiContext {
    pub http: Client,
    pub base_url: String,
    pub anon_key: String,
    pub tokens: Arc<TokenStore>,
}

impl ApiContext {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Adds the project key and the user's bearer token, falling back to the
    /// project key when nobody is signed in.
    pub async fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .tokens
            .get()
            .await
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone());
        rb.header("apikey", &self.anon_key).bearer_auth(bearer)
    }
}

/// Passes successful responses through and turns the rest into
/// [`ClientError::Remote`] carrying the server's own message.
pub(crate) async fn check(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.clone()
        }
    });
    if status.is_server_error() {
        warn!(status = status.as_u16(), %message, "remote call failed");
    } else {
        debug!(status = status.as_u16(), %message, "remote call rejected");
    }
    Err(ClientError::remote(status.as_u16(), message))
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["msg", "message", "error_description", "error"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(nested @ serde_json::Value::Object(_)) => {
                if let Some(s) = nested.get("message").and_then(|m| m.as_str()) {
                    return Some(s.to_string());
                }
            }
            _ => {}
        }
    }
    None
}
