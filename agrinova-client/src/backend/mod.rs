//! Seams to the hosted collaborators: identity, tables, object storage and the
//! weather provider. `remote` talks to the hosted backend over HTTP, `memory`
//! keeps everything in process for tests and offline demos.

use std::sync::Arc;

use agrinova_shared::{
    inventory::{InventoryItem, NewInventoryItem},
    org::{NewOrganization, Organization},
    pagination::Page,
    reports::{FarmReport, NewFarmReport},
    roles::Role,
    users::{NewProfile, Profile},
    weather::WeatherReport,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::ClientResult;

pub mod memory;

pub use memory::MemoryBackend;

/// Tokens of an authenticated identity, as handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl RemoteSession {
    pub fn expires_soon(&self, leeway: chrono::Duration) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() + leeway >= exp,
            None => false,
        }
    }
}

/// Result of creating an identity. Providers with email confirmation enabled
/// return no session until the address is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user_id: String,
    pub session: Option<RemoteSession>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    TokenRefreshed { user_id: String },
    SignedOut,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> ClientResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<RemoteSession>;

    async fn sign_out(&self) -> ClientResult<()>;

    /// The persisted remote session, refreshed if it is about to expire.
    async fn current_session(&self) -> ClientResult<Option<RemoteSession>>;

    /// Administrative removal, only used to undo a half-finished signup.
    async fn delete_identity(&self, user_id: &str) -> ClientResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Structured-data operations against the `organizations`, `profiles`,
/// `inventory` and `reports` collections. Listings are newest first.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn insert_organization(&self, org: &NewOrganization) -> ClientResult<Organization>;
    async fn organization_by_id(&self, id: &str) -> ClientResult<Option<Organization>>;
    async fn organization_by_join_code(&self, code: &str) -> ClientResult<Option<Organization>>;
    async fn delete_organization(&self, id: &str) -> ClientResult<()>;

    async fn insert_profile(&self, profile: &NewProfile) -> ClientResult<Profile>;
    async fn profile_by_id(&self, user_id: &str) -> ClientResult<Option<Profile>>;
    async fn delete_profile(&self, user_id: &str) -> ClientResult<()>;
    async fn list_profiles(
        &self,
        organization_id: &str,
        role: Option<Role>,
        page: Page,
    ) -> ClientResult<Vec<Profile>>;
    async fn count_profiles(&self, organization_id: &str, role: Option<Role>) -> ClientResult<u64>;

    async fn insert_inventory_item(&self, item: &NewInventoryItem) -> ClientResult<InventoryItem>;
    async fn list_inventory(&self, organization_id: &str, page: Page)
    -> ClientResult<Vec<InventoryItem>>;
    async fn count_inventory(&self, organization_id: &str) -> ClientResult<u64>;

    async fn insert_report(&self, report: &NewFarmReport) -> ClientResult<FarmReport>;
    async fn list_reports(&self, organization_id: &str, page: Page) -> ClientResult<Vec<FarmReport>>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `data` under `bucket/key`, replacing any existing object.
    /// Returns the stored object's path.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> ClientResult<String>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> ClientResult<WeatherReport>;
}

/// The four collaborators, bundled so they can be handed around together.
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityProvider>,
    pub data: Arc<dyn DataStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub weather: Arc<dyn WeatherProvider>,
}

impl Backend {
    /// Everything backed by one shared in-memory store. The concrete handle is
    /// returned as well so callers can seed data or inject failures.
    pub fn memory() -> (Self, Arc<MemoryBackend>) {
        let mem = Arc::new(MemoryBackend::new());
        let backend = Backend {
            identity: mem.clone(),
            data: mem.clone(),
            storage: mem.clone(),
            weather: mem.clone(),
        };
        (backend, mem)
    }

    pub fn remote(config: &Config) -> ClientResult<Self> {
        crate::remote::connect(config)
    }
}
