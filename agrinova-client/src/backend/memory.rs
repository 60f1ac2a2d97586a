use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

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
use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::{
    AuthEvent, DataStore, IdentityProvider, ObjectStorage, RemoteSession, SignUpOutcome,
    WeatherProvider,
};
use crate::error::{ClientError, ClientResult};

const MIN_PASSWORD_LEN: usize = 6;

/// Operations that can be told to fail, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    SignUp,
    SignIn,
    SignOut,
    DeleteIdentity,
    InsertOrganization,
    DeleteOrganization,
    InsertProfile,
    ProfileLookup,
    InsertInventory,
    InsertReport,
    Upload,
}

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    email: String,
    password: String,
    metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct Tables {
    organizations: Vec<Organization>,
    profiles: Vec<Profile>,
    inventory: Vec<InventoryItem>,
    reports: Vec<FarmReport>,
}

/// In-process stand-in for the hosted backend.
pub struct MemoryBackend {
    accounts: RwLock<HashMap<String, Account>>,
    active: RwLock<Option<RemoteSession>>,
    tables: RwLock<Tables>,
    objects: RwLock<HashMap<String, StoredObject>>,
    weather: RwLock<HashMap<String, WeatherReport>>,
    failures: Mutex<HashSet<FailPoint>>,
    latency: Mutex<Option<Duration>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(16);
        Self {
            accounts: RwLock::new(HashMap::new()),
            active: RwLock::new(None),
            tables: RwLock::new(Tables::default()),
            objects: RwLock::new(HashMap::new()),
            weather: RwLock::new(HashMap::new()),
            failures: Mutex::new(HashSet::new()),
            latency: Mutex::new(None),
            events,
        }
    }

    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(point);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    /// Every data-store call sleeps this long before answering.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.lock() {
            *slot = latency;
        }
    }

    pub async fn seed_weather(&self, city: &str, report: WeatherReport) {
        self.weather
            .write()
            .await
            .insert(city.to_lowercase(), report);
    }

    /// Drops the active remote session the way a server-side revocation would.
    pub async fn revoke_remote_session(&self) {
        *self.active.write().await = None;
        let _ = self.events.send(AuthEvent::SignedOut);
    }

    pub async fn has_remote_session(&self) -> bool {
        self.active.read().await.is_some()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn account_metadata(&self, email: &str) -> Option<serde_json::Value> {
        self.accounts
            .read()
            .await
            .get(&email.to_lowercase())
            .map(|a| a.metadata.clone())
    }

    pub async fn organizations(&self) -> Vec<Organization> {
        self.tables.read().await.organizations.clone()
    }

    pub async fn profiles(&self) -> Vec<Profile> {
        self.tables.read().await.profiles.clone()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&format!("{bucket}/{key}"))
            .cloned()
    }

    fn check(&self, point: FailPoint) -> ClientResult<()> {
        let failing = self
            .failures
            .lock()
            .map(|f| f.contains(&point))
            .unwrap_or(false);
        if failing {
            return Err(ClientError::remote(
                500,
                format!("injected failure: {:?}", point),
            ));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn issue_session(account: &Account) -> RemoteSession {
        RemoteSession {
            user_id: account.user_id.clone(),
            email: account.email.clone(),
            access_token: format!("mem-access-{}", Uuid::new_v4()),
            refresh_token: Some(format!("mem-refresh-{}", Uuid::new_v4())),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> ClientResult<SignUpOutcome> {
        self.check(FailPoint::SignUp)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ClientError::remote(
                422,
                "Password should be at least 6 characters",
            ));
        }

        let mut accounts = self.accounts.write().await;
        let key = email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(ClientError::remote(422, "User already registered"));
        }

        let account = Account {
            user_id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
            metadata,
        };
        let session = Self::issue_session(&account);
        let user_id = account.user_id.clone();
        accounts.insert(key, account);
        drop(accounts);

        *self.active.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn {
            user_id: user_id.clone(),
        });

        Ok(SignUpOutcome {
            user_id,
            session: Some(session),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<RemoteSession> {
        self.check(FailPoint::SignIn)?;
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&email.to_lowercase())
            .filter(|a| a.password == password)
            .ok_or_else(|| ClientError::remote(400, "Invalid login credentials"))?;

        let session = Self::issue_session(account);
        drop(accounts);

        *self.active.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn {
            user_id: session.user_id.clone(),
        });
        Ok(session)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        self.check(FailPoint::SignOut)?;
        *self.active.write().await = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn current_session(&self) -> ClientResult<Option<RemoteSession>> {
        Ok(self.active.read().await.clone())
    }

    async fn delete_identity(&self, user_id: &str) -> ClientResult<()> {
        self.check(FailPoint::DeleteIdentity)?;
        self.accounts
            .write()
            .await
            .retain(|_, account| account.user_id != user_id);

        let mut active = self.active.write().await;
        if active.as_ref().is_some_and(|s| s.user_id == user_id) {
            *active = None;
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

fn newest_first<T, F>(rows: impl DoubleEndedIterator<Item = T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    // reversed insertion order breaks ties between equal timestamps
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl DataStore for MemoryBackend {
    async fn insert_organization(&self, org: &NewOrganization) -> ClientResult<Organization> {
        self.simulate_latency().await;
        self.check(FailPoint::InsertOrganization)?;
        let mut tables = self.tables.write().await;
        if tables
            .organizations
            .iter()
            .any(|o| o.join_code == org.join_code)
        {
            return Err(ClientError::remote(
                409,
                "duplicate key value violates unique constraint \"organizations_farm_code_key\"",
            ));
        }
        let row = Organization {
            id: Uuid::new_v4().to_string(),
            name: org.name.clone(),
            address: org.address.clone(),
            join_code: org.join_code.clone(),
            created_at: Some(Utc::now()),
        };
        tables.organizations.push(row.clone());
        Ok(row)
    }

    async fn organization_by_id(&self, id: &str) -> ClientResult<Option<Organization>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        Ok(tables.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn organization_by_join_code(&self, code: &str) -> ClientResult<Option<Organization>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        Ok(tables
            .organizations
            .iter()
            .find(|o| o.join_code == code)
            .cloned())
    }

    async fn delete_organization(&self, id: &str) -> ClientResult<()> {
        self.check(FailPoint::DeleteOrganization)?;
        self.tables
            .write()
            .await
            .organizations
            .retain(|o| o.id != id);
        Ok(())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> ClientResult<Profile> {
        self.simulate_latency().await;
        self.check(FailPoint::InsertProfile)?;
        let mut tables = self.tables.write().await;
        if tables.profiles.iter().any(|p| p.id == profile.id) {
            return Err(ClientError::remote(
                409,
                "duplicate key value violates unique constraint \"profiles_pkey\"",
            ));
        }
        let row = profile.clone().into_profile(Some(Utc::now()));
        tables.profiles.push(row.clone());
        Ok(row)
    }

    async fn profile_by_id(&self, user_id: &str) -> ClientResult<Option<Profile>> {
        self.simulate_latency().await;
        self.check(FailPoint::ProfileLookup)?;
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn delete_profile(&self, user_id: &str) -> ClientResult<()> {
        self.tables
            .write()
            .await
            .profiles
            .retain(|p| p.id != user_id);
        Ok(())
    }

    async fn list_profiles(
        &self,
        organization_id: &str,
        role: Option<Role>,
        page: Page,
    ) -> ClientResult<Vec<Profile>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let mut rows: Vec<Profile> = tables
            .profiles
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .filter(|p| role.is_none_or(|r| p.role == r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(page.slice(rows))
    }

    async fn count_profiles(&self, organization_id: &str, role: Option<Role>) -> ClientResult<u64> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .filter(|p| role.is_none_or(|r| p.role == r))
            .count() as u64)
    }

    async fn insert_inventory_item(&self, item: &NewInventoryItem) -> ClientResult<InventoryItem> {
        self.simulate_latency().await;
        self.check(FailPoint::InsertInventory)?;
        let row = item
            .clone()
            .into_item(Uuid::new_v4().to_string(), Utc::now());
        self.tables.write().await.inventory.push(row.clone());
        Ok(row)
    }

    async fn list_inventory(
        &self,
        organization_id: &str,
        page: Page,
    ) -> ClientResult<Vec<InventoryItem>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let rows = newest_first(
            tables
                .inventory
                .iter()
                .filter(|i| i.organization_id == organization_id)
                .cloned(),
            |i| i.created_at,
        );
        Ok(page.slice(rows))
    }

    async fn count_inventory(&self, organization_id: &str) -> ClientResult<u64> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        Ok(tables
            .inventory
            .iter()
            .filter(|i| i.organization_id == organization_id)
            .count() as u64)
    }

    async fn insert_report(&self, report: &NewFarmReport) -> ClientResult<FarmReport> {
        self.simulate_latency().await;
        self.check(FailPoint::InsertReport)?;
        let row = report.clone().into_report(Uuid::new_v4().to_string());
        self.tables.write().await.reports.push(row.clone());
        Ok(row)
    }

    async fn list_reports(&self, organization_id: &str, page: Page) -> ClientResult<Vec<FarmReport>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let rows = newest_first(
            tables
                .reports
                .iter()
                .filter(|r| r.organization_id == organization_id)
                .cloned(),
            |r| r.created_at,
        );
        Ok(page.slice(rows))
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> ClientResult<String> {
        self.check(FailPoint::Upload)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let path = format!("{bucket}/{key}");
        self.objects.write().await.insert(
            path.clone(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(path)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://public/{bucket}/{key}")
    }
}

#[async_trait]
impl WeatherProvider for MemoryBackend {
    async fn current(&self, city: &str) -> ClientResult<WeatherReport> {
        self.weather
            .read()
            .await
            .get(&city.to_lowercase())
            .cloned()
            .ok_or_else(|| ClientError::remote(400, "No matching location found."))
    }
}
