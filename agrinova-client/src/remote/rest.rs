use agrinova_shared::{
    inventory::{InventoryItem, NewInventoryItem},
    org::{NewOrganization, Organization},
    pagination::Page,
    reports::{FarmReport, NewFarmReport},
    roles::Role,
    users::{NewProfile, Profile},
};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_RANGE;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::{ApiContext, check};
use crate::backend::DataStore;
use crate::error::{ClientError, ClientResult};

const ORGANIZATIONS: &str = "organizations";
const PROFILES: &str = "profiles";
const INVENTORY: &str = "inventory";
const REPORTS: &str = "reports";

/// Table access through the hosted REST interface.
pub struct HostedTables {
    api: ApiContext,
}

/// Query-string filters and modifiers for one table request.
#[derive(Debug, Default, Clone)]
struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    fn eq(mut self, column: &str, value: &str) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Adds a sort key. Later calls break ties left by earlier ones.
    fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        let key = format!("{column}.{dir}");
        match self.params.iter_mut().find(|(k, _)| k == "order") {
            Some((_, keys)) => {
                keys.push(',');
                keys.push_str(&key);
            }
            None => self.params.push(("order".into(), key)),
        }
        self
    }

    fn page(mut self, page: Page) -> Self {
        self.params.push(("limit".into(), page.limit().to_string()));
        self.params.push(("offset".into(), page.offset().to_string()));
        self
    }

    fn select(mut self) -> Self {
        self.params.insert(0, ("select".into(), "*".into()));
        self
    }
}

impl HostedTables {
    pub(crate) fn new(api: ApiContext) -> Self {
        Self { api }
    }

    async fn request(&self, method: Method, table: &str, query: &Query) -> reqwest::RequestBuilder {
        let rb = self
            .api
            .http
            .request(method, self.api.url(&format!("/rest/v1/{table}")))
            .query(&query.params);
        self.api.authed(rb).await
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> ClientResult<Vec<T>> {
        debug!(table, "select");
        let resp = self
            .request(Method::GET, table, &query.select())
            .await
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, query: Query) -> ClientResult<Option<T>> {
        let rows = self
            .select::<T>(table, query.page(Page::new(0, 1)))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(&self, table: &str, body: &B) -> ClientResult<T> {
        debug!(table, "insert");
        let resp = self
            .request(Method::POST, table, &Query::default())
            .await
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = check(resp).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::Decode(format!("insert into {table} returned no row")))
    }

    async fn delete(&self, table: &str, query: Query) -> ClientResult<()> {
        debug!(table, "delete");
        let resp = self.request(Method::DELETE, table, &query).await.send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn count(&self, table: &str, query: Query) -> ClientResult<u64> {
        let resp = self
            .request(Method::HEAD, table, &query.select())
            .await
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check(resp).await?;
        let range = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ClientError::Decode("missing Content-Range header".into()))?;
        parse_content_range_total(range)
    }

    fn profile_filter(organization_id: &str, role: Option<Role>) -> Query {
        let query = Query::default().eq("organization_id", organization_id);
        match role {
            Some(role) => query.eq("role", role.as_str()),
            None => query,
        }
    }
}

/// Total from a `Content-Range` value such as `0-24/312` or `*/0`.
fn parse_content_range_total(value: &str) -> ClientResult<u64> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| ClientError::Decode(format!("bad Content-Range: {value}")))
}

#[async_trait]
impl DataStore for HostedTables {
    async fn insert_organization(&self, org: &NewOrganization) -> ClientResult<Organization> {
        self.insert(ORGANIZATIONS, org).await
    }

    async fn organization_by_id(&self, id: &str) -> ClientResult<Option<Organization>> {
        self.select_one(ORGANIZATIONS, Query::default().eq("id", id))
            .await
    }

    async fn organization_by_join_code(&self, code: &str) -> ClientResult<Option<Organization>> {
        self.select_one(ORGANIZATIONS, Query::default().eq("farm_code", code))
            .await
    }

    async fn delete_organization(&self, id: &str) -> ClientResult<()> {
        self.delete(ORGANIZATIONS, Query::default().eq("id", id))
            .await
    }

    async fn insert_profile(&self, profile: &NewProfile) -> ClientResult<Profile> {
        self.insert(PROFILES, profile).await
    }

    async fn profile_by_id(&self, user_id: &str) -> ClientResult<Option<Profile>> {
        self.select_one(PROFILES, Query::default().eq("id", user_id))
            .await
    }

    async fn delete_profile(&self, user_id: &str) -> ClientResult<()> {
        self.delete(PROFILES, Query::default().eq("id", user_id))
            .await
    }

    async fn list_profiles(
        &self,
        organization_id: &str,
        role: Option<Role>,
        page: Page,
    ) -> ClientResult<Vec<Profile>> {
        let query = Self::profile_filter(organization_id, role)
            .order("fullname", true)
            .order("id", true)
            .page(page);
        self.select(PROFILES, query).await
    }

    async fn count_profiles(&self, organization_id: &str, role: Option<Role>) -> ClientResult<u64> {
        self.count(PROFILES, Self::profile_filter(organization_id, role))
            .await
    }

    async fn insert_inventory_item(&self, item: &NewInventoryItem) -> ClientResult<InventoryItem> {
        self.insert(INVENTORY, item).await
    }

    async fn list_inventory(
        &self,
        organization_id: &str,
        page: Page,
    ) -> ClientResult<Vec<InventoryItem>> {
        let query = Query::default()
            .eq("organization_id", organization_id)
            .order("created_at", false)
            .order("id", false)
            .page(page);
        self.select(INVENTORY, query).await
    }

    async fn count_inventory(&self, organization_id: &str) -> ClientResult<u64> {
        self.count(
            INVENTORY,
            Query::default().eq("organization_id", organization_id),
        )
        .await
    }

    async fn insert_report(&self, report: &NewFarmReport) -> ClientResult<FarmReport> {
        self.insert(REPORTS, report).await
    }

    async fn list_reports(&self, organization_id: &str, page: Page) -> ClientResult<Vec<FarmReport>> {
        let query = Query::default()
            .eq("organization_id", organization_id)
            .order("created_at", false)
            .order("id", false)
            .page(page);
        self.select(REPORTS, query).await
    }
}
