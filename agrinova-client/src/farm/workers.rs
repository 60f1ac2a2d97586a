use agrinova_shared::{roles::Role, users::Profile};

use super::{FarmData, retain_scoped};
use crate::error::ClientResult;
use crate::util::cache::CacheKey;

const COLLECTION: &str = "profiles";

impl FarmData {
    /// Farmers attached to the organization, by name.
    pub async fn fetch_workers(&self, organization_id: &str) -> ClientResult<Vec<Profile>> {
        let key = CacheKey::new(COLLECTION, organization_id).with_variant("workers");
        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }
        let generation = self.cache.generation(&key);

        let data = &self.data;
        let rows = self
            .fetch_all_pages(move |page| {
                data.list_profiles(organization_id, Some(Role::Farmer), page)
            })
            .await?;

        let mut rows = retain_scoped(rows, organization_id, COLLECTION, |p| &p.organization_id);
        rows.retain(Profile::is_worker);
        self.cache.put(key, generation, &rows);
        Ok(rows)
    }

    pub async fn fetch_worker_count(&self, organization_id: &str) -> ClientResult<u64> {
        let key = CacheKey::new(COLLECTION, organization_id).with_variant("worker-count");
        if let Some(count) = self.cache.get(&key) {
            return Ok(count);
        }
        let generation = self.cache.generation(&key);
        let count = self
            .run(
                self.data
                    .count_profiles(organization_id, Some(Role::Farmer)),
            )
            .await?;
        self.cache.put(key, generation, &count);
        Ok(count)
    }

    pub async fn fetch_organization_name(&self, organization_id: &str) -> ClientResult<Option<String>> {
        let org = self
            .run(self.data.organization_by_id(organization_id))
            .await?;
        Ok(org.map(|o| o.name))
    }
}
