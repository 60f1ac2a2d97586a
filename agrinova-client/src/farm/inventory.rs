use std::collections::HashMap;

use agrinova_shared::{
    inventory::{InventoryItem, NewInventoryItem, Unit},
    pagination::Page,
    session::Session,
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use tracing::{debug, info};

use super::photos::INVENTORY_BUCKET;
use super::{FarmData, retain_scoped};
use crate::auth::signup::missing;
use crate::error::{ClientError, ClientResult};
use crate::util::cache::CacheKey;

const COLLECTION: &str = "inventory";
const NAME_LOOKUP_CONCURRENCY: usize = 4;
pub const UNKNOWN_UPLOADER: &str = "Unknown";

/// Fields of the add-item form, as typed.
#[derive(Debug, Clone, Default)]
pub struct InventoryInput {
    pub name: String,
    pub quantity: String,
    pub unit: String,
    pub photo: Option<Bytes>,
}

impl InventoryInput {
    fn validate(&self) -> ClientResult<(String, i64, Unit)> {
        let fields = missing(&[
            ("name", &self.name),
            ("quantity", &self.quantity),
            ("unit", &self.unit),
        ]);
        if !fields.is_empty() {
            return Err(ClientError::MissingFields(fields));
        }
        let quantity = self
            .quantity
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|q| *q >= 0)
            .ok_or_else(|| {
                ClientError::InvalidInput(format!(
                    "quantity must be a non-negative whole number, got '{}'",
                    self.quantity.trim()
                ))
            })?;
        let unit: Unit = self.unit.parse().map_err(ClientError::InvalidInput)?;
        Ok((self.name.trim().to_string(), quantity, unit))
    }
}

impl FarmData {
    /// Every item of the organization, newest first.
    pub async fn fetch_inventory(&self, organization_id: &str) -> ClientResult<Vec<InventoryItem>> {
        let key = CacheKey::new(COLLECTION, organization_id).with_variant("all");
        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }
        let generation = self.cache.generation(&key);

        let data = &self.data;
        let rows = self
            .fetch_all_pages(move |page| data.list_inventory(organization_id, page))
            .await?;

        let rows = retain_scoped(rows, organization_id, COLLECTION, |i| &i.organization_id);
        debug!(organization_id, count = rows.len(), "inventory fetched");
        self.cache.put(key, generation, &rows);
        Ok(rows)
    }

    pub async fn fetch_inventory_page(
        &self,
        organization_id: &str,
        page: Page,
    ) -> ClientResult<Vec<InventoryItem>> {
        let key = CacheKey::new(COLLECTION, organization_id)
            .with_variant(format!("{}:{}", page.offset(), page.limit()));
        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }
        let generation = self.cache.generation(&key);
        let rows = self
            .run(self.data.list_inventory(organization_id, page))
            .await?;
        let rows = retain_scoped(rows, organization_id, COLLECTION, |i| &i.organization_id);
        self.cache.put(key, generation, &rows);
        Ok(rows)
    }

    pub async fn count_inventory(&self, organization_id: &str) -> ClientResult<u64> {
        let key = CacheKey::new(COLLECTION, organization_id).with_variant("count");
        if let Some(count) = self.cache.get(&key) {
            return Ok(count);
        }
        let generation = self.cache.generation(&key);
        let count = self.run(self.data.count_inventory(organization_id)).await?;
        self.cache.put(key, generation, &count);
        Ok(count)
    }

    /// Validates the form, uploads the optional photo and records the item
    /// under the session's organization.
    pub async fn add_inventory_item(
        &self,
        session: &Session,
        input: InventoryInput,
    ) -> ClientResult<InventoryItem> {
        let (name, quantity, unit) = input.validate()?;

        let image_url = match input.photo {
            Some(photo) => Some(
                self.upload_photo(INVENTORY_BUCKET, &session.user_id, "inventory", photo)
                    .await?,
            ),
            None => None,
        };

        let item = self
            .run(self.data.insert_inventory_item(&NewInventoryItem {
                name,
                quantity,
                unit: unit.symbol().to_string(),
                organization_id: session.organization_id.clone(),
                created_by: session.user_id.clone(),
                image_url,
            }))
            .await?;
        self.cache.invalidate(COLLECTION, &session.organization_id);
        info!(item_id = %item.id, organization_id = %item.organization_id, "inventory item added");
        Ok(item)
    }

    /// Resolves the `created_by` ids of `items` to display names, filling
    /// `names` in place. Ids already present are not looked up again.
    pub async fn fetch_uploader_names(
        &self,
        items: &[InventoryItem],
        names: &mut HashMap<String, String>,
    ) -> ClientResult<()> {
        let mut wanted: Vec<&str> = items
            .iter()
            .map(|i| i.created_by.as_str())
            .filter(|id| !names.contains_key(*id))
            .collect();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(());
        }

        let lookups = stream::iter(wanted)
            .map(|id| async move {
                let name = match self.data.profile_by_id(id).await {
                    Ok(Some(profile)) => profile.full_name,
                    Ok(None) => UNKNOWN_UPLOADER.to_string(),
                    Err(e) => {
                        debug!(user_id = id, error = %e, "uploader lookup failed");
                        UNKNOWN_UPLOADER.to_string()
                    }
                };
                (id.to_string(), name)
            })
            .buffer_unordered(NAME_LOOKUP_CONCURRENCY)
            .collect::<Vec<_>>();

        let resolved = self.run(async { Ok(lookups.await) }).await?;
        names.extend(resolved);
        Ok(())
    }
}
