use agrinova_shared::{
    pagination::Page,
    reports::{FarmReport, NewFarmReport},
    session::Session,
};
use chrono::Utc;
use tracing::info;

use super::{FarmData, retain_scoped};
use crate::auth::signup::missing;
use crate::error::{ClientError, ClientResult};
use crate::util::cache::CacheKey;

const COLLECTION: &str = "reports";

/// Fields of the daily report form. Blank optional fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub section: String,
    pub activities: String,
    pub production_count: String,
    pub casualties: String,
    pub observations: String,
    pub weather: String,
    pub challenges: Option<String>,
    pub plans: Option<String>,
    pub inputs_used: Option<String>,
    pub sales_revenue: Option<String>,
    pub expenses_incurred: Option<String>,
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ReportInput {
    fn into_new_report(self, session: &Session) -> ClientResult<NewFarmReport> {
        let fields = missing(&[
            ("section", &self.section),
            ("activities", &self.activities),
            ("production_count", &self.production_count),
            ("casualties", &self.casualties),
            ("observations", &self.observations),
            ("weather", &self.weather),
        ]);
        if !fields.is_empty() {
            return Err(ClientError::MissingFields(fields));
        }
        Ok(NewFarmReport {
            organization_id: session.organization_id.clone(),
            section: self.section.trim().to_string(),
            activities: self.activities.trim().to_string(),
            production_count: self.production_count.trim().to_string(),
            casualties: self.casualties.trim().to_string(),
            observations: self.observations.trim().to_string(),
            weather: self.weather.trim().to_string(),
            challenges: optional(self.challenges),
            plans: optional(self.plans),
            inputs_used: optional(self.inputs_used),
            sales_revenue: optional(self.sales_revenue),
            expenses_incurred: optional(self.expenses_incurred),
            prepared_by: session.full_name.clone(),
            created_at: Utc::now(),
        })
    }
}

impl FarmData {
    /// Every report of the organization, newest first.
    pub async fn fetch_farm_reports(&self, organization_id: &str) -> ClientResult<Vec<FarmReport>> {
        let key = CacheKey::new(COLLECTION, organization_id).with_variant("all");
        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }
        let generation = self.cache.generation(&key);

        let data = &self.data;
        let rows = self
            .fetch_all_pages(move |page| data.list_reports(organization_id, page))
            .await?;

        let rows = retain_scoped(rows, organization_id, COLLECTION, |r| &r.organization_id);
        self.cache.put(key, generation, &rows);
        Ok(rows)
    }

    pub async fn fetch_farm_reports_page(
        &self,
        organization_id: &str,
        page: Page,
    ) -> ClientResult<Vec<FarmReport>> {
        let key = CacheKey::new(COLLECTION, organization_id)
            .with_variant(format!("{}:{}", page.offset(), page.limit()));
        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows);
        }
        let generation = self.cache.generation(&key);
        let rows = self
            .run(self.data.list_reports(organization_id, page))
            .await?;
        let rows = retain_scoped(rows, organization_id, COLLECTION, |r| &r.organization_id);
        self.cache.put(key, generation, &rows);
        Ok(rows)
    }

    pub async fn add_farm_report(&self, session: &Session, input: ReportInput) -> ClientResult<FarmReport> {
        let report = input.into_new_report(session)?;
        let report = self.run(self.data.insert_report(&report)).await?;
        self.cache.invalidate(COLLECTION, &session.organization_id);
        info!(report_id = %report.id, section = %report.section, "farm report filed");
        Ok(report)
    }
}
