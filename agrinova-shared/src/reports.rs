use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `reports` collection. Reports are append-only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FarmReport {
    pub id: String,
    pub organization_id: String,
    pub section: String,
    pub activities: String,
    pub production_count: String,
    pub casualties: String,
    pub observations: String,
    pub weather: String,
    #[serde(default)]
    pub challenges: Option<String>,
    #[serde(default)]
    pub plans: Option<String>,
    #[serde(default)]
    pub inputs_used: Option<String>,
    #[serde(default)]
    pub sales_revenue: Option<String>,
    #[serde(default)]
    pub expenses_incurred: Option<String>,
    pub created_at: DateTime<Utc>,
    pub prepared_by: String,
}

// insert body for `reports`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewFarmReport {
    pub organization_id: String,
    pub section: String,
    pub activities: String,
    pub production_count: String,
    pub casualties: String,
    pub observations: String,
    pub weather: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenges: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plans: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_revenue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expenses_incurred: Option<String>,
    pub prepared_by: String,
    pub created_at: DateTime<Utc>,
}

impl NewFarmReport {
    pub fn into_report(self, id: String) -> FarmReport {
        FarmReport {
            id,
            organization_id: self.organization_id,
            section: self.section,
            activities: self.activities,
            production_count: self.production_count,
            casualties: self.casualties,
            observations: self.observations,
            weather: self.weather,
            challenges: self.challenges,
            plans: self.plans,
            inputs_used: self.inputs_used,
            sales_revenue: self.sales_revenue,
            expenses_incurred: self.expenses_incurred,
            created_at: self.created_at,
            prepared_by: self.prepared_by,
        }
    }
}
