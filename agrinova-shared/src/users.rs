use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Row of the `profiles` collection. `id` is the identity provider's user id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(rename = "fullname")]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub organization_id: String,
    #[serde(default)]
    pub farm_name: Option<String>,
    #[serde(default)]
    pub farm_address: Option<String>,
    #[serde(default, rename = "farm_code")]
    pub join_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_worker(&self) -> bool {
        self.role == Role::Farmer
    }
}

// insert body for `profiles`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub phone: String,
    pub role: Role,
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_address: Option<String>,
    #[serde(rename = "farm_code", skip_serializing_if = "Option::is_none")]
    pub join_code: Option<String>,
}

impl NewProfile {
    pub fn into_profile(self, created_at: Option<DateTime<Utc>>) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            phone: Some(self.phone),
            role: self.role,
            organization_id: self.organization_id,
            farm_name: self.farm_name,
            farm_address: self.farm_address,
            join_code: self.join_code,
            created_at,
        }
    }
}
