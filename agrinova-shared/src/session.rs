use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::users::Profile;

/// The locally cached authenticated identity, bound to one organization.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub organization_id: String,
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub join_code: Option<String>,
}

impl Session {
    pub fn from_profile(profile: Profile, organization_name: Option<String>) -> Self {
        Session {
            user_id: profile.id,
            email: profile.email,
            role: profile.role,
            full_name: profile.full_name,
            organization_id: profile.organization_id,
            organization_name: organization_name.or(profile.farm_name),
            phone: profile.phone,
            join_code: profile.join_code,
        }
    }
}

/// Which group of screens the UI should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenStack {
    Unauthenticated,
    Authenticated,
}

impl ScreenStack {
    pub fn for_session(session: Option<&Session>) -> Self {
        match session {
            Some(_) => ScreenStack::Authenticated,
            None => ScreenStack::Unauthenticated,
        }
    }
}
