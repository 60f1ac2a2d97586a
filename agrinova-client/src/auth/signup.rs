//! Multi-step account creation. Every remote record created along the way is
//! remembered so it can be removed again if a later step fails.

use agrinova_shared::{
    org::{NewOrganization, generate_join_code, normalize_join_code},
    roles::Role,
    users::NewProfile,
};
use serde_json::json;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{ClientError, ClientResult, SignupStep};

const JOIN_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ManagerSignup {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub org_name: String,
    pub phone: String,
    pub org_address: String,
}

impl ManagerSignup {
    fn missing_fields(&self) -> Vec<&'static str> {
        missing(&[
            ("email", &self.email),
            ("password", &self.password),
            ("full_name", &self.full_name),
            ("org_name", &self.org_name),
            ("phone", &self.phone),
            ("org_address", &self.org_address),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct FarmerSignup {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub join_code: String,
}

impl FarmerSignup {
    fn missing_fields(&self) -> Vec<&'static str> {
        missing(&[
            ("email", &self.email),
            ("password", &self.password),
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("join_code", &self.join_code),
        ])
    }
}

pub(crate) fn missing(fields: &[(&'static str, &String)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

#[derive(Debug, Clone)]
enum Compensation {
    Identity(String),
    Organization(String),
    Profile(String),
}

/// Records completed steps and undoes them, newest first, on failure.
pub(crate) struct Saga<'a> {
    backend: &'a Backend,
    done: Vec<Compensation>,
}

impl<'a> Saga<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self {
            backend,
            done: Vec::new(),
        }
    }

    fn record(&mut self, step: Compensation) {
        self.done.push(step);
    }

    /// Rolls back and builds the error the caller sees. Records that could
    /// not be removed are listed as orphaned.
    pub async fn abort(self, step: SignupStep, cause: ClientError) -> ClientError {
        warn!(%step, error = %cause, "signup failed, rolling back");
        let mut orphaned = Vec::new();
        let mut had_identity = false;

        for comp in self.done.into_iter().rev() {
            let (label, result) = match &comp {
                Compensation::Profile(id) => (
                    format!("profile {id}"),
                    self.backend.data.delete_profile(id).await,
                ),
                Compensation::Organization(id) => (
                    format!("organization {id}"),
                    self.backend.data.delete_organization(id).await,
                ),
                Compensation::Identity(id) => {
                    had_identity = true;
                    (
                        format!("identity {id}"),
                        self.backend.identity.delete_identity(id).await,
                    )
                }
            };
            match result {
                Ok(()) => info!(record = %label, "rolled back"),
                Err(e) => {
                    warn!(record = %label, error = %e, "rollback failed");
                    orphaned.push(label);
                }
            }
        }

        if had_identity {
            if let Err(e) = self.backend.identity.sign_out().await {
                warn!(error = %e, "sign out after failed signup");
            }
        }

        ClientError::Signup {
            step,
            message: cause.to_string(),
            orphaned,
        }
    }
}

/// Remote records created by a successful manager signup.
pub(crate) struct ManagerRecords {
    pub user_id: String,
    pub organization_name: String,
    pub join_code: String,
    pub profile: agrinova_shared::users::Profile,
}

pub(crate) async fn create_manager<'a>(
    backend: &'a Backend,
    input: &ManagerSignup,
) -> Result<(ManagerRecords, Saga<'a>), ClientError> {
    let fields = input.missing_fields();
    if !fields.is_empty() {
        return Err(ClientError::MissingFields(fields));
    }
    let mut saga = Saga::new(backend);

    let join_code = match reserve_join_code(backend).await {
        Ok(code) => code,
        Err(e) => return Err(saga.abort(SignupStep::ReserveJoinCode, e).await),
    };

    let metadata = json!({
        "fullname": input.full_name,
        "phone": input.phone,
        "role": Role::Manager.as_str(),
        "farm_code": join_code,
        "name": input.org_name,
        "address": input.org_address,
    });
    let outcome = match backend
        .identity
        .sign_up(input.email.trim(), &input.password, metadata)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return Err(saga.abort(SignupStep::CreateIdentity, e).await),
    };
    saga.record(Compensation::Identity(outcome.user_id.clone()));

    let org = match backend
        .data
        .insert_organization(&NewOrganization {
            name: input.org_name.trim().to_string(),
            address: input.org_address.trim().to_string(),
            join_code: join_code.clone(),
        })
        .await
    {
        Ok(org) => org,
        Err(e) => return Err(saga.abort(SignupStep::CreateOrganization, e).await),
    };
    saga.record(Compensation::Organization(org.id.clone()));

    let profile = match backend
        .data
        .insert_profile(&NewProfile {
            id: outcome.user_id.clone(),
            email: input.email.trim().to_string(),
            full_name: input.full_name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            role: Role::Manager,
            organization_id: org.id.clone(),
            farm_name: Some(org.name.clone()),
            farm_address: Some(org.address.clone()),
            join_code: Some(join_code.clone()),
        })
        .await
    {
        Ok(profile) => profile,
        Err(e) => return Err(saga.abort(SignupStep::CreateProfile, e).await),
    };
    saga.record(Compensation::Profile(profile.id.clone()));

    info!(user_id = %outcome.user_id, organization_id = %org.id, "manager account created");
    Ok((
        ManagerRecords {
            user_id: outcome.user_id,
            organization_name: org.name,
            join_code,
            profile,
        },
        saga,
    ))
}

pub(crate) async fn create_farmer<'a>(
    backend: &'a Backend,
    input: &FarmerSignup,
) -> Result<(agrinova_shared::users::Profile, String, Saga<'a>), ClientError> {
    let fields = input.missing_fields();
    if !fields.is_empty() {
        return Err(ClientError::MissingFields(fields));
    }
    let code = normalize_join_code(&input.join_code);
    let mut saga = Saga::new(backend);

    // nothing is created until the code resolves
    let org = match backend.data.organization_by_join_code(&code).await {
        Ok(Some(org)) => org,
        Ok(None) => return Err(ClientError::InvalidJoinCode(code)),
        Err(e) if e.is_rejection() => return Err(ClientError::InvalidJoinCode(code)),
        Err(e) => return Err(saga.abort(SignupStep::LookupOrganization, e).await),
    };

    let metadata = json!({
        "fullname": input.full_name,
        "phone": input.phone,
        "role": Role::Farmer.as_str(),
        "farm_code": code,
    });
    let outcome = match backend
        .identity
        .sign_up(input.email.trim(), &input.password, metadata)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return Err(saga.abort(SignupStep::CreateIdentity, e).await),
    };
    saga.record(Compensation::Identity(outcome.user_id.clone()));

    let profile = match backend
        .data
        .insert_profile(&NewProfile {
            id: outcome.user_id.clone(),
            email: input.email.trim().to_string(),
            full_name: input.full_name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            role: Role::Farmer,
            organization_id: org.id.clone(),
            farm_name: None,
            farm_address: None,
            join_code: Some(code),
        })
        .await
    {
        Ok(profile) => profile,
        Err(e) => return Err(saga.abort(SignupStep::CreateProfile, e).await),
    };
    saga.record(Compensation::Profile(profile.id.clone()));

    info!(user_id = %outcome.user_id, organization_id = %org.id, "farmer account created");
    Ok((profile, org.name, saga))
}

/// Draws codes until one is not taken yet.
async fn reserve_join_code(backend: &Backend) -> ClientResult<String> {
    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = generate_join_code();
        if backend.data.organization_by_join_code(&code).await?.is_none() {
            return Ok(code);
        }
        warn!(code = %code, "join code already taken, drawing another");
    }
    Err(ClientError::InvalidInput(format!(
        "no free join code after {JOIN_CODE_ATTEMPTS} attempts"
    )))
}
