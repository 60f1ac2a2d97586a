use agrinova_client::ClientError;
use agrinova_client::error::SignupStep;
use agrinova_shared::roles::Role;

use super::{ada, grace};
use crate::fake::FakeBackend;
use crate::helpers::{Client, E2EError, E2EResult};

#[tokio::test]
async fn test_manager_signup_creates_identity_org_and_profile() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let client = Client::connect(&fake)?;

    let (session, code) = client.sessions.signup_as_manager(grace()).await?;

    assert_eq!(session.role, Role::Manager);
    assert_eq!(session.organization_name.as_deref(), Some("Sunrise Farm"));
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let orgs = fake.rows("organizations");
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0]["farm_code"], code.as_str());
    assert_eq!(orgs[0]["id"], session.organization_id.as_str());

    let profiles = fake.rows("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["role"], "Manager");
    assert_eq!(profiles[0]["fullname"], "Grace Eze");

    let metadata = fake
        .user_metadata("grace@sunrise.farm")
        .ok_or_else(|| E2EError::Check("identity missing".into()))?;
    assert_eq!(metadata["role"], "Manager");
    assert_eq!(metadata["farm_code"], code.as_str());

    assert_eq!(client.sessions.current(), Some(session));
    Ok(())
}

#[tokio::test]
async fn test_farmer_joins_with_lowercase_code() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let manager = Client::connect(&fake)?;
    let (boss, code) = manager.sessions.signup_as_manager(grace()).await?;

    let farmer = Client::connect(&fake)?;
    let worker = farmer
        .sessions
        .signup_as_farmer(ada(&format!(" {} ", code.to_lowercase())))
        .await?;

    assert_eq!(worker.role, Role::Farmer);
    assert_eq!(worker.organization_id, boss.organization_id);
    assert_eq!(worker.organization_name.as_deref(), Some("Sunrise Farm"));
    assert_eq!(fake.user_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unknown_join_code_creates_nothing() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let farmer = Client::connect(&fake)?;

    let err = farmer
        .sessions
        .signup_as_farmer(ada("ZZZZ99"))
        .await
        .expect_err("unknown code must be rejected");

    assert!(matches!(err, ClientError::InvalidJoinCode(ref c) if c == "ZZZZ99"));
    assert_eq!(fake.user_count(), 0);
    assert!(fake.rows("profiles").is_empty());
    assert!(farmer.sessions.current().is_none());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_is_reported_before_any_rows() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let first = Client::connect(&fake)?;
    first.sessions.signup_as_manager(grace()).await?;

    let second = Client::connect(&fake)?;
    let mut again = grace();
    again.org_name = "Second Farm".into();
    let err = second
        .sessions
        .signup_as_manager(again)
        .await
        .expect_err("email already registered");

    match err {
        ClientError::Signup {
            step,
            message,
            orphaned,
        } => {
            assert_eq!(step, SignupStep::CreateIdentity);
            assert!(message.contains("User already registered"), "{message}");
            assert!(orphaned.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fake.rows("organizations").len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_profile_insert_rolls_everything_back() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    fake.fail_inserts_into("profiles");
    let client = Client::connect(&fake)?;

    let err = client
        .sessions
        .signup_as_manager(grace())
        .await
        .expect_err("profile insert fails");

    match err {
        ClientError::Signup { step, orphaned, .. } => {
            assert_eq!(step, SignupStep::CreateProfile);
            assert!(orphaned.is_empty(), "left behind: {orphaned:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fake.user_count(), 0);
    assert!(fake.rows("organizations").is_empty());
    assert!(client.sessions.current().is_none());
    assert!(client.backend.identity.current_session().await?.is_none());

    fake.clear_failures();
    let (session, _) = client.sessions.signup_as_manager(grace()).await?;
    assert_eq!(session.full_name, "Grace Eze");
    Ok(())
}

#[tokio::test]
async fn test_rollback_without_service_key_reports_orphaned_identity() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    fake.fail_inserts_into("profiles");
    let client = Client::connect_with(&fake, false)?;

    let err = client
        .sessions
        .signup_as_manager(grace())
        .await
        .expect_err("profile insert fails");

    let ClientError::Signup { orphaned, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(orphaned.len(), 1);
    assert!(orphaned[0].starts_with("identity "), "{orphaned:?}");
    assert!(err.to_string().contains("left behind"));

    assert_eq!(fake.user_count(), 1);
    assert!(fake.rows("organizations").is_empty());
    assert!(client.backend.identity.current_session().await?.is_none());
    Ok(())
}
