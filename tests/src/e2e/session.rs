use std::time::Duration;

use agrinova_client::ClientError;
use agrinova_shared::roles::Role;
use agrinova_shared::session::ScreenStack;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::grace;
use crate::fake::FakeBackend;
use crate::helpers::{Client, E2EError, E2EResult, wait_for_logout};

#[tokio::test]
async fn test_session_survives_restart_until_logout() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let client = Client::connect(&fake)?;
    let (session, _) = client.sessions.signup_as_manager(grace()).await?;

    let Client { dir, .. } = client;
    let restarted = Client::reopen(&fake, dir, true)?;
    let restored = restarted.sessions.initialize().await?;
    assert_eq!(restored.as_ref(), Some(&session));
    assert_eq!(restarted.sessions.stack(), ScreenStack::for_session(Some(&session)));

    restarted.sessions.logout().await?;
    assert!(restarted.sessions.current().is_none());

    let Client { dir, .. } = restarted;
    let again = Client::reopen(&fake, dir, true)?;
    assert_eq!(again.sessions.initialize().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_initialize_rebuilds_missing_local_cache() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let client = Client::connect(&fake)?;
    let (session, _) = client.sessions.signup_as_manager(grace()).await?;

    std::fs::remove_file(client.dir.path().join("session.json"))
        .map_err(|e| E2EError::Setup(e.to_string()))?;

    let Client { dir, .. } = client;
    let restarted = Client::reopen(&fake, dir, true)?;
    let restored = restarted
        .sessions
        .initialize()
        .await?
        .ok_or_else(|| E2EError::Check("session not rebuilt".into()))?;
    assert_eq!(restored.user_id, session.user_id);
    assert_eq!(restored.organization_name.as_deref(), Some("Sunrise Farm"));
    Ok(())
}

#[tokio::test]
async fn test_login_errors() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let client = Client::connect(&fake)?;
    client.sessions.signup_as_manager(grace()).await?;
    client.sessions.logout().await?;

    let err = client
        .sessions
        .login("grace@sunrise.farm", "wrong-password")
        .await
        .expect_err("bad password");
    assert!(matches!(err, ClientError::InvalidCredentials(ref m) if m == "Invalid login credentials"));

    let err = client.sessions.login("  ", "").await.expect_err("blank fields");
    assert!(matches!(err, ClientError::MissingFields(ref f) if f == &["email", "password"]));

    let session = client.sessions.login("Grace@Sunrise.farm", "layers-123").await?;
    assert_eq!(session.role, Role::Manager);
    Ok(())
}

#[tokio::test]
async fn test_login_without_profile_signs_out() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    let client = Client::connect(&fake)?;
    let identity = &client.backend.identity;
    let outcome = identity
        .sign_up("ghost@sunrise.farm", "no-profile-1", json!({ "role": "Farmer" }))
        .await?;
    identity.sign_out().await?;

    let err = client
        .sessions
        .login("ghost@sunrise.farm", "no-profile-1")
        .await
        .expect_err("profile missing");
    assert!(matches!(err, ClientError::ProfileNotFound(ref id) if *id == outcome.user_id));
    assert!(identity.current_session().await?.is_none());
    assert!(client.sessions.current().is_none());
    Ok(())
}

#[tokio::test]
async fn test_short_lived_tokens_are_refreshed() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    fake.set_token_ttl(5);
    let client = Client::connect(&fake)?;
    let (session, _) = client.sessions.signup_as_manager(grace()).await?;

    let before = client.backend.identity.current_session().await?;
    assert!(before.is_some());
    assert!(fake.refreshes() >= 1);

    let count = client.farm.count_inventory(&session.organization_id).await?;
    assert_eq!(count, 0);
    Ok(())
}

#[tokio::test]
async fn test_revoked_session_signs_out_listener() -> E2EResult<()> {
    let fake = FakeBackend::start().await?;
    fake.set_token_ttl(5);
    let client = Client::connect(&fake)?;
    client.sessions.signup_as_manager(grace()).await?;

    let cancel = CancellationToken::new();
    let listener = client.sessions.spawn_auth_listener(cancel.clone());
    let mut changes = client.sessions.subscribe();

    fake.revoke_all_sessions();
    assert!(client.backend.identity.current_session().await?.is_none());

    wait_for_logout(&mut changes, Duration::from_secs(5)).await;
    assert!(client.sessions.current().is_none());
    assert!(!client.dir.path().join("session.json").exists());

    cancel.cancel();
    let _ = listener.await;
    Ok(())
}
