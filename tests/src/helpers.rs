//! Helper utilities for E2E tests

use std::sync::{Arc, Once};
use std::time::Duration;

use agrinova_client::config::Config;
use agrinova_client::{Backend, FarmData, SessionManager, SessionStore};
use agrinova_shared::session::Session;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::watch;

use crate::fake::{ANON_KEY, FakeBackend, SERVICE_KEY, WEATHER_KEY};

/// Error type for E2E tests
#[derive(Debug, thiserror::Error)]
pub enum E2EError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Client error: {0}")]
    Client(#[from] agrinova_client::ClientError),

    #[error("Assertion failed: {0}")]
    Check(String),
}

pub type E2EResult<T> = Result<T, E2EError>;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "agrinova_client=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn config_for(fake: &FakeBackend, service_key: bool) -> Config {
    Config {
        backend_url: fake.url.clone(),
        anon_key: ANON_KEY.into(),
        service_role_key: service_key.then(|| SERVICE_KEY.to_string()),
        weather_api_url: format!("{}/weather/v1", fake.url),
        weather_api_key: Some(WEATHER_KEY.into()),
        default_city: Some("Enugu".into()),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

/// One "device": its own token file, session cache and data handle, all
/// pointed at the fake backend.
pub struct Client {
    pub backend: Backend,
    pub sessions: Arc<SessionManager>,
    pub farm: FarmData,
    pub dir: TempDir,
}

impl Client {
    pub fn connect(fake: &FakeBackend) -> E2EResult<Self> {
        Self::connect_with(fake, true)
    }

    pub fn connect_with(fake: &FakeBackend, service_key: bool) -> E2EResult<Self> {
        let dir = tempfile::tempdir().map_err(|e| E2EError::Setup(e.to_string()))?;
        Self::reopen(fake, dir, service_key)
    }

    /// Builds a fresh client over an existing state directory, as a restart
    /// of the app would.
    pub fn reopen(fake: &FakeBackend, dir: TempDir, service_key: bool) -> E2EResult<Self> {
        init_tracing();
        let config = config_for(fake, service_key);
        let backend = agrinova_client::remote::connect_with(
            &config,
            Some(dir.path().join("credentials.json")),
        )?;
        let sessions = Arc::new(SessionManager::new(
            backend.clone(),
            SessionStore::new(dir.path().join("session.json")),
        ));
        let farm = FarmData::new(&backend, Duration::from_secs(config.cache_ttl_secs));
        Ok(Self {
            backend,
            sessions,
            farm,
            dir,
        })
    }
}

pub fn enugu_weather() -> Value {
    json!({
        "location": {
            "name": "Enugu",
            "region": "Enugu",
            "country": "Nigeria",
            "localtime": "2026-10-17 09:00"
        },
        "current": {
            "temp_c": 27.0,
            "feelslike_c": 30.0,
            "humidity": 79,
            "wind_kph": 12.2,
            "wind_dir": "SW",
            "precip_mm": 0.0,
            "uv": 6.0,
            "is_day": 1,
            "last_updated": "2026-10-17 08:45",
            "condition": { "text": "Partly cloudy", "icon": "//cdn/116.png", "code": 1003 }
        }
    })
}

/// Smallest byte string that still starts like a JPEG.
pub fn jpeg_bytes() -> bytes::Bytes {
    bytes::Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9])
}

/// Waits until the session channel reports no session.
pub async fn wait_for_logout(rx: &mut watch::Receiver<Option<Session>>, timeout: Duration) {
    let waited = tokio::time::timeout(timeout, rx.wait_for(|s| s.is_none())).await;
    assert!(
        matches!(waited, Ok(Ok(_))),
        "session was not cleared within {timeout:?}"
    );
}
