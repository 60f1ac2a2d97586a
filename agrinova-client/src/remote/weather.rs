use agrinova_shared::weather::WeatherReport;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::check;
use crate::backend::WeatherProvider;
use crate::error::{ClientError, ClientResult};

/// Current conditions from weatherapi.com (or anything serving the same shape).
pub struct WeatherApiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherApiClient {
    pub fn new(http: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn current(&self, city: &str) -> ClientResult<WeatherReport> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ClientError::Config("weather_api_key not set".into()))?;
        debug!(city, "weather lookup");
        let resp = self
            .http
            .get(format!("{}/current.json", self.base_url))
            .query(&[("key", key), ("q", city)])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}
