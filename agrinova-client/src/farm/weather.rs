use agrinova_shared::weather::WeatherReport;
use tracing::debug;

use super::FarmData;
use crate::error::{ClientError, ClientResult};

impl FarmData {
    pub async fn current_weather(&self, city: &str) -> ClientResult<WeatherReport> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ClientError::MissingFields(vec!["city"]));
        }
        let report = self.run(self.weather.current(city)).await?;
        debug!(city, summary = %report.summary(), "weather fetched");
        Ok(report)
    }
}
