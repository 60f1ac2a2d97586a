use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherCondition {
    pub text: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub code: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentWeather {
    pub temp_c: f64,
    #[serde(default)]
    pub feelslike_c: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub wind_kph: f64,
    #[serde(default)]
    pub wind_dir: String,
    #[serde(default)]
    pub precip_mm: f64,
    #[serde(default)]
    pub uv: f64,
    #[serde(default)]
    pub is_day: i64,
    #[serde(default)]
    pub last_updated: String,
    pub condition: WeatherCondition,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherLocation {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub localtime: String,
}

/// Decoded `current.json` response of the weather provider. Fields the app
/// never shows are ignored on decode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: WeatherLocation,
    pub current: CurrentWeather,
}

impl WeatherReport {
    /// One line suitable for the `weather` field of a farm report.
    pub fn summary(&self) -> String {
        format!(
            "{}, {:.0}°C (feels {:.0}°C), humidity {:.0}%, wind {:.0} km/h {}, rain {:.1} mm in {}",
            self.current.condition.text,
            self.current.temp_c,
            self.current.feelslike_c,
            self.current.humidity,
            self.current.wind_kph,
            self.current.wind_dir,
            self.current.precip_mm,
            self.location.name,
        )
    }

    pub fn is_day(&self) -> bool {
        self.current.is_day == 1
    }
}
