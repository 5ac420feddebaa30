use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Condition text used when no weather-phenomenon value lines up with a record.
pub const UNKNOWN_CONDITION: &str = "unknown";

/// One forecast row aligned on a temperature time point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedForecastRecord {
    pub location_label: String,
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub rain_probability: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCity {
    #[serde(default)]
    pub name: String,
}

/// Forecast row as handed to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub city_name: String,
    pub location: String,
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub rain_probability: f64,
    pub weather_condition: String,
}

impl ForecastEntry {
    pub fn from_record(city_name: &str, record: NormalizedForecastRecord) -> Self {
        Self {
            city_name: city_name.to_string(),
            location: record.location_label,
            timestamp: record.timestamp,
            temperature: record.temperature,
            humidity: record.humidity,
            wind_speed: record.wind_speed,
            rain_probability: record.rain_probability,
            weather_condition: record.condition,
        }
    }
}
