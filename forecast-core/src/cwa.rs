//! Response shapes of the CWA open-data forecast datasets.
//!
//! Every field is optional: the upstream API omits whole branches freely and
//! the normalizer decides what is usable. Field names follow the dataset
//! verbatim; both the camelCase and the PascalCase spellings are accepted.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payload {
    #[serde(alias = "Records")]
    pub records: Option<Records>,
}

impl Payload {
    /// Parse a raw response body. Invalid JSON is a hard error.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).context("Failed to parse CWA forecast JSON")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Records {
    #[serde(alias = "Locations")]
    pub locations: Option<Vec<Location>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(alias = "LocationName")]
    pub location_name: Option<String>,

    #[serde(alias = "WeatherElement")]
    pub weather_elements: Option<Vec<WeatherElement>>,

    /// Datasets such as F-D0047 group locations one level deeper:
    /// `Locations[].Location[]`.
    #[serde(alias = "Location")]
    pub location: Option<Vec<Location>>,
}

impl Location {
    /// Depth-first walk over this entry and any nested groupings.
    pub fn walk(&self) -> Vec<&Location> {
        let mut out = vec![self];
        if let Some(children) = &self.location {
            for child in children {
                out.extend(child.walk());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherElement {
    #[serde(alias = "ElementName")]
    pub element_name: Option<String>,

    #[serde(alias = "Time")]
    pub times: Option<Vec<TimePoint>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    #[serde(alias = "StartTime")]
    pub start_time: Option<String>,

    #[serde(alias = "EndTime")]
    pub end_time: Option<String>,

    #[serde(alias = "DataTime")]
    pub data_time: Option<String>,

    #[serde(alias = "ElementValue")]
    pub element_values: Option<Vec<ElementValue>>,
}

/// Bag of string-typed readings. Only the field matching the enclosing
/// element is normally populated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementValue {
    #[serde(alias = "Temperature")]
    pub temperature: Option<String>,

    #[serde(alias = "RelativeHumidity")]
    pub relative_humidity: Option<String>,

    #[serde(alias = "WindSpeed")]
    pub wind_speed: Option<String>,

    #[serde(alias = "ProbabilityOfPrecipitation")]
    pub probability_of_precipitation: Option<String>,

    #[serde(alias = "Weather")]
    pub weather: Option<String>,

    #[serde(alias = "WeatherCode")]
    pub weather_code: Option<String>,
}
