//! Flattens a CWA forecast payload into per-timestamp records.
//!
//! The temperature series anchors the output: every emitted record sits on
//! one of its time points. Humidity, wind, rain probability and the weather
//! phenomenon come from their own series and are matched to the anchor by
//! exact timestamp equality.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};

use crate::cwa::{ElementValue, Location, Payload, TimePoint, WeatherElement};
use crate::model::{NormalizedForecastRecord, UNKNOWN_CONDITION};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// The five series the normalizer reads, with the element names the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Series {
    Temperature,
    Humidity,
    WindSpeed,
    RainProbability,
    Condition,
}

impl Series {
    fn labels(self) -> &'static [&'static str] {
        match self {
            Series::Temperature => &["溫度", "Temperature"],
            Series::Humidity => &["相對濕度", "RelativeHumidity"],
            Series::WindSpeed => &["風速", "WindSpeed"],
            Series::RainProbability => &["3小時降雨機率", "ProbabilityOfPrecipitation"],
            Series::Condition => &["天氣現象", "Weather"],
        }
    }

    fn field(self, value: &ElementValue) -> Option<&str> {
        let field = match self {
            Series::Temperature => &value.temperature,
            Series::Humidity => &value.relative_humidity,
            Series::WindSpeed => &value.wind_speed,
            Series::RainProbability => &value.probability_of_precipitation,
            Series::Condition => &value.weather,
        };
        field.as_deref()
    }

    /// First element-value with this series' field populated.
    fn raw<'a>(self, point: &'a TimePoint) -> Option<&'a str> {
        point
            .element_values
            .as_ref()?
            .iter()
            .find_map(|value| self.field(value))
    }

    /// First element-value whose field parses as a number.
    fn number(self, point: &TimePoint) -> Option<f64> {
        point
            .element_values
            .as_ref()?
            .iter()
            .find_map(|value| self.field(value).and_then(parse_number))
    }
}

/// Time points of one series keyed by resolved timestamp.
struct SeriesIndex<'a>(HashMap<NaiveDateTime, &'a TimePoint>);

impl<'a> SeriesIndex<'a> {
    fn build(element: Option<&'a WeatherElement>) -> Self {
        let mut map = HashMap::new();
        let points = element.and_then(|e| e.times.as_deref()).unwrap_or_default();
        for point in points {
            if let Some(ts) = resolve_timestamp(point) {
                // first point per timestamp wins
                map.entry(ts).or_insert(point);
            }
        }
        Self(map)
    }

    fn number(&self, series: Series, at: &NaiveDateTime) -> f64 {
        self.0
            .get(at)
            .and_then(|point| series.number(point))
            .map(round1)
            .unwrap_or(0.0)
    }

    fn text(&self, series: Series, at: &NaiveDateTime) -> String {
        self.0
            .get(at)
            .and_then(|point| series.raw(point))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CONDITION)
            .to_string()
    }
}

/// Parse a raw response body and normalize it. Only the JSON parse can fail.
pub fn normalize_bytes(body: &[u8], city_name: &str) -> Result<Vec<NormalizedForecastRecord>> {
    let payload = Payload::from_slice(body)?;
    Ok(normalize(&payload, city_name))
}

/// Build forecast records for `city_name` out of `payload`.
///
/// Never fails: anything that cannot be resolved is skipped or defaulted, and
/// an empty vector means the payload held nothing usable.
pub fn normalize(payload: &Payload, city_name: &str) -> Vec<NormalizedForecastRecord> {
    if city_name.is_empty() {
        return Vec::new();
    }

    let Some(locations) = payload.records.as_ref().and_then(|r| r.locations.as_ref()) else {
        return Vec::new();
    };

    locations
        .iter()
        .flat_map(Location::walk)
        .flat_map(|location| normalize_location(location, city_name))
        .collect()
}

fn normalize_location(location: &Location, city_name: &str) -> Vec<NormalizedForecastRecord> {
    let Some(elements) = location.weather_elements.as_deref() else {
        return Vec::new();
    };

    let Some(anchor) = find_series(elements, Series::Temperature)
        .and_then(|e| e.times.as_deref())
        .filter(|times| !times.is_empty())
    else {
        return Vec::new();
    };

    let humidity = SeriesIndex::build(find_series(elements, Series::Humidity));
    let wind = SeriesIndex::build(find_series(elements, Series::WindSpeed));
    let rain = SeriesIndex::build(find_series(elements, Series::RainProbability));
    let condition = SeriesIndex::build(find_series(elements, Series::Condition));

    let label = location
        .location_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(city_name);

    anchor
        .iter()
        .filter_map(|point| {
            let timestamp = resolve_timestamp(point)?;
            // zero counts as "no reading"
            let temperature = Series::Temperature.number(point).filter(|t| *t > 0.0)?;

            Some(NormalizedForecastRecord {
                location_label: label.to_string(),
                timestamp,
                temperature: round1(temperature),
                humidity: humidity.number(Series::Humidity, &timestamp),
                wind_speed: wind.number(Series::WindSpeed, &timestamp),
                rain_probability: rain.number(Series::RainProbability, &timestamp),
                condition: condition.text(Series::Condition, &timestamp),
            })
        })
        .collect()
}

fn find_series(elements: &[WeatherElement], series: Series) -> Option<&WeatherElement> {
    let labels = series.labels();
    elements.iter().find(|e| {
        e.element_name
            .as_deref()
            .is_some_and(|name| labels.contains(&name))
    })
}

/// `startTime` if it parses, else `dataTime`.
fn resolve_timestamp(point: &TimePoint) -> Option<NaiveDateTime> {
    point
        .start_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| point.data_time.as_deref().and_then(parse_timestamp))
}

/// RFC 3339 timestamps keep their local wall-clock time; naive ones are taken as-is.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to one decimal place. Values too large to scale are already
/// integral and come back unchanged.
fn round1(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 10.0
}
