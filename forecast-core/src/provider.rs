use crate::{Config, NormalizedForecastRecord, provider::cwa::CwaProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod cwa;

/// Source of normalized forecasts for a city name.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Fetch and normalize the forecast for `city_name`.
    ///
    /// `Ok(vec![])` means the upstream answered but had nothing usable;
    /// transport and payload faults are errors.
    async fn fetch_forecast(&self, city_name: &str)
    -> anyhow::Result<Vec<NormalizedForecastRecord>>;
}

/// Stands in when no provider could be built; every fetch fails with the
/// reason, so only forecast requests are affected.
#[derive(Debug)]
pub struct UnconfiguredProvider {
    reason: String,
}

impl UnconfiguredProvider {
    pub fn new(reason: &anyhow::Error) -> Self {
        Self {
            reason: format!("{reason:#}"),
        }
    }
}

#[async_trait]
impl ForecastProvider for UnconfiguredProvider {
    async fn fetch_forecast(
        &self,
        _city_name: &str,
    ) -> anyhow::Result<Vec<NormalizedForecastRecord>> {
        Err(anyhow::anyhow!("{}", self.reason))
    }
}

/// Construct the CWA provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No CWA API key configured.\n\
                 Hint: run `forecast-hub configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    let provider = CwaProvider::new(&config.api, api_key.to_owned())?;
    Ok(Box::new(provider))
}
