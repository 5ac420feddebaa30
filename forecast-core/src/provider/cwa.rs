use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use tracing::{debug, instrument, warn};

use crate::{NormalizedForecastRecord, config::ApiConfig, normalizer};

use super::ForecastProvider;

/// Client for the CWA open-data `rest/datastore` endpoint.
#[derive(Debug, Clone)]
pub struct CwaProvider {
    base_url: String,
    dataset_id: String,
    api_key: String,
    http: Client,
}

impl CwaProvider {
    pub fn new(config: &ApiConfig, api_key: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dataset_id: config.dataset_id.clone(),
            api_key,
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/datastore/{}", self.base_url, self.dataset_id)
    }

    async fn fetch_raw(&self, city_name: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(self.endpoint())
            .query(&[
                ("Authorization", self.api_key.as_str()),
                ("locationName", city_name),
            ])
            .send()
            .await
            .context("Failed to send request to CWA open-data API")?;

        let status = res.status();
        let body = res.bytes().await.context("Failed to read CWA response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "CWA forecast request failed with status {}: {}",
                status,
                truncate_body(&String::from_utf8_lossy(&body)),
            ));
        }

        Ok(body.to_vec())
    }
}

#[async_trait]
impl ForecastProvider for CwaProvider {
    #[instrument(skip(self), fields(dataset = %self.dataset_id))]
    async fn fetch_forecast(&self, city_name: &str) -> Result<Vec<NormalizedForecastRecord>> {
        debug!("Requesting CWA forecast");
        let body = self.fetch_raw(city_name).await?;

        let records = normalizer::normalize_bytes(&body, city_name)?;
        if records.is_empty() {
            warn!("CWA payload held no usable forecast data");
        }
        Ok(records)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
