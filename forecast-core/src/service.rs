//! City CRUD and forecast lookups on top of a [`CityStore`] and a
//! [`ForecastProvider`].

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    error::{ServiceError, ServiceResult},
    model::{City, ForecastEntry},
    provider::ForecastProvider,
    store::{CityStore, MAX_NAME_LEN},
};

pub struct CityService {
    store: Arc<dyn CityStore>,
}

impl CityService {
    pub fn new(store: Arc<dyn CityStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> ServiceResult<Vec<City>> {
        self.store.list().await.map_err(ServiceError::Storage)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> ServiceResult<City> {
        find_city(self.store.as_ref(), id).await
    }

    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> ServiceResult<City> {
        let name = validate_name(name)?;
        let city = self.store.insert(name).await.map_err(ServiceError::Storage)?;
        info!(id = city.id, "City created");
        Ok(city)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: i64, name: &str) -> ServiceResult<City> {
        validate_id(id)?;
        let name = validate_name(name)?;

        self.store
            .update(id, name)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or_else(|| {
                warn!("City not found");
                ServiceError::NotFound(id)
            })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        validate_id(id)?;

        if self.store.delete(id).await.map_err(ServiceError::Storage)? {
            info!("City deleted");
            Ok(())
        } else {
            warn!("City not found");
            Err(ServiceError::NotFound(id))
        }
    }
}

pub struct WeatherService {
    store: Arc<dyn CityStore>,
    provider: Arc<dyn ForecastProvider>,
}

impl WeatherService {
    pub fn new(store: Arc<dyn CityStore>, provider: Arc<dyn ForecastProvider>) -> Self {
        Self { store, provider }
    }

    /// Forecast for a stored city. An empty vector is a successful answer
    /// with no usable data; upstream faults are [`ServiceError::Upstream`].
    #[instrument(skip(self))]
    pub async fn forecast(&self, city_id: i64) -> ServiceResult<Vec<ForecastEntry>> {
        info!("Fetching forecast");
        let city = find_city(self.store.as_ref(), city_id).await?;

        let records = self.provider.fetch_forecast(&city.name).await.map_err(|e| {
            tracing::error!(city = %city.name, error = %format!("{e:#}"), "Forecast fetch failed");
            ServiceError::Upstream(e)
        })?;

        if records.is_empty() {
            warn!(city = %city.name, "No usable forecast data");
        }

        Ok(records
            .into_iter()
            .map(|record| ForecastEntry::from_record(&city.name, record))
            .collect())
    }
}

async fn find_city(store: &dyn CityStore, id: i64) -> ServiceResult<City> {
    store
        .get(id)
        .await
        .map_err(ServiceError::Storage)?
        .ok_or_else(|| {
            warn!(id, "City not found");
            ServiceError::NotFound(id)
        })
}

fn validate_id(id: i64) -> ServiceResult<()> {
    if id <= 0 {
        return Err(ServiceError::validation("City id must be greater than 0"));
    }
    Ok(())
}

fn validate_name(name: &str) -> ServiceResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("City name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::validation(format!(
            "City name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}
