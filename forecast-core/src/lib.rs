//! Core library for the forecast hub.
//!
//! This crate defines:
//! - Configuration handling
//! - The CWA payload shapes and the normalizer that flattens them
//! - The forecast provider abstraction and its CWA client
//! - City persistence and the services built on top of it
//!
//! It is used by `forecast-cli`, which serves it over HTTP.

pub mod config;
pub mod cwa;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod provider;
pub mod service;
pub mod store;

pub use config::{ApiConfig, Config};
pub use error::{ServiceError, ServiceResult};
pub use model::{City, ForecastEntry, NewCity, NormalizedForecastRecord};
pub use normalizer::normalize;
pub use provider::{ForecastProvider, UnconfiguredProvider, provider_from_config};
pub use service::{CityService, WeatherService};
pub use store::{CityStore, SqliteCityStore};
