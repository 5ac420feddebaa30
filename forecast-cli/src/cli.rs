use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use forecast_core::{
    CityService, Config, ForecastProvider, NormalizedForecastRecord, SqliteCityStore,
    UnconfiguredProvider, WeatherService, provider_from_config,
};
use inquire::{Password, Text};
use tokio::net::TcpListener;

use crate::api::{self, AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast-hub", version, about = "City forecasts from the CWA open-data API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on; overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,

        /// Database URL; overrides `database.url`.
        #[arg(long)]
        database: Option<String>,
    },

    /// Fetch and print the forecast for a location name, e.g. "臺北市".
    Show {
        city: String,
    },

    /// Store the CWA API key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Serve { bind, database } => serve(config, bind, database).await,
            Command::Show { city } => show(&config, &city).await,
            Command::Configure => configure(config),
        }
    }
}

async fn serve(
    config: Config,
    bind: Option<String>,
    database: Option<String>,
) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let database = database.unwrap_or_else(|| config.database.url.clone());

    let store = Arc::new(SqliteCityStore::connect(&database).await?);
    let provider: Arc<dyn ForecastProvider> = match provider_from_config(&config) {
        Ok(provider) => Arc::from(provider),
        Err(err) => {
            tracing::warn!("Forecasts disabled: {err:#}");
            Arc::new(UnconfiguredProvider::new(&err))
        }
    };

    let state = AppState {
        cities: Arc::new(CityService::new(store.clone())),
        weather: Arc::new(WeatherService::new(store, provider)),
    };

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!("Forecast hub listening on http://{bind}");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}

async fn show(config: &Config, city: &str) -> anyhow::Result<()> {
    let provider = provider_from_config(config)?;
    let records = provider.fetch_forecast(city).await?;

    if records.is_empty() {
        println!("No forecast data for {city}.");
        return Ok(());
    }

    println!("Forecast for {city}:");
    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

fn format_record(r: &NormalizedForecastRecord) -> String {
    format!(
        "{}  {:<8} {:>5.1}°C  {:>5.1}%  {:>4.1} m/s  rain {:>5.1}%  {}",
        r.timestamp.format("%Y-%m-%d %H:%M"),
        r.location_label,
        r.temperature,
        r.humidity,
        r.wind_speed,
        r.rain_probability,
        r.condition,
    )
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let key = Password::new("CWA API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let dataset = Text::new("Forecast dataset:")
        .with_default(&config.api.dataset_id)
        .prompt()
        .context("Failed to read dataset id")?;

    config.set_api_key(key.trim().to_string());
    config.api.dataset_id = dataset.trim().to_string();
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
