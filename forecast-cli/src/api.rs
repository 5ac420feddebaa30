use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use forecast_core::{City, CityService, ForecastEntry, NewCity, ServiceError, WeatherService};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cities: Arc<CityService>,
    pub weather: Arc<WeatherService>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/cities", get(list_cities).post(create_city))
        .route(
            "/cities/{id}",
            get(get_city).put(update_city).delete(delete_city),
        )
        .route("/weather/{city_id}", get(get_forecast));

    Router::new()
        .nest("/api", api)
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Request body extractor whose rejections use the JSON error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct JsonBody<T>(T);

/// Path extractor whose rejections use the JSON error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct PathParam<T>(T);

/// Maps failures onto status codes with a JSON `{ "error": ... }` body.
pub enum ApiError {
    Service(ServiceError),
    /// Malformed path or body, rejected before reaching a service.
    Rejected(StatusCode, String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Rejected(status, message) => (status, message),
            ApiError::Service(err @ ServiceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Service(err @ ServiceError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Service(ServiceError::Upstream(_)) => (
                StatusCode::BAD_GATEWAY,
                "Forecast unavailable, please try again later".to_string(),
            ),
            ApiError::Service(ServiceError::Storage(err)) => {
                tracing::error!(error = %format!("{err:#}"), "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn list_cities(State(state): State<AppState>) -> ApiResult<Json<Vec<City>>> {
    Ok(Json(state.cities.list().await?))
}

async fn get_city(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<City>> {
    Ok(Json(state.cities.get(id).await?))
}

async fn create_city(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewCity>,
) -> ApiResult<impl IntoResponse> {
    let city = state.cities.create(&body.name).await?;
    let location = format!("/api/cities/{}", city.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(city)))
}

async fn update_city(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<NewCity>,
) -> ApiResult<Json<City>> {
    Ok(Json(state.cities.update(id, &body.name).await?))
}

async fn delete_city(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<StatusCode> {
    state.cities.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_forecast(
    State(state): State<AppState>,
    PathParam(city_id): PathParam<i64>,
) -> ApiResult<Json<Vec<ForecastEntry>>> {
    Ok(Json(state.weather.forecast(city_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use forecast_core::{
        CityStore, ForecastProvider, NormalizedForecastRecord, SqliteCityStore,
        UnconfiguredProvider,
    };
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    /// Answers with one record for "Taipei", nothing for other names, and
    /// fails for "Offline".
    #[derive(Debug)]
    struct StubProvider;

    #[async_trait]
    impl ForecastProvider for StubProvider {
        async fn fetch_forecast(
            &self,
            city_name: &str,
        ) -> anyhow::Result<Vec<NormalizedForecastRecord>> {
            match city_name {
                "Taipei" => Ok(vec![NormalizedForecastRecord {
                    location_label: "臺北市".into(),
                    timestamp: NaiveDate::from_ymd_opt(2025, 1, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap(),
                    temperature: 18.0,
                    humidity: 70.0,
                    wind_speed: 0.0,
                    rain_probability: 0.0,
                    condition: "unknown".into(),
                }]),
                "Offline" => Err(anyhow::anyhow!("connection refused")),
                _ => Ok(vec![]),
            }
        }
    }

    async fn app() -> Router {
        let store: Arc<dyn CityStore> =
            Arc::new(SqliteCityStore::connect("sqlite::memory:").await.unwrap());
        let provider: Arc<dyn ForecastProvider> = Arc::new(StubProvider);

        router(AppState {
            cities: Arc::new(CityService::new(store.clone())),
            weather: Arc::new(WeatherService::new(store, provider)),
        })
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn city_crud_roundtrip() {
        let app = app().await;

        let (status, created) =
            send(&app, "POST", "/api/cities", Some(json!({ "name": "Taipei" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["name"], "Taipei");

        let (status, list) = send(&app, "GET", "/api/cities", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([{ "id": id, "name": "Taipei" }]));

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/cities/{id}"),
            Some(json!({ "name": "Tainan" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Tainan");

        let (status, _) = send(&app, "DELETE", &format!("/api/cities/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/api/cities/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn blank_name_is_bad_request() {
        let app = app().await;
        let (status, body) = send(&app, "POST", "/api/cities", Some(json!({ "name": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("must not be empty"));

        let (status, _) = send(&app, "DELETE", "/api/cities/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forecast_endpoint_serializes_entries() {
        let app = app().await;
        let (_, city) = send(&app, "POST", "/api/cities", Some(json!({ "name": "Taipei" }))).await;
        let id = city["id"].as_i64().unwrap();

        let (status, body) = send(&app, "GET", &format!("/api/weather/{id}"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "cityName": "Taipei",
                "location": "臺北市",
                "timestamp": "2025-01-01T00:00:00",
                "temperature": 18.0,
                "humidity": 70.0,
                "windSpeed": 0.0,
                "rainProbability": 0.0,
                "weatherCondition": "unknown"
            }])
        );
    }

    #[tokio::test]
    async fn forecast_empty_missing_and_failing() {
        let app = app().await;

        let (_, quiet) = send(&app, "POST", "/api/cities", Some(json!({ "name": "Kinmen" }))).await;
        let (status, body) =
            send(&app, "GET", &format!("/api/weather/{}", quiet["id"]), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(&app, "GET", "/api/weather/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, offline) =
            send(&app, "POST", "/api/cities", Some(json!({ "name": "Offline" }))).await;
        let (status, body) =
            send(&app, "GET", &format!("/api/weather/{}", offline["id"]), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Forecast unavailable, please try again later");
    }

    #[tokio::test]
    async fn malformed_path_and_body_get_json_errors() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/api/cities/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            "PUT",
            "/api/cities/1.5",
            Some(json!({ "name": "Taipei" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let req = Request::post("/api/cities")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());

        let req = Request::post("/api/cities")
            .body(Body::from(r#"{"name":"Taipei"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn missing_api_key_only_disables_forecasts() {
        let store: Arc<dyn CityStore> =
            Arc::new(SqliteCityStore::connect("sqlite::memory:").await.unwrap());
        let reason = anyhow::anyhow!("No CWA API key configured");
        let provider: Arc<dyn ForecastProvider> = Arc::new(UnconfiguredProvider::new(&reason));
        let app = router(AppState {
            cities: Arc::new(CityService::new(store.clone())),
            weather: Arc::new(WeatherService::new(store, provider)),
        });

        let (status, city) =
            send(&app, "POST", "/api/cities", Some(json!({ "name": "Taipei" }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&app, "GET", &format!("/api/weather/{}", city["id"]), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Forecast unavailable, please try again later");
    }

    #[tokio::test]
    async fn health_check() {
        let app = app().await;
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
