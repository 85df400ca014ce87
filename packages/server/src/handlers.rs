//! HTTP handler functions for the forecast API.

// Handlers must be async to satisfy actix's Handler trait even though the
// catalog and models are served straight from memory.
#![allow(clippy::unused_async)]

use actix_web::{HttpResponse, web};
use quakecast_features::EventSample;
use quakecast_forecast::ForecastError;
use quakecast_server_models::{
    ApiError, ApiEvent, ApiHealth, EventListResponse, LocationQueryParams, PredictRequest,
    PredictResponse,
};

use crate::AppState;

/// How many events the list endpoints return.
const TOP_EVENTS: usize = 5;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/largest-earthquakes`
///
/// Returns the five largest recorded events across the whole catalog.
pub async fn largest_earthquakes(state: web::Data<AppState>) -> HttpResponse {
    let events: Vec<ApiEvent> = state
        .catalog
        .largest(TOP_EVENTS)
        .into_iter()
        .map(ApiEvent::from)
        .collect();

    HttpResponse::Ok().json(EventListResponse::success(events))
}

/// `GET /api/earthquakes-by-location?location=X`
///
/// Returns the five largest recorded events for one province.
pub async fn earthquakes_by_location(
    state: web::Data<AppState>,
    params: web::Query<LocationQueryParams>,
) -> HttpResponse {
    let Some(location) = normalize_location(params.location.as_deref()) else {
        return HttpResponse::BadRequest()
            .json(ApiError::new("Missing 'location' query parameter"));
    };

    let events: Vec<ApiEvent> = state
        .catalog
        .largest_for_location(&location, TOP_EVENTS)
        .into_iter()
        .map(ApiEvent::from)
        .collect();

    if events.is_empty() {
        return HttpResponse::NotFound().json(ApiError::new(format!(
            "No records found for location '{location}'"
        )));
    }

    HttpResponse::Ok().json(EventListResponse::success(events))
}

/// `POST /api/predict-next-earthquake`
///
/// Runs the trained models over the location's recent history.
pub async fn predict_next_earthquake(
    state: web::Data<AppState>,
    body: web::Json<PredictRequest>,
) -> HttpResponse {
    let Some(location) = normalize_location(body.location.as_deref()) else {
        return HttpResponse::BadRequest()
            .json(ApiError::new("Missing 'location' field in request body"));
    };

    let Some(forecaster) = state.forecaster.as_deref() else {
        return HttpResponse::ServiceUnavailable().json(ApiError::new(
            "No trained model is available; train one and restart the server",
        ));
    };

    let history: Vec<EventSample> = state
        .catalog
        .recent_for_location(&location, state.recent_events)
        .into_iter()
        .map(EventSample::from)
        .collect();

    match forecaster.predict(&location, &history) {
        Ok(forecast) => HttpResponse::Ok().json(PredictResponse::from(forecast)),
        Err(ForecastError::UnknownLocation(e)) => HttpResponse::NotFound().json(ApiError::new(
            format!("No model coverage for location '{}'", e.location),
        )),
        Err(e) => {
            log::error!("Prediction failed for {location}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Prediction failed"))
        }
    }
}

/// Trims and uppercases a client-supplied location label; `None` when the
/// parameter is absent or blank.
fn normalize_location(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}


// Kept apart from `tests`: importing `actix_web::test` for the service
// helpers also pulls in its attribute macro, which would shadow the
// built-in `#[test]` on the synchronous tests above.
#[cfg(test)]
mod endpoint_tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use chrono::{Duration, TimeZone as _, Utc};
    use quakecast_catalog::EventCatalog;
    use quakecast_catalog_models::{CatalogEvent, TimeBucket};
    use quakecast_forecast::{Forecaster, TrainingConfig, train_models};
    use quakecast_forest::{ForestConfig, MaxFeatures};
    use serde_json::{Value, json};

    use crate::{AppState, api_scope};

    // Two provinces with quarter-magnitude steps so every expected value is
    // exact in binary.
    fn sample_events() -> Vec<CatalogEvent> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut events = Vec::new();
        for step in 0..20_i64 {
            events.push(CatalogEvent::new(
                base + Duration::hours(step * 6),
                "VAN".to_owned(),
                4.0 + f64::from(i32::try_from(step % 5).unwrap()) * 0.25,
            ));
            events.push(CatalogEvent::new(
                base + Duration::hours(3 + step * 11),
                "IZMIR".to_owned(),
                3.5 + f64::from(i32::try_from(step % 4).unwrap()) * 0.25,
            ));
        }
        events
    }

    fn training_config() -> TrainingConfig {
        let forest = ForestConfig {
            n_trees: 10,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            seed: 42,
        };
        TrainingConfig {
            holdout_fraction: 0.15,
            seed: 42,
            magnitude_forest: forest,
            bucket_forest: ForestConfig {
                max_features: MaxFeatures::Sqrt,
                ..forest
            },
        }
    }

    fn app_state(with_model: bool) -> web::Data<AppState> {
        let events = sample_events();
        let forecaster = if with_model {
            let artifact = train_models(&events, &training_config()).unwrap();
            Some(Arc::new(Forecaster::from_artifact(artifact)))
        } else {
            None
        };
        web::Data::new(AppState {
            catalog: Arc::new(EventCatalog::from_events(events)),
            forecaster,
            recent_events: 30,
        })
    }

    #[actix_web::test]
    async fn health_reports_healthy() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn largest_earthquakes_returns_the_top_five() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::get()
            .uri("/api/largest-earthquakes")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["count"], 5);
        assert!((body["data"][0]["magnitude"].as_f64().unwrap() - 5.0).abs() < f64::EPSILON);
    }

    #[actix_web::test]
    async fn by_location_without_param_is_rejected() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::get()
            .uri("/api/earthquakes-by-location")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn by_location_matches_case_insensitively() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::get()
            .uri("/api/earthquakes-by-location?location=van")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["count"], 5);
        assert_eq!(body["data"][0]["location"], "VAN");
    }

    #[actix_web::test]
    async fn by_location_unknown_province_is_not_found() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::get()
            .uri("/api/earthquakes-by-location?location=SIVAS")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn predict_without_location_is_rejected() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::post()
            .uri("/api/predict-next-earthquake")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn predict_without_model_reports_service_unavailable() {
        let app =
            test::init_service(App::new().app_data(app_state(false)).service(api_scope())).await;

        let req = test::TestRequest::post()
            .uri("/api/predict-next-earthquake")
            .set_json(json!({"location": "VAN"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn predict_unknown_province_is_not_found() {
        let app =
            test::init_service(App::new().app_data(app_state(true)).service(api_scope())).await;

        let req = test::TestRequest::post()
            .uri("/api/predict-next-earthquake")
            .set_json(json!({"location": "ANKARA"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");
    }

    #[actix_web::test]
    async fn predict_returns_magnitude_and_time_range() {
        let app =
            test::init_service(App::new().app_data(app_state(true)).service(api_scope())).await;

        let req = test::TestRequest::post()
            .uri("/api/predict-next-earthquake")
            .set_json(json!({"location": "van"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["location"], "VAN");

        // The regressor averages observed magnitudes, so the forecast has to
        // stay inside the training range.
        let magnitude = body["predicted_magnitude"].as_f64().unwrap();
        assert!((3.5..=5.0).contains(&magnitude), "magnitude {magnitude}");

        let range = body["predicted_time_range"].as_str().unwrap();
        assert!(TimeBucket::all().iter().any(|bucket| bucket.label() == range));
    }
}
