//! HTTP trigger.
//!
//! - `POST /predict`: one `RideRecord`, answered with the predicted duration
//! - `POST /invocations`: a stream batch envelope, answered with the stream response

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use contracts::{ErrorBody, HttpPrediction, RideEvent, RideRecord, StreamOutput};
use dispatcher::{Dispatcher, DispatcherError};
use ingestion::EventDecoder;
use observability::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Option<PrometheusHandle>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/invocations", post(invocations))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "ride duration prediction"
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.dispatcher.model_name(),
        "model_version": state.dispatcher.model_version(),
        "test_run": state.dispatcher.is_test_mode(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(ref handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "no metrics recorder installed").into_response(),
    }
}

async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HttpPrediction>, ApiError> {
    let ride: RideRecord = serde_json::from_slice(&body)
        .map_err(|e| bad_request(format!("invalid ride: {e}")))?;

    // Callers of this path have no ride id of their own
    let event = RideEvent::new(Uuid::new_v4().to_string(), ride);

    let result = state
        .dispatcher
        .process_event(event)
        .await
        .map_err(dispatch_error)?;

    Ok(Json(HttpPrediction {
        duration: result.prediction,
        model_version: result.model_version,
    }))
}

async fn invocations(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StreamOutput>, ApiError> {
    let batch = EventDecoder::parse_batch(&body).map_err(|e| bad_request(e.to_string()))?;

    let result = state
        .dispatcher
        .process_stream_batch(&batch)
        .await
        .map_err(dispatch_error)?;

    Ok(Json(result.to_stream_output()))
}

fn bad_request(error: String) -> ApiError {
    warn!(error = %error, "Rejected request");
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error }))
}

fn dispatch_error(e: DispatcherError) -> ApiError {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ErrorBody { error: e.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use contracts::{ContractError, FeatureVector, Predictor};
    use dispatcher::DispatcherConfig;
    use http_body_util::BodyExt; // for `collect`
    use ingestion::MockRideSource;
    use model_loader::ConstantPredictor;
    use tower::ServiceExt; // for `oneshot`

    struct BrokenModel;

    impl Predictor for BrokenModel {
        fn predict(&self, _features: &FeatureVector) -> Result<f64, ContractError> {
            Err(ContractError::prediction("broken", "weights missing"))
        }
    }

    fn app_with(predictor: Arc<dyn Predictor>) -> Router {
        let config = DispatcherConfig::new("ride_prediction_model", "Test123");
        let dispatcher = Dispatcher::with_handles(config, predictor, vec![]);
        router(AppState {
            dispatcher: Arc::new(dispatcher),
            metrics: None,
        })
    }

    fn app() -> Router {
        app_with(Arc::new(ConstantPredictor::new(11.0)))
    }

    fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn index() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ride duration prediction");
    }

    #[tokio::test]
    async fn predict_returns_duration() {
        let response = app()
            .oneshot(post_json(
                "/predict",
                r#"{"PULocationID": 130, "DOLocationID": 205, "trip_distance": 3.66}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"duration": 11.0, "model_version": "Test123"})
        );
    }

    #[tokio::test]
    async fn predict_rejects_malformed_ride() {
        let response = app()
            .oneshot(post_json("/predict", r#"{"PULocationID": 130}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn predict_model_failure_is_server_error() {
        let response = app_with(Arc::new(BrokenModel))
            .oneshot(post_json(
                "/predict",
                r#"{"PULocationID": 1, "DOLocationID": 2, "trip_distance": 1.0}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn invocations_returns_stream_output() {
        let batch = MockRideSource::default().stream_batch(3).unwrap();
        let body = serde_json::to_vec(&batch).unwrap();

        let response = app()
            .oneshot(post_json("/invocations", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let output = json_body(response).await;
        assert_eq!(output["statusCode"], 200);
        assert_eq!(output["predictions"].as_array().unwrap().len(), 3);
        assert_eq!(output["predictions"][0]["version"], "Test123");
        assert_eq!(output["predictions"][0]["prediction"]["ride_id"], 1);
    }

    #[tokio::test]
    async fn invocations_rejects_bad_record() {
        let body = r#"{"Records": [{"kinesis": {"data": "%%%"}}]}"#;
        let response = app()
            .oneshot(post_json("/invocations", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invocations_rejects_bad_envelope() {
        let response = app()
            .oneshot(post_json("/invocations", "[1, 2]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_model() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_version"], "Test123");
        assert_eq!(body["test_run"], false);
    }

    #[tokio::test]
    async fn metrics_without_recorder() {
        let response = app()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
