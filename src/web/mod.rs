// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! HTTP API for the sign-up and capture screens

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::IdentityClient;
use crate::config::AppConfig;
use crate::db::Database;
use crate::signup::{RegistrationForm, SignUpOutcome, SignUpService};
use crate::vision::{
    ClassificationOutcome, ClassificationStatus, Classifier, Enrichment, LabelTable,
    MetadataEnricher, ModelRuntime, ModelSlot, ServingClient,
};

/// Uploaded photos from phone cameras run to several megabytes
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Wait between rounds of model-server polling while the model is absent
const MODEL_RECONNECT_PAUSE: Duration = Duration::from_secs(30);

/// Shared application state
pub struct AppState {
    pub signup: SignUpService,
    pub classifier: Classifier,
    pub config: AppConfig,
}

impl AppState {
    /// Wire the REST collaborators and start loading the model in the background.
    /// The loader keeps polling until the model server reports the model available.
    pub fn from_config(config: AppConfig, db: Database) -> crate::Result<Self> {
        let store = Arc::new(db);
        let auth = Arc::new(IdentityClient::new(&config.auth)?);
        let signup = SignUpService::new(auth, store.clone(), config.database.users_collection.clone());

        let labels = Arc::new(LabelTable::from_config(config.model.labels_path.as_deref())?);
        let slot = Arc::new(ModelSlot::new());
        let model_config = config.model.clone();
        slot.load_in_background(async move {
            let client = ServingClient::connect_persistent(&model_config, MODEL_RECONNECT_PAUSE).await?;
            Ok(Arc::new(client) as Arc<dyn ModelRuntime>)
        });

        let enricher = MetadataEnricher::new(store, config.database.heritage_collection.clone());
        let classifier = Classifier::new(slot, labels, enricher, &config.model);

        Ok(Self { signup, classifier, config })
    }
}

/// Create the web application router.
///
/// Every request gets its own outcome, so handlers use the ungated service
/// entry points and concurrent clients never see `Busy`.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/signup", post(api_signup))
        .route("/api/classify", post(api_classify))
        .route("/api/classify/base64", post(api_classify_base64))
        .route("/api/model", get(api_model))
        .route("/api/labels", get(api_labels))
        .route("/api/heritage/:id", get(api_heritage))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn api_health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

// === Sign-up ===

async fn api_signup(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RegistrationForm>,
) -> (StatusCode, Json<SignUpOutcome>) {
    let outcome = state.signup.process(&form).await;
    let status = match &outcome {
        SignUpOutcome::Registered { .. } => StatusCode::CREATED,
        SignUpOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SignUpOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        SignUpOutcome::Busy => StatusCode::CONFLICT,
    };
    (status, Json(outcome))
}

// === Classification ===

fn classification_response(outcome: ClassificationOutcome) -> (StatusCode, Json<ClassificationOutcome>) {
    let status = match outcome.status {
        ClassificationStatus::Recognized | ClassificationStatus::NotRecognized => StatusCode::OK,
        ClassificationStatus::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
        ClassificationStatus::NoImage => StatusCode::BAD_REQUEST,
        ClassificationStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        ClassificationStatus::Busy => StatusCode::CONFLICT,
    };
    (status, Json(outcome))
}

async fn api_classify(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut image = Vec::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("image") => match field.bytes().await {
                Ok(bytes) => {
                    image = bytes.to_vec();
                    break;
                }
                Err(e) => return bad_request(e.body_text()),
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return bad_request(e.body_text()),
        }
    }

    classification_response(state.classifier.evaluate(&image).await).into_response()
}

#[derive(Deserialize)]
struct Base64Request {
    #[serde(default)]
    image: Option<String>,
}

async fn api_classify_base64(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Base64Request>,
) -> (StatusCode, Json<ClassificationOutcome>) {
    let text = request.image.unwrap_or_default();
    classification_response(state.classifier.evaluate_base64(&text).await)
}

fn bad_request(message: String) -> Response {
    warn!("Rejected upload: {}", message);
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

// === Model and metadata ===

#[derive(Serialize)]
struct ModelInfo {
    ready: bool,
    loading: bool,
    labels_version: String,
    classes: usize,
    threshold: f32,
}

async fn api_model(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let classifier = &state.classifier;
    let ready = classifier.model().is_ready();
    Json(ModelInfo {
        ready,
        loading: !ready,
        labels_version: classifier.labels().version.clone(),
        classes: classifier.labels().len(),
        threshold: classifier.threshold(),
    })
}

async fn api_labels(State(state): State<Arc<AppState>>) -> Json<LabelTable> {
    Json(state.classifier.labels().clone())
}

async fn api_heritage(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Json<Enrichment> {
    Json(state.classifier.enricher().enrich(&id).await)
}

/// Start the web server
pub async fn start_server(config: AppConfig, db: Database) -> crate::Result<()> {
    let state = Arc::new(AppState::from_config(config.clone(), db)?);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API available at http://{}/api", addr);

    let router = create_router(state);
    axum::serve(listener, router).await
        .map_err(|e| crate::TurathError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signup::registrar::tests::FakeAuth;
    use crate::vision::model::tests::{FixedModel, SlowModel};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::Value;
    use std::io::Cursor;
    use tower::ServiceExt;

    fn state(probabilities: Option<Vec<f32>>) -> (Arc<AppState>, Database) {
        state_with(probabilities.map(|p| Arc::new(FixedModel(p)) as Arc<dyn ModelRuntime>))
    }

    fn state_with(runtime: Option<Arc<dyn ModelRuntime>>) -> (Arc<AppState>, Database) {
        let db = Database::in_memory().unwrap();
        let store = Arc::new(db.clone());
        let config = AppConfig::default();

        let slot = Arc::new(ModelSlot::new());
        if let Some(runtime) = runtime {
            slot.install(runtime);
        }
        let classifier = Classifier::new(
            slot,
            Arc::new(LabelTable::builtin()),
            MetadataEnricher::new(store.clone(), "model"),
            &config.model,
        );
        let signup = SignUpService::new(Arc::new(FakeAuth::default()), store, "users");

        (Arc::new(AppState { signup, classifier, config }), db)
    }

    fn png_bytes() -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([200, 180, 150])))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn recognize(index: usize) -> Vec<f32> {
        let mut p = vec![0.0; 90];
        p[index] = 0.9;
        p
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _db) = state(None);
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_signup_registered_and_rejected() {
        let (state, db) = state(None);
        let form = json!({
            "firstName": "Fahad", "lastName": "Alotaibi", "birthday": "1990-01-01",
            "email": "fahad@example.com", "phoneNumber": "0500000000",
            "password": "Str0ng!pw", "confirmPassword": "Str0ng!pw"
        });

        let (status, body) = send(state.clone(), json_request("POST", "/api/signup", form.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "registered");
        assert!(db.get_document("users", "uid-1").unwrap().is_some());

        let (status, body) = send(state, json_request("POST", "/api/signup", form)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["email"]["kind"], "already_in_use");
    }

    #[tokio::test]
    async fn test_classify_before_model_ready() {
        let (state, _db) = state(None);
        let request = json_request("POST", "/api/classify/base64", json!({"image": "aGVsbG8="}));
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "Model not loaded yet");
    }

    #[tokio::test]
    async fn test_classify_base64_missing_image() {
        let (state, _db) = state(Some(recognize(0)));
        let (status, body) = send(state, json_request("POST", "/api/classify/base64", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No image picked or missing base64 data");
    }

    #[tokio::test]
    async fn test_classify_multipart_upload() {
        let (state, db) = state(Some(recognize(8)));
        let record = json!({"Id": "Almasmak palace", "Description": "Clay and mud-brick fort in Riyadh"});
        db.put_document("model", "masmak", record.as_object().unwrap()).unwrap();

        let boundary = "turath-test-boundary";
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n",
            b = boundary
        )
        .into_bytes();
        body.extend(png_bytes());
        body.extend(format!("\r\n--{}--\r\n", boundary).into_bytes());

        let request = Request::post("/api/classify")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "recognized");
        assert_eq!(body["message"], "Almasmak palace has been recognized");
        assert_eq!(body["additional_info"], "Clay and mud-brick fort in Riyadh");
    }

    #[tokio::test]
    async fn test_concurrent_classifications_both_succeed() {
        let (state, _db) = state_with(Some(Arc::new(SlowModel {
            probabilities: recognize(12),
            delay: Duration::from_millis(300),
        })));
        let text = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, png_bytes());
        let body = json!({"image": text});

        let ((status_a, body_a), (status_b, body_b)) = tokio::join!(
            send(state.clone(), json_request("POST", "/api/classify/base64", body.clone())),
            send(state.clone(), json_request("POST", "/api/classify/base64", body)),
        );
        assert_eq!(status_a, StatusCode::OK);
        assert_eq!(status_b, StatusCode::OK);
        assert_eq!(body_a["message"], "Uhud Castle has been recognized");
        assert_eq!(body_b["message"], "Uhud Castle has been recognized");
    }

    #[tokio::test]
    async fn test_concurrent_signups_both_register() {
        let (state, db) = state(None);
        let form = |email: &str, phone: &str| {
            json!({
                "firstName": "Fahad", "lastName": "Alotaibi", "birthday": "1990-01-01",
                "email": email, "phoneNumber": phone,
                "password": "Str0ng!pw", "confirmPassword": "Str0ng!pw"
            })
        };

        let ((status_a, _), (status_b, _)) = tokio::join!(
            send(state.clone(), json_request("POST", "/api/signup", form("a@example.com", "0500000001"))),
            send(state.clone(), json_request("POST", "/api/signup", form("b@example.com", "0500000002"))),
        );
        assert_eq!(status_a, StatusCode::CREATED);
        assert_eq!(status_b, StatusCode::CREATED);
        assert_eq!(db.find_by_field("users", "email", "b@example.com").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_model_info_and_labels() {
        let (state, _db) = state(Some(recognize(0)));

        let (status, body) = send(state.clone(), Request::get("/api/model").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["loading"], false);
        assert_eq!(body["classes"], 90);
        assert_eq!(body["labels_version"], "builtin-1");

        let (_, body) = send(state, Request::get("/api/labels").body(Body::empty()).unwrap()).await;
        assert_eq!(body["labels"][0], "Alwizaya palace");
    }

    #[tokio::test]
    async fn test_heritage_lookup() {
        let (state, _db) = state(None);
        let request = Request::get("/api/heritage/Marid%20palace").body(Body::empty()).unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"], "No additional information found");
        assert_eq!(body["records"], json!([]));
    }
}
