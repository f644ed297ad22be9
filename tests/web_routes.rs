use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use maintenance_risk::schema::feature_column_names;
use maintenance_risk::web::{router, AppState};
use maintenance_risk::{ArtifactBundle, ForestParams, Predictor, RandomForest, StandardScaler};
use tower::ServiceExt;

// failure whenever tool wear passes 200 minutes
fn bundle() -> ArtifactBundle {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..120 {
        let wear = (i * 2) as f64;
        x.push(vec![
            (i % 3) as f64,
            298.0 + (i % 5) as f64,
            308.0 + (i % 4) as f64,
            1400.0 + (i * 9 % 300) as f64,
            30.0 + (i % 20) as f64,
            wear,
        ]);
        y.push(u8::from(wear > 200.0));
    }
    let scaler = StandardScaler::fit(&x).unwrap();
    let scaled = scaler.transform_rows(&x).unwrap();
    let params = ForestParams {
        n_trees: 25,
        ..ForestParams::default()
    };
    ArtifactBundle {
        model: RandomForest::fit(&scaled, &y, &params).unwrap(),
        scaler,
        feature_columns: feature_column_names(),
    }
}

fn app(predictor: Predictor) -> Router {
    router(Arc::new(AppState { predictor }))
}

async fn body_text(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const DEFAULT_FORM: &str = "machine_type=M&air_temperature=298&process_temperature=308\
&rotational_speed=1500&torque=40&tool_wear=50";

#[tokio::test]
async fn missing_artifacts_disable_the_form() {
    let app = app(Predictor::Unavailable("no such file".to_string()));

    let (status, page) = body_text(app.clone(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Model files not found"));
    assert!(!page.contains("<form"));

    let (status, page) = body_text(app.clone(), post_form(DEFAULT_FORM)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Model files not found"));

    let (_, health) = body_text(app, get("/health")).await;
    assert_eq!(health, r#"{"artifacts_loaded":false,"reason":"no such file"}"#);
}

#[tokio::test]
async fn index_renders_the_form() {
    let (status, page) = body_text(app(Predictor::Ready(bundle())), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Predictive Maintenance AI"));
    assert!(page.contains("Analyze Failure Risk"));
    assert!(page.contains(r#"name="rotational_speed" min="1000" max="3000""#));
}

#[tokio::test]
async fn default_submission_is_normal() {
    let (status, page) = body_text(app(Predictor::Ready(bundle())), post_form(DEFAULT_FORM)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Machine Operating Normally"));
    assert!(page.contains("safe operational limits"));
}

#[tokio::test]
async fn worn_tool_is_high_risk() {
    let form = DEFAULT_FORM.replace("tool_wear=50", "tool_wear=240");
    let (_, page) = body_text(app(Predictor::Ready(bundle())), post_form(&form)).await;
    assert!(page.contains("High Failure Risk Detected!"));
    assert!(page.contains(r#"name="tool_wear" min="0" max="250" step="any" value="240""#));
}

#[tokio::test]
async fn bad_number_shows_an_error_banner() {
    let form = DEFAULT_FORM
        .replace("machine_type=M", "machine_type=H")
        .replace("torque=40", "torque=heavy")
        .replace("tool_wear=50", "tool_wear=240");
    let (status, page) = body_text(app(Predictor::Ready(bundle())), post_form(&form)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Error during prediction"));
    assert!(page.contains("<form"));
    // the values that did parse are still in the form
    assert!(page.contains(r#"<option value="H" selected>H</option>"#));
    assert!(page.contains(r#"name="tool_wear" min="0" max="250" step="any" value="240""#));
    assert!(page.contains(r#"name="torque" min="0" max="100" step="any" value="40""#));
}

#[tokio::test]
async fn health_reports_loaded_artifacts() {
    let (_, health) = body_text(app(Predictor::Ready(bundle())), get("/health")).await;
    assert_eq!(health, r#"{"artifacts_loaded":true}"#);
}
