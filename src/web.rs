use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::predictor::{
    InputField, Predictor, RiskAssessment, SensorReadings, AIR_TEMPERATURE, INPUT_FIELDS,
    PROCESS_TEMPERATURE, ROTATIONAL_SPEED, TOOL_WEAR, TORQUE,
};
use crate::schema::MachineType;

const PAGE_TITLE: &str = "Predictive Maintenance AI";
const MISSING_ARTIFACTS_MESSAGE: &str =
    "Model files not found. Please run `train` first to generate model and scaler.";

pub struct AppState {
    pub predictor: Predictor,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    artifacts_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Raw form submission; numbers stay strings until parsed so a bad value
/// shows up as an error on the page instead of a rejected request.
#[derive(Debug, Default, Deserialize)]
pub struct PredictForm {
    #[serde(default)]
    pub machine_type: String,
    #[serde(default)]
    pub air_temperature: String,
    #[serde(default)]
    pub process_temperature: String,
    #[serde(default)]
    pub rotational_speed: String,
    #[serde(default)]
    pub torque: String,
    #[serde(default)]
    pub tool_wear: String,
}

impl PredictForm {
    pub fn readings(&self) -> Result<SensorReadings, String> {
        let machine_type = MachineType::from_label(&self.machine_type)
            .ok_or_else(|| format!("unknown machine type `{}`", self.machine_type))?;

        let readings = SensorReadings {
            machine_type,
            air_temperature: parse_field(&AIR_TEMPERATURE, &self.air_temperature)?,
            process_temperature: parse_field(&PROCESS_TEMPERATURE, &self.process_temperature)?,
            rotational_speed: parse_field(&ROTATIONAL_SPEED, &self.rotational_speed)?,
            torque: parse_field(&TORQUE, &self.torque)?,
            tool_wear: parse_field(&TOOL_WEAR, &self.tool_wear)?,
        };
        Ok(readings.clamped())
    }

    /// Whatever parsed from the submission, with defaults standing in only
    /// for the values that did not. Used to refill the form after an error.
    pub fn submitted_readings(&self) -> SensorReadings {
        let keep = |field: &InputField, raw: &str| {
            parse_field(field, raw)
                .map(|value| field.clamp(value))
                .unwrap_or(field.default)
        };
        SensorReadings {
            machine_type: MachineType::from_label(&self.machine_type).unwrap_or_default(),
            air_temperature: keep(&AIR_TEMPERATURE, &self.air_temperature),
            process_temperature: keep(&PROCESS_TEMPERATURE, &self.process_temperature),
            rotational_speed: keep(&ROTATIONAL_SPEED, &self.rotational_speed),
            torque: keep(&TORQUE, &self.torque),
            tool_wear: keep(&TOOL_WEAR, &self.tool_wear),
        }
    }
}

fn parse_field(field: &InputField, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("{} must be a number, got `{}`", field.label, raw))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Assessed(RiskAssessment),
    Failed(String),
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "serving prediction form");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(
        state.predictor.is_ready(),
        &SensorReadings::default(),
        None,
    ))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PredictForm>,
) -> Html<String> {
    if let Some(reason) = state.predictor.unavailable_reason() {
        warn!(%reason, "prediction requested without model artifacts");
        return Html(render_page(false, &SensorReadings::default(), None));
    }

    let (readings, outcome) = match form.readings() {
        Ok(readings) => {
            let outcome = match state.predictor.assess(&readings) {
                Ok(assessment) => {
                    info!(?assessment, ?readings, "prediction served");
                    Outcome::Assessed(assessment)
                }
                Err(err) => {
                    warn!(error = %err, "prediction failed");
                    Outcome::Failed(err.to_string())
                }
            };
            (readings, outcome)
        }
        Err(message) => {
            warn!(%message, "rejected form input");
            (form.submitted_readings(), Outcome::Failed(message))
        }
    };

    Html(render_page(true, &readings, Some(&outcome)))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        artifacts_loaded: state.predictor.is_ready(),
        reason: state.predictor.unavailable_reason().map(str::to_string),
    })
}

pub fn render_page(ready: bool, readings: &SensorReadings, outcome: Option<&Outcome>) -> String {
    let mut body = String::new();

    if ready {
        body.push_str(&render_form(readings));
        if let Some(outcome) = outcome {
            body.push_str(&render_outcome(outcome));
        }
    } else {
        let _ = write!(
            body,
            r#"<div class="panel error">{}</div>"#,
            escape_html(MISSING_ARTIFACTS_MESSAGE)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 960px; margin: 2rem auto; }}
h1, .subtitle {{ text-align: center; }}
.columns {{ display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }}
label {{ display: block; margin-top: 0.75rem; }}
input, select {{ width: 100%; padding: 0.4rem; }}
button {{ width: 100%; margin-top: 1.5rem; padding: 0.7rem; }}
.panel {{ padding: 1rem; margin-top: 1rem; border-radius: 6px; }}
.error {{ background: #fde2e1; }}
.success {{ background: #def7e4; }}
.info {{ background: #e3eefc; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="subtitle">Predict machinery failure risk based on real-time sensor data.</p>
<hr>
{body}
<hr>
<footer>Developed using AI4I 2020 Predictive Maintenance Dataset.</footer>
</body>
</html>
"#,
        title = PAGE_TITLE,
        body = body,
    )
}

fn render_form(readings: &SensorReadings) -> String {
    let mut options = String::new();
    for machine_type in MachineType::ALL {
        let selected = if machine_type == readings.machine_type {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            r#"<option value="{0}"{1}>{0}</option>"#,
            machine_type.label(),
            selected
        );
    }

    // temperatures sit under the machine type, the rest in the second column
    let (left, right) = INPUT_FIELDS.split_at(2);
    let first_column = left
        .iter()
        .map(|field| render_number_input(field, readings.value(field)))
        .collect::<String>();
    let second_column = right
        .iter()
        .map(|field| render_number_input(field, readings.value(field)))
        .collect::<String>();

    format!(
        r#"<h2>Enter Machine Sensor Readings</h2>
<form method="post" action="/predict">
<div class="columns">
<div>
<label for="machine_type">Machine Type</label>
<select id="machine_type" name="machine_type">{options}</select>
{first_column}
</div>
<div>
{second_column}
</div>
</div>
<button type="submit">Analyze Failure Risk</button>
</form>
"#
    )
}

fn render_number_input(field: &InputField, value: f64) -> String {
    format!(
        r#"<label for="{key}">{label}</label>
<input type="number" id="{key}" name="{key}" min="{min}" max="{max}" step="any" value="{value}" required>
"#,
        key = field.key,
        label = escape_html(field.label),
        min = field.min,
        max = field.max,
        value = value,
    )
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Assessed(assessment) => {
            let class = match assessment {
                RiskAssessment::HighRisk => "error",
                RiskAssessment::Normal => "success",
            };
            format!(
                r#"<h2>Prediction Result</h2>
<div class="panel {class}"><strong>{}</strong></div>
<div class="panel info">{}</div>
"#,
                escape_html(assessment.headline()),
                escape_html(assessment.advice()),
            )
        }
        Outcome::Failed(message) => format!(
            r#"<div class="panel error">Error during prediction: {}</div>
"#,
            escape_html(message)
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
