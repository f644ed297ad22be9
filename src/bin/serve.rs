use std::sync::Arc;

use anyhow::Context;
use maintenance_risk::web::{self, AppState};
use maintenance_risk::{logging, Predictor, ServeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init().context("failed to initialise logging")?;

    let config = ServeConfig::from_env();

    // loaded once; a failed load disables the form but keeps serving
    let predictor = Predictor::load(&config.artifact_paths());
    let state = Arc::new(AppState { predictor });

    web::serve(&config.bind_addr, state)
        .await
        .with_context(|| format!("server on {} stopped", config.bind_addr))
}
