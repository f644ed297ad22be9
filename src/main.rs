use anyhow::Context;
use maintenance_risk::{logging, run_training, Error, TrainConfig};
use tracing::info;

// training script and entry point
// Steps
// 1. Read settings
// 2. Make sure the data and model folders exist
// 3. Run the training pipeline
// 4. Report where the artifacts went

fn main() -> anyhow::Result<()> {
    logging::init().context("failed to initialise logging")?;
    info!("starting training script");

    // 1. read settings
    let config = TrainConfig::from_env();

    // 2. create the data and model folders
    if let Some(data_dir) = config.dataset_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
    }
    std::fs::create_dir_all(&config.model_dir)
        .with_context(|| format!("failed to create {}", config.model_dir.display()))?;

    // 3. train
    let summary = match run_training(&config) {
        Ok(summary) => summary,
        Err(Error::DatasetMissing(path)) => {
            eprintln!("Error: '{}' not found.", path.display());
            eprintln!("Please download the 'ai4i2020.csv' file and place it in the 'data' folder.");
            std::process::exit(1);
        }
        Err(err) => return Err(err).context("training failed"),
    };

    // 4. report
    println!(
        "Model trained on {} rows ({} after balancing). Balanced accuracy: {:.2}%",
        summary.dataset_rows,
        summary.balanced_rows,
        summary.accuracy() * 100.0
    );
    println!("Model, scaler and feature columns saved in '{}'.", summary.model_dir().display());

    Ok(())
}
