use std::path::Path;

use tracing::info;

use crate::artifacts::{ArtifactBundle, ArtifactPaths};
use crate::config::TrainConfig;
use crate::dataset::{encode_machine_type, load_csv_file, split_features_and_target};
use crate::error::Result;
use crate::forest::RandomForest;
use crate::metrics::ClassificationReport;
use crate::sampling::{train_test_split, upsample_minority};
use crate::scaler::StandardScaler;
use crate::schema::{feature_column_names, TARGET_COLUMN};

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub dataset_rows: usize,
    pub balanced_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub report: ClassificationReport,
    pub artifacts: ArtifactPaths,
}

impl TrainingSummary {
    pub fn accuracy(&self) -> f64 {
        self.report.accuracy()
    }

    pub fn model_dir(&self) -> &Path {
        &self.artifacts.dir
    }
}

// Steps
// 1. Load the CSV file
// 2. Encode machine type
// 3. Balance classes
// 4. Stratified train/test split
// 5. Fit scaler on the train split only
// 6. Train the random forest
// 7. Evaluate on the test split
// 8. Save artifacts
pub fn run_training(config: &TrainConfig) -> Result<TrainingSummary> {
    // 1. load file
    let df = load_csv_file(&config.dataset_path)?;
    let dataset_rows = df.height();

    // 2. map L/M/H to 0/1/2
    let df = encode_machine_type(&df)?;

    // 3. upsample failures until both classes match
    let balanced = upsample_minority(&df, TARGET_COLUMN, config.seed)?;
    info!(rows = balanced.height(), columns = balanced.width(), "data balanced");

    // 4. split data into train and test set
    let (train_df, test_df) =
        train_test_split(&balanced, TARGET_COLUMN, config.test_ratio, config.seed)?;
    let (x_train, y_train) = split_features_and_target(&train_df, TARGET_COLUMN)?;
    let (x_test, y_test) = split_features_and_target(&test_df, TARGET_COLUMN)?;

    // 5. scale with statistics from the training rows
    let scaler = StandardScaler::fit(&x_train)?;
    let x_train = scaler.transform_rows(&x_train)?;
    let x_test = scaler.transform_rows(&x_test)?;

    // 6. train the forest
    info!(trees = config.n_trees, "training random forest");
    let model = RandomForest::fit(&x_train, &y_train, &config.forest_params())?;

    // 7. evaluate on the held-out rows
    let predicted = model.predict_rows(&x_test)?;
    let report = ClassificationReport::from_predictions(&y_test, &predicted);
    info!(
        accuracy = %format!("{:.2}%", report.accuracy() * 100.0),
        "model trained, balanced accuracy on test split"
    );
    info!(%report, "test split report");

    // 8. persist model, scaler and feature columns
    let artifacts = config.artifact_paths();
    let bundle = ArtifactBundle {
        model,
        scaler,
        feature_columns: feature_column_names(),
    };
    bundle.save(&artifacts)?;

    Ok(TrainingSummary {
        dataset_rows,
        balanced_rows: balanced.height(),
        train_rows: x_train.len(),
        test_rows: x_test.len(),
        report,
        artifacts,
    })
}
