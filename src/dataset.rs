use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::schema::{MachineType, FEATURE_COLUMNS, TYPE_COLUMN};

pub fn load_csv_file(file_path: &Path) -> Result<DataFrame> {
    // a missing dataset is the one failure the trainer reports by itself
    if !file_path.exists() {
        return Err(Error::DatasetMissing(file_path.to_path_buf()));
    }

    let df = CsvReader::from_path(file_path)?.has_header(true).finish()?;

    info!(
        rows = df.height(),
        columns = df.width(),
        path = %file_path.display(),
        "dataset loaded"
    );
    debug!("{:?}", df.head(Some(5)));

    Ok(df)
}

/// Replaces the string `Type` column with its ordinal code (L=0, M=1, H=2).
pub fn encode_machine_type(df: &DataFrame) -> Result<DataFrame> {
    let raw = df.column(TYPE_COLUMN)?.cast(&DataType::Utf8)?;

    // unseen categories become nulls, same as an unmapped value
    let encoded: Float64Chunked = raw
        .utf8()?
        .into_iter()
        .map(|value| value.and_then(MachineType::from_label).map(MachineType::code))
        .collect();
    let encoded = encoded.with_name(TYPE_COLUMN);

    let unknown = encoded.null_count();
    if unknown > 0 {
        return Err(Error::UnknownMachineType { count: unknown });
    }

    let mut out = df.clone();
    out.with_column(encoded.into_series())?;
    Ok(out)
}

/// Reads a 0/1 label column.
pub fn label_values(df: &DataFrame, target: &str) -> Result<Vec<u8>> {
    let labels = df.column(target)?.cast(&DataType::Int64)?;

    labels
        .i64()?
        .into_iter()
        .map(|value| match value {
            Some(0) => Ok(0),
            Some(1) => Ok(1),
            Some(other) => Err(Error::InvalidLabel(other)),
            None => Err(Error::InvalidLabel(-1)),
        })
        .collect()
}

/// Selects the feature columns in training order as row-major vectors, plus
/// the label column.
pub fn split_features_and_target(
    df: &DataFrame,
    target: &str,
) -> Result<(Vec<Vec<f64>>, Vec<u8>)> {
    let mut columns = Vec::with_capacity(FEATURE_COLUMNS.len());
    for name in FEATURE_COLUMNS {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        let values: Vec<f64> = column
            .f64()?
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect();
        columns.push(values);
    }

    // transpose column vectors into rows
    let rows = (0..df.height())
        .map(|row| columns.iter().map(|column| column[row]).collect())
        .collect();

    let target = label_values(df, target)?;

    Ok((rows, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;

    fn sample_frame(types: &[&str]) -> DataFrame {
        let n = types.len();
        df!(
            TYPE_COLUMN => types,
            AIR_TEMPERATURE_COLUMN => vec![298.1; n],
            PROCESS_TEMPERATURE_COLUMN => vec![308.6; n],
            ROTATIONAL_SPEED_COLUMN => vec![1551i64; n],
            TORQUE_COLUMN => vec![42.8; n],
            TOOL_WEAR_COLUMN => vec![0i64; n],
            TARGET_COLUMN => (0..n as i64).map(|i| i % 2).collect::<Vec<_>>()
        )
        .unwrap()
    }

    #[test]
    fn machine_type_is_encoded_in_place() {
        let df = sample_frame(&["L", "M", "H"]);
        let encoded = encode_machine_type(&df).unwrap();
        let codes: Vec<Option<f64>> = encoded
            .column(TYPE_COLUMN)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some(0.0), Some(1.0), Some(2.0)]);
        assert_eq!(encoded.width(), df.width());
    }

    #[test]
    fn unknown_machine_type_fails_encoding() {
        let df = sample_frame(&["L", "Z", "Q"]);
        match encode_machine_type(&df) {
            Err(Error::UnknownMachineType { count }) => assert_eq!(count, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn features_follow_training_column_order() {
        let df = encode_machine_type(&sample_frame(&["H", "L"])).unwrap();
        let (x, y) = split_features_and_target(&df, TARGET_COLUMN).unwrap();
        assert_eq!(x.len(), 2);
        assert_eq!(x[0], vec![2.0, 298.1, 308.6, 1551.0, 42.8, 0.0]);
        assert_eq!(x[1][0], 0.0);
        assert_eq!(y, vec![0, 1]);
    }

    #[test]
    fn labels_outside_zero_and_one_are_rejected() {
        let df = df!(TARGET_COLUMN => &[0i64, 1, 3]).unwrap();
        assert!(matches!(
            label_values(&df, TARGET_COLUMN),
            Err(Error::InvalidLabel(3))
        ));
    }

    #[test]
    fn missing_dataset_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(matches!(load_csv_file(&path), Err(Error::DatasetMissing(_))));
    }
}
