//! Class balancing and stratified splitting.
//!
//! Both work on row indices and finish with a single `DataFrame::take`, so
//! every column travels with its label.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::dataset::label_values;
use crate::error::{Error, Result};

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let indices_ca = IdxCa::from_vec("", indices.iter().map(|&x| x as IdxSize).collect());
    Ok(df.take(&indices_ca)?)
}

fn indices_by_class(labels: &[u8]) -> [Vec<usize>; 2] {
    let mut classes = [Vec::new(), Vec::new()];
    for (idx, &label) in labels.iter().enumerate() {
        classes[label as usize].push(idx);
    }
    classes
}

/// Upsamples the minority class with replacement until both classes have the
/// majority's row count. Majority rows come first, followed by the drawn
/// minority rows. A frame whose classes are already even is returned as is.
pub fn upsample_minority(df: &DataFrame, target: &str, seed: u64) -> Result<DataFrame> {
    let labels = label_values(df, target)?;
    let [negatives, positives] = indices_by_class(&labels);

    if negatives.is_empty() {
        return Err(Error::MissingClass(0));
    }
    if positives.is_empty() {
        return Err(Error::MissingClass(1));
    }
    if negatives.len() == positives.len() {
        return Ok(df.clone());
    }

    let (majority, minority) = if negatives.len() > positives.len() {
        (negatives, positives)
    } else {
        (positives, negatives)
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let drawn: Vec<usize> = (0..majority.len())
        .map(|_| minority[rng.gen_range(0..minority.len())])
        .collect();

    let mut indices = majority;
    indices.extend(drawn);

    let balanced = take_rows(df, &indices)?;
    debug!(rows = balanced.height(), "minority class upsampled");
    Ok(balanced)
}

/// Splits rows into (train, test), holding out `perc_test_size` of each class.
pub fn train_test_split(
    df: &DataFrame,
    target: &str,
    perc_test_size: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    if df.height() == 0 {
        return Err(Error::EmptyInput);
    }

    let labels = label_values(df, target)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut train_indices = Vec::with_capacity(df.height());
    let mut test_indices = Vec::new();

    for mut class in indices_by_class(&labels) {
        // shuffle each class on its own so both splits keep the class ratio
        class.shuffle(&mut rng);
        let split_idx = (class.len() as f64 * perc_test_size).round() as usize;
        test_indices.extend_from_slice(&class[..split_idx]);
        train_indices.extend_from_slice(&class[split_idx..]);
    }

    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    let train_df = take_rows(df, &train_indices)?;
    let test_df = take_rows(df, &test_indices)?;

    Ok((train_df, test_df))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "Machine failure";

    fn frame(labels: &[i64]) -> DataFrame {
        let ids: Vec<i64> = (0..labels.len() as i64).collect();
        df!("UDI" => ids, TARGET => labels).unwrap()
    }

    fn class_counts(df: &DataFrame) -> (usize, usize) {
        let labels = label_values(df, TARGET).unwrap();
        let positives = labels.iter().filter(|&&l| l == 1).count();
        (labels.len() - positives, positives)
    }

    #[test]
    fn balanced_input_keeps_its_row_count() {
        let df = frame(&[0, 1, 0, 1, 1, 0]);
        let balanced = upsample_minority(&df, TARGET, 42).unwrap();
        assert_eq!(balanced.height(), df.height());
        assert_eq!(class_counts(&balanced), (3, 3));
    }

    #[test]
    fn minority_is_upsampled_to_majority_count() {
        let mut labels = vec![0i64; 97];
        labels.extend([1, 1, 1]);
        let balanced = upsample_minority(&frame(&labels), TARGET, 42).unwrap();
        assert_eq!(class_counts(&balanced), (97, 97));
        assert_eq!(balanced.height(), 194);
    }

    #[test]
    fn negative_class_is_upsampled_when_it_is_the_minority() {
        let labels = [1i64, 1, 1, 1, 0];
        let balanced = upsample_minority(&frame(&labels), TARGET, 42).unwrap();
        assert_eq!(class_counts(&balanced), (4, 4));
        let ids: Vec<i64> = balanced
            .column("UDI")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(&ids[..4], &[0, 1, 2, 3]);
        assert!(ids[4..].iter().all(|&id| id == 4));
    }

    #[test]
    fn upsampled_rows_come_from_the_minority() {
        let labels = [0i64, 0, 0, 0, 1];
        let balanced = upsample_minority(&frame(&labels), TARGET, 7).unwrap();
        let ids: Vec<Option<i64>> = balanced
            .column("UDI")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(&ids[..4], &[Some(0), Some(1), Some(2), Some(3)]);
        assert!(ids[4..].iter().all(|id| *id == Some(4)));
    }

    #[test]
    fn upsampling_is_reproducible_for_a_seed() {
        let labels: Vec<i64> = (0..50).map(|i| i64::from(i % 7 == 0)).collect();
        let df = frame(&labels);
        let ids = |df: &DataFrame| -> Vec<i64> {
            df.column("UDI").unwrap().i64().unwrap().into_no_null_iter().collect()
        };
        let a = upsample_minority(&df, TARGET, 42).unwrap();
        let b = upsample_minority(&df, TARGET, 42).unwrap();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn single_class_cannot_be_balanced() {
        let df = frame(&[0, 0, 0]);
        assert!(matches!(
            upsample_minority(&df, TARGET, 42),
            Err(Error::MissingClass(1))
        ));
    }

    #[test]
    fn split_is_stratified() {
        let labels: Vec<i64> = (0..100).map(|i| i64::from(i < 50)).collect();
        let (train, test) = train_test_split(&frame(&labels), TARGET, 0.2, 42).unwrap();
        assert_eq!(train.height(), 80);
        assert_eq!(test.height(), 20);
        assert_eq!(class_counts(&train), (40, 40));
        assert_eq!(class_counts(&test), (10, 10));
    }

    #[test]
    fn split_does_not_share_rows() {
        let labels: Vec<i64> = (0..40).map(|i| i % 2).collect();
        let (train, test) = train_test_split(&frame(&labels), TARGET, 0.25, 1).unwrap();
        let ids = |df: &DataFrame| -> Vec<i64> {
            df.column("UDI").unwrap().i64().unwrap().into_no_null_iter().collect()
        };
        let train_ids = ids(&train);
        assert!(ids(&test).iter().all(|id| !train_ids.contains(id)));
        assert_eq!(train_ids.len() + ids(&test).len(), 40);
    }
}
