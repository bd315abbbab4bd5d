use std::fs;
use std::io::Write;
use std::path::Path;

use rand::{SeedableRng, StdRng};

use crate::artifact::Artifact;
use crate::classifier::MlpClassifier;
use crate::config::{RunConfig, Variant};
use crate::dataset;
use crate::error::Result;
use crate::scaler::StandardScaler;
use crate::split;
use crate::timing::Timing;

pub const TRAINED_MESSAGE: &str = "Model trained and saved successfully";

/// What a training run produced, besides the artifact on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub training_accuracy: f64,
    pub validation_accuracy: Option<f64>,
    pub n_iter: usize,
}

/// Seeds from both 32-bit halves so no seed bits are lost where `usize` is
/// 32 bits wide.
pub fn seeded_rng(seed: u64) -> StdRng {
    let words = [(seed & 0xffff_ffff) as usize, (seed >> 32) as usize];
    SeedableRng::from_seed(&words[..])
}

/// Creates the directory that will hold `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            debug!("Created directory {}", parent.display());
        }
    }

    Ok(())
}

/// Fits scaler and classifier on the CSV at `data_path` and writes the pair to
/// `model_path`. Report lines go to `out`.
pub fn train<W: Write>(
    data_path: &Path,
    model_path: &Path,
    config: &RunConfig,
    out: &mut W,
) -> Result<TrainReport> {
    config.hyperparameters.validate()?;
    let mut timing = Timing::new();
    let mut rng = seeded_rng(config.seed);

    timing.start("load");
    let data = dataset::load_csv(data_path)?;
    timing.stop("load");

    let (train, holdout) = match config.holdout_fraction {
        Some(fraction) => {
            let (train_idx, test_idx) = split::train_test_indices(data.examples_count(), fraction, &mut rng);
            (data.subset(&train_idx), Some(data.subset(&test_idx)))
        }
        None => (data, None),
    };
    info!(
        "Training on {} rows, holding out {}",
        train.examples_count(),
        holdout.as_ref().map(|h| h.examples_count()).unwrap_or(0)
    );

    timing.start("fit");
    let (scaler, scaled) = StandardScaler::fit_transform(&train.features)?;
    let classifier = MlpClassifier::fit(&scaled, &train.labels, &config.hyperparameters, &mut rng)?;
    timing.stop("fit");

    let training_accuracy = classifier.score(&scaled, &train.labels)?;
    info!("Training accuracy: {:.4} after {} iterations", training_accuracy, classifier.n_iter());

    let validation_accuracy = match holdout {
        Some(ref holdout) if holdout.examples_count() > 0 => {
            let scaled_holdout = scaler.transform(&holdout.features)?;
            Some(classifier.score(&scaled_holdout, &holdout.labels)?)
        }
        _ => None,
    };
    if let Some(accuracy) = validation_accuracy {
        writeln!(out, "Validation accuracy: {:.4}", accuracy)?;
    }

    let report = TrainReport {
        train_rows: train.examples_count(),
        holdout_rows: holdout.map(|h| h.examples_count()).unwrap_or(0),
        training_accuracy,
        validation_accuracy,
        n_iter: classifier.n_iter(),
    };

    timing.start("save");
    ensure_parent_dir(model_path)?;
    Artifact::new(classifier, scaler)?.write_to_file(model_path)?;
    timing.stop("save");
    debug!("{}", timing);

    writeln!(out, "{}", TRAINED_MESSAGE)?;
    Ok(report)
}

/// Loads the artifact at `model_path`, classifies the rows of `data_path` and
/// writes one line per row (only the first row for `Variant::Single`). With
/// `proba` each line holds the class probabilities instead of the label.
/// Returns the number of lines written.
pub fn predict<W: Write>(
    data_path: &Path,
    model_path: &Path,
    variant: Variant,
    proba: bool,
    out: &mut W,
) -> Result<usize> {
    let artifact = Artifact::load_from_file(model_path)?;
    let mut data = dataset::load_csv(data_path)?;
    if variant == Variant::Single && data.examples_count() > 1 {
        data = data.subset(&[0]);
    }

    let scaled = artifact.scaler.transform(&data.features)?;
    if proba {
        let probabilities = artifact.classifier.predict_proba(&scaled)?;
        for row in 0..probabilities.rows {
            let line: Vec<String> = probabilities.row(row).iter().map(|p| format!("{:.6}", p)).collect();
            writeln!(out, "{}", line.join(","))?;
        }
        return Ok(probabilities.rows);
    }

    let predictions = artifact.classifier.predict(&scaled)?;
    for label in &predictions {
        writeln!(out, "{}", label)?;
    }
    info!("Predicted {} rows", predictions.len());

    Ok(predictions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::Rng;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Two well separated blobs, labelled 0 and 1.
    fn write_blobs(dir: &TempDir, name: &str, rows: usize, n_features: usize) -> PathBuf {
        let mut text = String::new();
        let header: Vec<String> = (0..n_features).map(|j| format!("f{}", j)).collect();
        text.push_str(&header.join(","));
        text.push_str(",label\n");
        for i in 0..rows {
            let class = i % 2;
            let centre = if class == 0 { -3.0 } else { 3.0 };
            let cells: Vec<String> = (0..n_features)
                .map(|j| format!("{:.3}", centre + ((i * 7 + j * 3) % 11) as f64 / 10.0 - 0.5))
                .collect();
            text.push_str(&cells.join(","));
            text.push_str(&format!(",{}\n", class));
        }
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn quick(config: RunConfig) -> RunConfig {
        let mut hp = config.hyperparameters.clone();
        hp.max_iter = 60;
        config.with_hyperparameters(hp)
    }

    fn lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec()).unwrap().lines().map(String::from).collect()
    }

    #[test]
    fn seeds_differing_in_high_bits_give_different_streams() {
        let low: Vec<u32> = seeded_rng(5).gen_iter().take(4).collect();
        let high: Vec<u32> = seeded_rng(5 | (1 << 40)).gen_iter().take(4).collect();
        let again: Vec<u32> = seeded_rng(5).gen_iter().take(4).collect();

        assert_ne!(low, high);
        assert_eq!(low, again);
    }

    #[test]
    fn train_reports_and_creates_model_directory() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 40, 3);
        let model = dir.path().join("nested").join("deeper").join("model.bin");

        let mut out = Vec::new();
        let report = train(&data, &model, &quick(RunConfig::holdout(42)), &mut out).unwrap();

        assert!(model.exists());
        assert_eq!(report.holdout_rows, 8);
        assert_eq!(report.train_rows, 32);
        let printed = lines(&out);
        assert_eq!(printed.len(), 2);
        assert!(printed[0].starts_with("Validation accuracy: "));
        assert_eq!(printed[1], TRAINED_MESSAGE);
    }

    #[test]
    fn single_variant_trains_on_every_row_without_report() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 20, 2);
        let model = dir.path().join("model.bin");

        let mut out = Vec::new();
        let report = train(&data, &model, &quick(RunConfig::single(7)), &mut out).unwrap();

        assert_eq!(report.train_rows, 20);
        assert_eq!(report.validation_accuracy, None);
        assert_eq!(lines(&out), vec![TRAINED_MESSAGE.to_string()]);
    }

    #[test]
    fn predict_emits_one_line_per_row() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 30, 2);
        let model = dir.path().join("model.bin");
        train(&data, &model, &quick(RunConfig::holdout(1)), &mut Vec::new()).unwrap();

        let mut out = Vec::new();
        let written = predict(&data, &model, Variant::Holdout, false, &mut out).unwrap();
        assert_eq!(written, 30);
        assert_eq!(lines(&out).len(), 30);

        let mut out = Vec::new();
        predict(&data, &model, Variant::Single, false, &mut out).unwrap();
        assert_eq!(lines(&out).len(), 1);
    }

    #[test]
    fn saved_model_reproduces_training_accuracy() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 24, 2);
        let model = dir.path().join("model.bin");
        let report = train(&data, &model, &quick(RunConfig::single(3)), &mut Vec::new()).unwrap();

        let mut out = Vec::new();
        predict(&data, &model, Variant::Holdout, false, &mut out).unwrap();
        let truth = dataset::load_csv(&data).unwrap().labels;
        let predicted = lines(&out);
        let hits = predicted.iter().zip(&truth).filter(|(p, t)| p == t).count();

        assert_eq!(hits as f64 / truth.len() as f64, report.training_accuracy);
    }

    #[test]
    fn probabilities_have_one_column_per_class() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 20, 2);
        let model = dir.path().join("model.bin");
        train(&data, &model, &quick(RunConfig::single(5)), &mut Vec::new()).unwrap();

        let mut out = Vec::new();
        predict(&data, &model, Variant::Holdout, true, &mut out).unwrap();
        for line in lines(&out) {
            let sum: f64 = line.split(',').map(|p| p.parse::<f64>().unwrap()).sum();
            assert_eq!(line.split(',').count(), 2);
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn same_seed_writes_identical_artifacts() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 30, 2);
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        let config = quick(RunConfig::holdout(99));
        train(&data, &first, &config, &mut Vec::new()).unwrap();
        train(&data, &second, &config, &mut Vec::new()).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn missing_model_is_not_found() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "test.csv", 4, 2);
        let err = predict(&data, &dir.path().join("absent.bin"), Variant::Holdout, false, &mut Vec::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn feature_count_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        let data = write_blobs(&dir, "train.csv", 20, 2);
        let wide = write_blobs(&dir, "wide.csv", 4, 3);
        let model = dir.path().join("model.bin");
        train(&data, &model, &quick(RunConfig::single(2)), &mut Vec::new()).unwrap();

        match predict(&wide, &model, Variant::Holdout, false, &mut Vec::new()) {
            Err(Error::DimensionMismatch { expected, found }) => {
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
