extern crate tempfile;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const HOLDOUT_BIN: &str = env!("CARGO_BIN_EXE_mlp-classifier");
const SINGLE_BIN: &str = env!("CARGO_BIN_EXE_mlp-classifier-single");

fn write_dataset(dir: &Path, name: &str, rows: usize) -> PathBuf {
    let mut text = String::from("sepal,petal,label\n");
    for i in 0..rows {
        let (x, label) = if i % 2 == 0 { (-2.0, "setosa") } else { (2.0, "virginica") };
        let jitter = (i % 5) as f64 / 10.0;
        text.push_str(&format!("{:.2},{:.2},{}\n", x + jitter, -x + jitter, label));
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn run(bin: &str, args: &[&Path], flags: &[&str]) -> Output {
    Command::new(bin)
        .args(args)
        .args(flags)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout).lines().map(String::from).collect()
}

#[test]
fn missing_arguments_exit_with_usage() {
    let output = Command::new(HOLDOUT_BIN).arg("data.csv").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("USAGE"));

    let output = Command::new(SINGLE_BIN).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn non_numeric_seed_is_rejected() {
    let output = Command::new(HOLDOUT_BIN)
        .args(&["data.csv", "model.bin", "forty-two"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn train_then_predict_every_row() {
    let dir = TempDir::new().unwrap();
    let data = write_dataset(dir.path(), "iris.csv", 40);
    let model = dir.path().join("models").join("iris.bin");
    let seed = Path::new("42");

    let trained = run(HOLDOUT_BIN, &[&data, &model, seed], &[]);
    assert!(trained.status.success(), "{}", String::from_utf8_lossy(&trained.stderr));
    let report = stdout_lines(&trained);
    assert_eq!(report.len(), 2);
    assert!(report[0].starts_with("Validation accuracy: "));
    assert_eq!(report[1], "Model trained and saved successfully");

    let predicted = run(HOLDOUT_BIN, &[&data, &model, seed], &["--predict"]);
    assert!(predicted.status.success(), "{}", String::from_utf8_lossy(&predicted.stderr));
    let labels = stdout_lines(&predicted);
    assert_eq!(labels.len(), 40);
    assert!(labels.iter().all(|l| l == "setosa" || l == "virginica"));

    let proba = run(HOLDOUT_BIN, &[&data, &model, seed], &["--predict", "--proba"]);
    assert!(proba.status.success());
    assert!(stdout_lines(&proba).iter().all(|l| l.split(',').count() == 2));
}

#[test]
fn same_seed_writes_same_model() {
    let dir = TempDir::new().unwrap();
    let data = write_dataset(dir.path(), "data.csv", 30);
    let first = dir.path().join("first.bin");
    let second = dir.path().join("second.bin");
    let seed = Path::new("7");

    assert!(run(HOLDOUT_BIN, &[&data, &first, seed], &[]).status.success());
    assert!(run(HOLDOUT_BIN, &[&data, &second, seed], &[]).status.success());
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn predicting_without_model_fails() {
    let dir = TempDir::new().unwrap();
    let data = write_dataset(dir.path(), "data.csv", 4);
    let model = dir.path().join("absent.bin");

    let output = run(HOLDOUT_BIN, &[&data, &model, Path::new("1")], &["--predict"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_lines(&output).is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.bin"));
}

#[test]
fn single_variant_predicts_one_instance() {
    let dir = TempDir::new().unwrap();
    let data = write_dataset(dir.path(), "data.csv", 20);
    let model = dir.path().join("single.bin");

    let trained = run(SINGLE_BIN, &[&data, &model], &[]);
    assert!(trained.status.success(), "{}", String::from_utf8_lossy(&trained.stderr));
    assert_eq!(stdout_lines(&trained), vec!["Model trained and saved successfully".to_string()]);

    let predicted = run(SINGLE_BIN, &[&data, &model], &["--predict"]);
    assert!(predicted.status.success());
    assert_eq!(stdout_lines(&predicted).len(), 1);
}
