use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::math::Matrix;

/// Tabular dataset: every column but the last is a numeric feature, the last
/// column is the class label.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub label_name: String,
    pub features: Matrix,
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn examples_count(&self) -> usize {
        self.features.rows
    }

    pub fn input_size(&self) -> usize {
        self.features.cols
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            label_name: self.label_name.clone(),
            features: self.features.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = read_csv(file)?;
    debug!(
        "Loaded {} rows x {} features from {}",
        dataset.examples_count(),
        dataset.input_size(),
        path.display()
    );

    Ok(dataset)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.len() < 2 {
        return Err(Error::InvalidDataset(format!(
            "expected at least one feature column and a label column, found {} column(s)",
            headers.len()
        )));
    }

    let label_idx = headers.len() - 1;
    let mut feature_mem = Vec::new();
    let mut labels = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        for (col_idx, value) in record.iter().enumerate().take(label_idx) {
            let parsed = value.parse::<f64>().map_err(|_| Error::InvalidValue {
                line,
                column: headers[col_idx].clone(),
                value: value.to_string(),
            })?;
            feature_mem.push(parsed);
        }
        labels.push(record.get(label_idx).unwrap_or("").to_string());
    }

    if labels.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let label_name = headers[label_idx].clone();
    let mut feature_names = headers;
    feature_names.truncate(label_idx);

    Ok(Dataset {
        features: Matrix::from_vec(labels.len(), feature_names.len(), feature_mem),
        feature_names,
        label_name,
        labels,
    })
}

/// Distinct labels in class order: numeric when every label is a number,
/// lexicographic otherwise.
pub fn class_labels(labels: &[String]) -> Vec<String> {
    let mut classes: Vec<String> = labels.to_vec();
    let numeric = classes.iter().all(|l| l.parse::<f64>().is_ok());
    if numeric {
        classes.sort_by(|a, b| compare_numeric(a, b));
    } else {
        classes.sort();
    }
    classes.dedup();

    return classes;
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let x = a.parse::<f64>().unwrap_or(0.0);
    let y = b.parse::<f64>().unwrap_or(0.0);
    x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b))
}
