use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::metric::SimilarityMetric;

pub mod json;
pub mod text;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid report input: {0}")]
    Invalid(String),
}

/// Files produced by one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutputPaths {
    pub dir: PathBuf,
    pub scores: PathBuf,
    pub best: PathBuf,
}

/// `<out>/<testset label>/dim_<edge>/<metric>/{<tumor_id>.json, <tumor_id>_best.json}`
pub fn scan_output_paths(
    out: &Path,
    testset_label: &str,
    edge: usize,
    metric: SimilarityMetric,
    tumor_id: &str,
) -> ScanOutputPaths {
    let dir = out
        .join(testset_label)
        .join(format!("dim_{edge}"))
        .join(metric.label());
    ScanOutputPaths {
        scores: dir.join(format!("{tumor_id}.json")),
        best: dir.join(format!("{tumor_id}_best.json")),
        dir,
    }
}

/// Final path component of the reference directory.
pub fn tumor_id(reference: &Path) -> Result<String, ReportError> {
    reference
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ReportError::Invalid(format!(
                "reference path {} has no final component",
                reference.display()
            ))
        })
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
