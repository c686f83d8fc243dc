use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::scores::ScoreTable;
use crate::pipeline::scan::ScanOutput;
use crate::report::{ReportError, ScanOutputPaths};

fn to_json_bytes<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, ReportError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(bytes)?;
    w.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReportError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the score table and the best match. Either both files exist afterwards
/// or neither does; nothing is written if the table is empty.
pub fn write_scan_outputs(paths: &ScanOutputPaths, output: &ScanOutput) -> Result<(), ReportError> {
    if output.scores.is_empty() {
        return Err(ReportError::Invalid("refusing to write an empty score table".into()));
    }
    let scores = to_json_bytes(&paths.scores, &output.scores)?;
    let best = to_json_bytes(&paths.best, &output.best)?;
    fs::create_dir_all(&paths.dir)?;
    write_bytes(&paths.scores, &scores)?;
    if let Err(e) = write_bytes(&paths.best, &best) {
        if let Err(cleanup) = fs::remove_file(&paths.scores) {
            tracing::warn!(
                path = %paths.scores.display(),
                error = %cleanup,
                "could not remove score table after failed write"
            );
        }
        return Err(e);
    }
    tracing::info!(
        scores = %paths.scores.display(),
        best = %paths.best.display(),
        "wrote scan outputs"
    );
    Ok(())
}

pub fn read_score_table(path: &Path) -> Result<ScoreTable, ReportError> {
    let table: ScoreTable = read_json(path)?;
    if table.is_empty() {
        return Err(ReportError::Invalid(format!(
            "score table {} is empty",
            path.display()
        )));
    }
    Ok(table)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/json.rs"]
mod tests;
