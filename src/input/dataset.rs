use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::input::{VolumeError, find_existing};

/// Upper bound on the number of synthetic candidates considered in one run.
pub const MAX_CANDIDATES: usize = 50_000;
pub const FULL_SET_LABEL: &str = "50k";
pub const CANDIDATE_FILES: &[&str] = &["Data_0001.npz", "Data_0001.npy"];

/// Half-open `[start, end)` window over the sorted candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subset {
    pub start: usize,
    pub end: usize,
}

impl Subset {
    pub fn new(start: usize, end: usize) -> Result<Self, String> {
        if start > end {
            return Err(format!("subset start {} is after end {}", start, end));
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let start = self.start.min(items.len());
        let end = self.end.min(items.len());
        items.into_iter().skip(start).take(end - start).collect()
    }
}

impl FromStr for Subset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid subset '{}' (use START:END)", s))?;
        let start = a
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid subset start '{}'", a))?;
        let end = b
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid subset end '{}'", b))?;
        Subset::new(start, end)
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Label of the test set used in output paths: `50k` or the subset length.
pub fn testset_label(subset: Option<Subset>) -> String {
    match subset {
        Some(s) => s.len().to_string(),
        None => FULL_SET_LABEL.to_string(),
    }
}

/// Compares two all-digit IDs by numeric value without parsing into a fixed width.
pub fn numeric_cmp(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

pub fn is_candidate_id(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Lists numeric candidate folders, sorted numerically, capped and windowed.
pub fn list_candidate_ids(base: &Path, subset: Option<Subset>) -> Result<Vec<String>, VolumeError> {
    if !base.is_dir() {
        return Err(VolumeError::MissingInput(format!(
            "dataset directory {}",
            base.display()
        )));
    }
    let mut ids = Vec::new();
    for entry in std::fs::read_dir(base)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_candidate_id(&name) {
            ids.push(name);
        }
    }
    ids.sort_by(|a, b| numeric_cmp(a, b));
    ids.truncate(MAX_CANDIDATES);
    Ok(match subset {
        Some(s) => s.apply(ids),
        None => ids,
    })
}

pub fn candidate_path(base: &Path, id: &str) -> Result<PathBuf, VolumeError> {
    let dir = base.join(id);
    find_existing(&dir, CANDIDATE_FILES).ok_or_else(|| {
        VolumeError::MissingInput(format!(
            "candidate {}: no {} in {}",
            id,
            CANDIDATE_FILES.join(" or "),
            dir.display()
        ))
    })
}

/// Lists case directories under a real-tumor root in lexical order.
pub fn list_case_dirs(root: &Path) -> Result<Vec<String>, VolumeError> {
    if !root.is_dir() {
        return Err(VolumeError::MissingInput(format!(
            "case root {}",
            root.display()
        )));
    }
    let mut cases = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            cases.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    cases.sort();
    Ok(cases)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/dataset.rs"]
mod tests;
