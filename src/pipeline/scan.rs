use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::Array3;
use rayon::prelude::*;
use thiserror::Error;

use crate::input::dataset::candidate_path;
use crate::input::{VolumeError, find_existing, load_volume};
use crate::logging::log_progress;
use crate::model::metric::SimilarityMetric;
use crate::model::scores::{BestMatch, ScoreTable, ScoreTriple};
use crate::model::thresholds::{MaskChannel, MaskThresholds};
use crate::volume::{
    CANONICAL_EDGE, MaskPair, binarize_nonzero, derive_masks, normalize_max, prepare_geometry,
};

pub const T1C_MASK_FILES: &[&str] = &[
    "tumor_mask_t_to_atlas.nii",
    "tumor_mask_t_to_atlas.nii.gz",
    "tumor_mask_t_to_atlas.npy",
    "tumor_mask_t_to_atlas229.nii",
    "tumor_mask_t_to_atlas229.nii.gz",
];
pub const FLAIR_MASK_FILES: &[&str] = &[
    "tumor_mask_f_to_atlas.nii",
    "tumor_mask_f_to_atlas.nii.gz",
    "tumor_mask_f_to_atlas.npy",
    "tumor_mask_f_to_atlas229.nii",
    "tumor_mask_f_to_atlas229.nii.gz",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("reference: {0}")]
    Reference(#[source] VolumeError),
    #[error("candidate {id}: {source}")]
    Candidate {
        id: String,
        #[source]
        source: VolumeError,
    },
    #[error("no candidates to scan in {0}")]
    Empty(PathBuf),
    #[error(transparent)]
    Duplicate(#[from] crate::model::scores::DuplicateId),
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("invalid scan parameters: {0}")]
    InvalidParams(String),
}

#[derive(Debug, Clone)]
pub struct ScanParams {
    pub metric: SimilarityMetric,
    pub downsample_to: Option<usize>,
    pub thresholds: MaskThresholds,
    pub threads: usize,
}

impl ScanParams {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            metric,
            downsample_to: None,
            thresholds: MaskThresholds::default_v1(),
            threads: 1,
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if let Some(d) = self.downsample_to {
            if d == 0 || d > CANONICAL_EDGE {
                return Err(ScanError::InvalidParams(format!(
                    "downsample target must be in 1..={}, got {}",
                    CANONICAL_EDGE, d
                )));
            }
        }
        if self.threads == 0 {
            return Err(ScanError::InvalidParams(
                "threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Edge length used in output paths (`dim_<edge>`).
    pub fn effective_edge(&self) -> usize {
        self.downsample_to.unwrap_or(CANONICAL_EDGE)
    }
}

#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub scores: ScoreTable,
    pub best: BestMatch,
}

pub fn find_reference_mask(dir: &Path, channel: MaskChannel) -> Result<PathBuf, VolumeError> {
    let names = match channel {
        MaskChannel::T1c => T1C_MASK_FILES,
        MaskChannel::Flair => FLAIR_MASK_FILES,
    };
    find_existing(dir, names).ok_or_else(|| {
        VolumeError::MissingInput(format!(
            "{} mask ({}) in {}",
            channel.tag(),
            names.join(", "),
            dir.display()
        ))
    })
}

/// Loads one reference mask: crop, optional downsampling, then binarize.
pub fn load_reference_mask(
    dir: &Path,
    channel: MaskChannel,
    downsample_to: Option<usize>,
) -> Result<Array3<f32>, VolumeError> {
    let path = find_reference_mask(dir, channel)?;
    let volume = prepare_geometry(load_volume(&path)?, downsample_to)?;
    Ok(binarize_nonzero(&volume))
}

pub fn load_reference(dir: &Path, downsample_to: Option<usize>) -> Result<MaskPair, ScanError> {
    let t1c = load_reference_mask(dir, MaskChannel::T1c, downsample_to)
        .map_err(ScanError::Reference)?;
    let flair = load_reference_mask(dir, MaskChannel::Flair, downsample_to)
        .map_err(ScanError::Reference)?;
    tracing::info!(
        reference = %dir.display(),
        shape = ?t1c.shape(),
        t1c_voxels = t1c.iter().filter(|v| **v > 0.0).count(),
        flair_voxels = flair.iter().filter(|v| **v > 0.0).count(),
        "loaded reference masks"
    );
    Ok(MaskPair { t1c, flair })
}

/// Scores one already-loaded candidate volume against the reference masks.
pub fn score_volume(
    volume: Array3<f32>,
    reference: &MaskPair,
    params: &ScanParams,
) -> Result<ScoreTriple, VolumeError> {
    let mut volume = prepare_geometry(volume, params.downsample_to)?;
    normalize_max(&mut volume);
    let masks = derive_masks(&volume, &params.thresholds);
    let flair = params.metric.compare(&masks.flair, &reference.flair)?;
    let t1c = params.metric.compare(&masks.t1c, &reference.t1c)?;
    Ok(ScoreTriple::new(t1c, flair))
}

pub fn evaluate_candidate(
    dataset: &Path,
    id: &str,
    reference: &MaskPair,
    params: &ScanParams,
) -> Result<ScoreTriple, ScanError> {
    let wrap = |source: VolumeError| ScanError::Candidate {
        id: id.to_string(),
        source,
    };
    let path = candidate_path(dataset, id).map_err(wrap)?;
    let volume = load_volume(&path).map_err(wrap)?;
    score_volume(volume, reference, params).map_err(wrap)
}

/// Scores every candidate and picks the best; the first failing candidate aborts the run.
pub fn run_scan(
    dataset: &Path,
    ids: &[String],
    reference: &MaskPair,
    params: &ScanParams,
) -> Result<ScanOutput, ScanError> {
    params.validate()?;
    if ids.is_empty() {
        return Err(ScanError::Empty(dataset.to_path_buf()));
    }
    tracing::info!(
        candidates = ids.len(),
        threads = params.threads,
        metric = params.metric.label(),
        "starting scan"
    );

    let done = AtomicUsize::new(0);
    let total = ids.len();
    let score_one = |id: &String| -> Result<(String, ScoreTriple), ScanError> {
        let scores = evaluate_candidate(dataset, id, reference, params)?;
        log_progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
        Ok((id.clone(), scores))
    };

    let results: Vec<(String, ScoreTriple)> = if params.threads <= 1 {
        ids.iter().map(score_one).collect::<Result<_, _>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads)
            .build()?;
        pool.install(|| ids.par_iter().map(score_one).collect::<Result<_, _>>())?
    };

    let mut scores = ScoreTable::with_capacity(results.len());
    for (id, triple) in results {
        scores.insert(id, triple)?;
    }
    let best = scores
        .best(params.metric)
        .ok_or_else(|| ScanError::Empty(dataset.to_path_buf()))?;
    tracing::info!(
        partner = %best.partner,
        combined = best.best_score.combined,
        t1c = best.best_score.t1c,
        flair = best.best_score.flair,
        "best match"
    );
    Ok(ScanOutput { scores, best })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/scan.rs"]
mod tests;
