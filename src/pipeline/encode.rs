use std::path::{Path, PathBuf};

use clap::ValueEnum;
use ndarray::{Array2, Array3};

use crate::input::VolumeError;
use crate::input::dataset::{
    Subset, candidate_path, list_candidate_ids, list_case_dirs, testset_label,
};
use crate::input::load_volume;
use crate::input::npy::write_npy_f32;
use crate::logging::log_progress;
use crate::model::encoder::{EncodeError, Encoder, EncoderKind};
use crate::model::thresholds::{MaskChannel, MaskThresholds};
use crate::pipeline::scan::{find_reference_mask, load_reference_mask};
use crate::volume::{normalize_max, prepare_geometry, threshold};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncodeSource {
    /// Patient cases: one directory per case holding registered masks.
    Real,
    /// Simulated candidates from the numbered dataset.
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct EncodeParams {
    pub source: EncodeSource,
    pub channel: MaskChannel,
    pub kind: EncoderKind,
    pub subset: Option<Subset>,
    pub downsample_to: Option<usize>,
    pub thresholds: MaskThresholds,
}

impl EncodeParams {
    pub fn new(source: EncodeSource, channel: MaskChannel, kind: EncoderKind) -> Self {
        Self {
            source,
            channel,
            kind,
            subset: None,
            downsample_to: None,
            thresholds: MaskThresholds::default_v1(),
        }
    }

    /// `real` or `syn_<testset size>`.
    pub fn source_label(&self) -> String {
        match self.source {
            EncodeSource::Real => "real".to_string(),
            EncodeSource::Synthetic => format!("syn_{}", testset_label(self.subset)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodeSummary {
    pub out_dir: PathBuf,
    pub encoded: usize,
}

/// `<out>/encoded<suffix>_<CHANNEL>_<latent>/<source label>`
pub fn output_dir(out: &Path, params: &EncodeParams, latent_dim: usize) -> PathBuf {
    out.join(format!(
        "encoded{}_{}_{}",
        params.kind.dir_suffix(),
        params.channel.tag(),
        latent_dim
    ))
    .join(params.source_label())
}

/// Ordered item IDs for the configured source.
pub fn collect_items(root: &Path, params: &EncodeParams) -> Result<Vec<String>, VolumeError> {
    match params.source {
        EncodeSource::Synthetic => list_candidate_ids(root, params.subset),
        EncodeSource::Real => {
            let cases = list_case_dirs(root)?;
            let mut kept = Vec::with_capacity(cases.len());
            for case in cases {
                if find_reference_mask(&root.join(&case), params.channel).is_ok() {
                    kept.push(case);
                } else {
                    tracing::debug!(case = %case, "skipping case without mask");
                }
            }
            Ok(match params.subset {
                Some(s) => s.apply(kept),
                None => kept,
            })
        }
    }
}

/// Loads one item as the binary mask the encoder consumes.
pub fn prepare_item(
    root: &Path,
    id: &str,
    params: &EncodeParams,
) -> Result<Array3<f32>, VolumeError> {
    match params.source {
        EncodeSource::Real => {
            load_reference_mask(&root.join(id), params.channel, params.downsample_to)
        }
        EncodeSource::Synthetic => {
            let path = candidate_path(root, id)?;
            let mut volume = prepare_geometry(load_volume(&path)?, params.downsample_to)?;
            normalize_max(&mut volume);
            Ok(threshold(&volume, params.thresholds.cutoff(params.channel)))
        }
    }
}

/// Encodes every item in order and writes `<id>.npy` of shape `(1, latent_dim)`.
pub fn run_encode<E: Encoder>(
    root: &Path,
    out: &Path,
    encoder: &E,
    params: &EncodeParams,
) -> Result<EncodeSummary, EncodeError> {
    let ids = collect_items(root, params)?;
    if ids.is_empty() {
        return Err(EncodeError::Empty(root.to_path_buf()));
    }
    let latent_dim = encoder.latent_dim();
    let out_dir = output_dir(out, params, latent_dim);
    std::fs::create_dir_all(&out_dir).map_err(VolumeError::from)?;
    tracing::info!(
        items = ids.len(),
        source = %params.source_label(),
        channel = params.channel.tag(),
        latent_dim,
        out_dir = %out_dir.display(),
        "starting encode"
    );

    let total = ids.len();
    for (i, id) in ids.iter().enumerate() {
        let mask = prepare_item(root, id, params).map_err(|source| EncodeError::Case {
            id: id.clone(),
            source,
        })?;
        let latent = Array2::from_shape_vec((1, latent_dim), encoder.encode(&mask)?)
            .map_err(|e| VolumeError::InvalidInput(format!("latent for {id}: {e}")))?;
        write_npy_f32(&out_dir.join(format!("{id}.npy")), &latent)?;
        log_progress(i + 1, total);
    }

    Ok(EncodeSummary {
        out_dir,
        encoded: total,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/encode.rs"]
mod tests;
