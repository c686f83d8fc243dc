use std::path::{Path, PathBuf};

use clap::ValueEnum;
use ndarray::Array3;
use thiserror::Error;

use crate::input::VolumeError;
use crate::input::npz::NpzArchive;
use crate::simd;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Volume(#[from] VolumeError),
    #[error("failed to load checkpoint {path}: {reason}")]
    Checkpoint { path: PathBuf, reason: String },
    #[error("case {id}: {source}")]
    Case {
        id: String,
        #[source]
        source: VolumeError,
    },
    #[error("encoder cannot pool a {actual:?} volume into {pool}^3 cells")]
    PoolShape { actual: Vec<usize>, pool: usize },
    #[error("no cases to encode in {0}")]
    Empty(PathBuf),
}

/// Architecture variants; only the encoding half is ever evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum EncoderKind {
    Plain,
    Variational,
    Hash,
}

impl EncoderKind {
    /// Suffix appended to `encoded` in output directory names.
    pub fn dir_suffix(self) -> &'static str {
        match self {
            EncoderKind::Plain => "",
            EncoderKind::Variational => "_VAE",
            EncoderKind::Hash => "_HASH",
        }
    }
}

/// A pure function from volume to latent vector with fixed weights.
pub trait Encoder {
    fn latent_dim(&self) -> usize;
    fn encode(&self, volume: &Array3<f32>) -> Result<Vec<f32>, EncodeError>;
}

/// Average-pool to `pool³` cells, then one affine layer.
#[derive(Debug, Clone)]
pub struct LinearEncoder {
    kind: EncoderKind,
    pool: usize,
    latent_dim: usize,
    weight: Vec<f32>,
    bias: Vec<f32>,
}

impl LinearEncoder {
    pub fn new(
        kind: EncoderKind,
        weight: Vec<f32>,
        bias: Vec<f32>,
    ) -> Result<Self, String> {
        let latent_dim = bias.len();
        if latent_dim == 0 {
            return Err("bias is empty".to_string());
        }
        if weight.len() % latent_dim != 0 {
            return Err(format!(
                "weight has {} values, not a multiple of latent_dim {}",
                weight.len(),
                latent_dim
            ));
        }
        let features = weight.len() / latent_dim;
        let pool = cube_root(features)
            .ok_or_else(|| format!("weight width {} is not a perfect cube", features))?;
        Ok(Self {
            kind,
            pool,
            latent_dim,
            weight,
            bias,
        })
    }

    /// Loads `weight` (`latent × pool³`) and `bias` (`latent`) from an `.npz` checkpoint.
    /// The variational mean head may be stored as `mu_weight`/`mu_bias` instead.
    pub fn from_checkpoint(path: &Path, kind: EncoderKind) -> Result<Self, EncodeError> {
        let fail = |reason: String| EncodeError::Checkpoint {
            path: path.to_path_buf(),
            reason,
        };
        let mut archive = NpzArchive::open(path).map_err(|e| fail(e.to_string()))?;
        let (w_key, b_key) = if kind == EncoderKind::Variational && archive.contains("mu_weight") {
            ("mu_weight", "mu_bias")
        } else {
            ("weight", "bias")
        };
        let weight = archive.array(w_key).map_err(|e| fail(e.to_string()))?;
        let bias = archive.array(b_key).map_err(|e| fail(e.to_string()))?;
        if weight.ndim() != 2 {
            return Err(fail(format!(
                "'{}' must be 2D, found shape {:?}",
                w_key,
                weight.shape()
            )));
        }
        if bias.len() != weight.shape()[0] {
            return Err(fail(format!(
                "'{}' has {} values but '{}' has {} rows",
                b_key,
                bias.len(),
                w_key,
                weight.shape()[0]
            )));
        }
        let weight = weight.iter().copied().collect();
        let bias = bias.iter().copied().collect();
        Self::new(kind, weight, bias).map_err(fail)
    }

    pub fn kind(&self) -> EncoderKind {
        self.kind
    }

    pub fn pool(&self) -> usize {
        self.pool
    }
}

impl Encoder for LinearEncoder {
    fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn encode(&self, volume: &Array3<f32>) -> Result<Vec<f32>, EncodeError> {
        let pooled = average_pool(volume, self.pool)?;
        let features = pooled.len();
        let mut out = Vec::with_capacity(self.latent_dim);
        for (row, &b) in self.weight.chunks_exact(features).zip(&self.bias) {
            let v = (simd::dot_f32_f64(row, &pooled) + b as f64) as f32;
            out.push(match self.kind {
                EncoderKind::Hash => {
                    if v > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                EncoderKind::Plain | EncoderKind::Variational => v,
            });
        }
        Ok(out)
    }
}

/// Mean over non-overlapping blocks; every axis must divide evenly by `pool`.
pub fn average_pool(volume: &Array3<f32>, pool: usize) -> Result<Vec<f32>, EncodeError> {
    let (nx, ny, nz) = volume.dim();
    if pool == 0 || nx % pool != 0 || ny % pool != 0 || nz % pool != 0 {
        return Err(EncodeError::PoolShape {
            actual: volume.shape().to_vec(),
            pool,
        });
    }
    let (bx, by, bz) = (nx / pool, ny / pool, nz / pool);
    let block = (bx * by * bz) as f64;
    let mut sums = vec![0f64; pool * pool * pool];
    for ((x, y, z), &v) in volume.indexed_iter() {
        let cell = (x / bx) * pool * pool + (y / by) * pool + z / bz;
        sums[cell] += v as f64;
    }
    Ok(sums.into_iter().map(|s| (s / block) as f32).collect())
}

fn cube_root(n: usize) -> Option<usize> {
    let guess = (n as f64).cbrt().round() as usize;
    (guess.saturating_sub(1)..=guess + 1).find(|&c| c > 0 && c * c * c == n)
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/encoder.rs"]
mod tests;
