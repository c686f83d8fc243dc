//! Geometry and intensity preprocessing for tumor volumes.

use ndarray::{Array3, s};

use crate::input::VolumeError;
use crate::model::thresholds::MaskThresholds;
use crate::simd;

pub const CANONICAL_EDGE: usize = 128;

/// Binary masks derived from one volume (or loaded for the reference tumor).
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPair {
    pub t1c: Array3<f32>,
    pub flair: Array3<f32>,
}

/// Keeps a 128³ grid; a 129³ grid loses index 128 on every axis. Anything else is rejected.
pub fn crop_to_canonical(volume: Array3<f32>) -> Result<Array3<f32>, VolumeError> {
    let e = CANONICAL_EDGE;
    match volume.dim() {
        (x, y, z) if (x, y, z) == (e, e, e) => Ok(volume),
        (x, y, z) if (x, y, z) == (e + 1, e + 1, e + 1) => {
            Ok(volume.slice(s![..e, ..e, ..e]).to_owned())
        }
        _ => Err(VolumeError::ShapeMismatch {
            expected: format!("{e}^3 or {}^3", e + 1),
            actual: volume.shape().to_vec(),
        }),
    }
}

/// Nearest-neighbour resize of every axis to `edge`, matching
/// `scipy.ndimage.zoom(order=0)`: `src = round(dst * (n_in - 1) / (n_out - 1))`.
pub fn downsample_nearest(volume: &Array3<f32>, edge: usize) -> Array3<f32> {
    let (nx, ny, nz) = volume.dim();
    let mx = nearest_index_map(nx, edge);
    let my = nearest_index_map(ny, edge);
    let mz = nearest_index_map(nz, edge);
    Array3::from_shape_fn((edge, edge, edge), |(x, y, z)| {
        volume[(mx[x], my[y], mz[z])]
    })
}

fn nearest_index_map(n_in: usize, n_out: usize) -> Vec<usize> {
    if n_out <= 1 || n_in <= 1 {
        return vec![0; n_out];
    }
    let scale = (n_in - 1) as f64 / (n_out - 1) as f64;
    (0..n_out)
        .map(|o| {
            let src = (o as f64 * scale + 0.5).floor() as usize;
            src.min(n_in - 1)
        })
        .collect()
}

/// Crop to the canonical cube, then optionally downsample.
pub fn prepare_geometry(
    volume: Array3<f32>,
    downsample_to: Option<usize>,
) -> Result<Array3<f32>, VolumeError> {
    let volume = crop_to_canonical(volume)?;
    Ok(match downsample_to {
        Some(edge) if edge != CANONICAL_EDGE => downsample_nearest(&volume, edge),
        _ => volume,
    })
}

/// Divides by the maximum when it is non-zero; returns the maximum seen.
pub fn normalize_max(volume: &mut Array3<f32>) -> f32 {
    let max = match volume.as_slice() {
        Some(values) => simd::max_f32(values),
        None => volume.iter().copied().fold(f32::NEG_INFINITY, f32::max),
    };
    if max != 0.0 && max.is_finite() {
        volume.mapv_inplace(|v| v / max);
    }
    max
}

/// `v >= cutoff` → 1, else 0 (NaN → 0).
pub fn threshold(volume: &Array3<f32>, cutoff: f32) -> Array3<f32> {
    volume.mapv(|v| if v >= cutoff { 1.0 } else { 0.0 })
}

/// `v > 0` → 1, else 0.
pub fn binarize_nonzero(volume: &Array3<f32>) -> Array3<f32> {
    volume.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

pub fn derive_masks(volume: &Array3<f32>, thresholds: &MaskThresholds) -> MaskPair {
    MaskPair {
        t1c: threshold(volume, thresholds.t1c),
        flair: threshold(volume, thresholds.flair),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/volume/mod.rs"]
mod tests;
