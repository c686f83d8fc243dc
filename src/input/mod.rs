use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayD, Axis, Ix3};
use ndarray_npy::{ReadNpyError, ReadNpzError, WriteNpyError};
use thiserror::Error;

pub mod dataset;
pub mod nifti;
pub mod npy;
pub mod npz;

use nifti::read_nifti;
use npy::read_npy_f32;
use npz::read_npz_array;

/// Array key holding the tumor concentration grid inside candidate `.npz` files.
pub const NPZ_VOLUME_KEY: &str = "data";

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("npy error: {0}")]
    Npy(#[from] ReadNpyError),
    #[error("npz error: {0}")]
    Npz(#[from] ReadNpzError),
    #[error("npy write error: {0}")]
    NpyWrite(#[from] WriteNpyError),
    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),
    #[error("shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        expected: String,
        actual: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Npy,
    Npz,
    Nifti,
}

pub fn detect_format(path: &Path) -> Option<VolumeFormat> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".npy") {
        Some(VolumeFormat::Npy)
    } else if name.ends_with(".npz") {
        Some(VolumeFormat::Npz)
    } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        Some(VolumeFormat::Nifti)
    } else {
        None
    }
}

pub fn load_array(path: &Path) -> Result<ArrayD<f32>, VolumeError> {
    if !path.exists() {
        return Err(VolumeError::MissingInput(path.display().to_string()));
    }
    match detect_format(path) {
        Some(VolumeFormat::Npy) => read_npy_f32(path),
        Some(VolumeFormat::Npz) => read_npz_array(path, NPZ_VOLUME_KEY),
        Some(VolumeFormat::Nifti) => read_nifti(path),
        None => Err(VolumeError::InvalidInput(format!(
            "unrecognized volume format: {}",
            path.display()
        ))),
    }
}

pub fn load_volume(path: &Path) -> Result<Array3<f32>, VolumeError> {
    into_volume(load_array(path)?)
}

/// Converts a decoded array into a row-major 3D grid, dropping leading
/// singleton axes (e.g. `(1, 1, 128, 128, 128)` batch/channel dims).
pub fn into_volume(mut array: ArrayD<f32>) -> Result<Array3<f32>, VolumeError> {
    while array.ndim() > 3 && array.shape()[0] == 1 {
        array = array.index_axis_move(Axis(0), 0);
    }
    let shape = array.shape().to_vec();
    let volume = array
        .into_dimensionality::<Ix3>()
        .map_err(|_| VolumeError::ShapeMismatch {
            expected: "a 3D volume".to_string(),
            actual: shape,
        })?;
    Ok(if volume.is_standard_layout() {
        volume
    } else {
        volume.as_standard_layout().into_owned()
    })
}

/// Returns the first `dir/<name>` that exists.
pub fn find_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
