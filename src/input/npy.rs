use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use ndarray_npy::{ReadNpyError, ReadNpzError, ReadableElement, WriteNpyExt};

use crate::input::VolumeError;

/// Element types accepted in volume files; everything is widened or narrowed to `f32`.
pub trait VoxelElement: ReadableElement + Copy {
    fn to_f32(self) -> f32;
}

macro_rules! voxel_element {
    ($($t:ty),*) => {
        $(impl VoxelElement for $t {
            fn to_f32(self) -> f32 {
                self as f32
            }
        })*
    };
}

voxel_element!(f32, f64, i8, u8, i16, u16, i32, u32, i64, u64);

impl VoxelElement for bool {
    fn to_f32(self) -> f32 {
        if self { 1.0 } else { 0.0 }
    }
}

/// Something an array of any supported element type can be read from.
pub trait ArraySource {
    fn read<T: VoxelElement>(&mut self) -> Result<ArrayD<T>, VolumeError>;
}

/// A standalone `.npy` file.
pub struct NpyFile<'a>(pub &'a Path);

impl ArraySource for NpyFile<'_> {
    fn read<T: VoxelElement>(&mut self) -> Result<ArrayD<T>, VolumeError> {
        Ok(ndarray_npy::read_npy(self.0)?)
    }
}

fn is_wrong_dtype(err: &VolumeError) -> bool {
    matches!(
        err,
        VolumeError::Npy(ReadNpyError::WrongDescriptor(_))
            | VolumeError::Npz(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_)))
    )
}

fn attempt<T: VoxelElement, S: ArraySource>(
    source: &mut S,
) -> Result<Option<ArrayD<f32>>, VolumeError> {
    match source.read::<T>() {
        Ok(array) => Ok(Some(array.mapv(T::to_f32))),
        Err(err) if is_wrong_dtype(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Reads an array as `f32`, trying the float types first and then the integer ones.
pub fn read_as_f32<S: ArraySource>(source: &mut S) -> Result<ArrayD<f32>, VolumeError> {
    let readers: [fn(&mut S) -> Result<Option<ArrayD<f32>>, VolumeError>; 11] = [
        attempt::<f32, S>,
        attempt::<f64, S>,
        attempt::<u8, S>,
        attempt::<bool, S>,
        attempt::<i8, S>,
        attempt::<i16, S>,
        attempt::<u16, S>,
        attempt::<i32, S>,
        attempt::<u32, S>,
        attempt::<i64, S>,
        attempt::<u64, S>,
    ];
    for read in readers {
        if let Some(array) = read(source)? {
            return Ok(array);
        }
    }
    Err(VolumeError::UnsupportedDtype(
        "array element type is not a real number or bool".to_string(),
    ))
}

pub fn read_npy_f32(path: &Path) -> Result<ArrayD<f32>, VolumeError> {
    read_as_f32(&mut NpyFile(path))
}

/// Writes a little-endian `f32` `.npy` file, creating parent directories.
pub fn write_npy_f32<S, D>(path: &Path, array: &ArrayBase<S, D>) -> Result<(), VolumeError>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    array.write_npy(&mut w)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/npy.rs"]
mod tests;
