use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;
use ndarray_npy::NpzReader;

use crate::input::VolumeError;
use crate::input::npy::{ArraySource, VoxelElement, read_as_f32};

/// An open `.npz` archive whose members are looked up by array key.
pub struct NpzArchive {
    path: PathBuf,
    reader: NpzReader<BufReader<File>>,
    names: Vec<String>,
}

impl NpzArchive {
    pub fn open(path: &Path) -> Result<Self, VolumeError> {
        let mut reader = NpzReader::new(BufReader::new(File::open(path)?))?;
        let names = reader.names()?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            names,
        })
    }

    /// Member name for `key`, with or without the `.npy` suffix.
    fn member(&self, key: &str) -> Option<String> {
        let with_suffix = format!("{key}.npy");
        self.names
            .iter()
            .find(|name| name.as_str() == key || **name == with_suffix)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.member(key).is_some()
    }

    pub fn array(&mut self, key: &str) -> Result<ArrayD<f32>, VolumeError> {
        let name = self.member(key).ok_or_else(|| {
            VolumeError::MissingInput(format!(
                "array '{}' not found in {}",
                key,
                self.path.display()
            ))
        })?;
        read_as_f32(&mut NpzMember {
            reader: &mut self.reader,
            name: &name,
        })
    }
}

struct NpzMember<'a> {
    reader: &'a mut NpzReader<BufReader<File>>,
    name: &'a str,
}

impl ArraySource for NpzMember<'_> {
    fn read<T: VoxelElement>(&mut self) -> Result<ArrayD<T>, VolumeError> {
        Ok(self.reader.by_name(self.name)?)
    }
}

pub fn read_npz_array(path: &Path, key: &str) -> Result<ArrayD<f32>, VolumeError> {
    NpzArchive::open(path)?.array(key)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/npz.rs"]
mod tests;
