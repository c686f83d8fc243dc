use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use memmap2::Mmap;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use crate::input::VolumeError;

const NIFTI1_HEADER_SIZE: i32 = 348;

#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub dims: Vec<usize>,
    pub datatype: i16,
    pub vox_offset: usize,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub big_endian: bool,
}

/// Reads a single-file NIfTI-1 image (`.nii` or `.nii.gz`).
///
/// Voxels are stored with the first axis fastest; the result is indexed so
/// that `data[(x, y, z)]` addresses the same voxel as the on-disk `(i, j, k)`.
pub fn read_nifti(path: &Path) -> Result<ArrayD<f32>, VolumeError> {
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");
    let result = if is_gz {
        let file = File::open(path)?;
        let mut bytes = Vec::new();
        GzDecoder::new(file).read_to_end(&mut bytes)?;
        parse_nifti(&bytes)
    } else {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        parse_nifti(&mmap[..])
    };
    result.map_err(|e| match e {
        VolumeError::Parse(msg) => VolumeError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

pub fn parse_nifti(bytes: &[u8]) -> Result<ArrayD<f32>, VolumeError> {
    let header = parse_header(bytes)?;
    let elem = VoxelType::from_code(header.datatype).ok_or_else(|| {
        VolumeError::UnsupportedDtype(format!("nifti datatype {}", header.datatype))
    })?;
    let count = header
        .dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            VolumeError::Parse(format!("voxel count of dims {:?} overflows", header.dims))
        })?;
    if bytes.len() < header.vox_offset {
        return Err(VolumeError::Parse("vox_offset beyond end of file".to_string()));
    }
    let mut data = decode_voxels(&bytes[header.vox_offset..], count, elem, header.big_endian)?;

    if header.scl_slope != 0.0 && header.scl_slope.is_finite() {
        let inter = if header.scl_inter.is_finite() {
            header.scl_inter
        } else {
            0.0
        };
        if header.scl_slope != 1.0 || inter != 0.0 {
            for v in &mut data {
                *v = *v * header.scl_slope + inter;
            }
        }
    }

    ArrayD::from_shape_vec(IxDyn(&header.dims).f(), data)
        .map_err(|e| VolumeError::Parse(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoxelType {
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    F32,
    F64,
}

impl VoxelType {
    fn from_code(code: i16) -> Option<Self> {
        match code {
            2 => Some(VoxelType::U8),
            4 => Some(VoxelType::I16),
            8 => Some(VoxelType::I32),
            16 => Some(VoxelType::F32),
            64 => Some(VoxelType::F64),
            256 => Some(VoxelType::I8),
            512 => Some(VoxelType::U16),
            768 => Some(VoxelType::U32),
            1024 => Some(VoxelType::I64),
            _ => None,
        }
    }

    fn size(self) -> usize {
        match self {
            VoxelType::U8 | VoxelType::I8 => 1,
            VoxelType::I16 | VoxelType::U16 => 2,
            VoxelType::I32 | VoxelType::U32 | VoxelType::F32 => 4,
            VoxelType::I64 | VoxelType::F64 => 8,
        }
    }
}

fn decode_voxels(
    bytes: &[u8],
    count: usize,
    elem: VoxelType,
    big_endian: bool,
) -> Result<Vec<f32>, VolumeError> {
    let size = elem.size();
    let needed = count
        .checked_mul(size)
        .ok_or_else(|| VolumeError::Parse("voxel byte length overflows".to_string()))?;
    if bytes.len() < needed {
        return Err(VolumeError::Parse(format!(
            "truncated voxel data: expected {} bytes, found {}",
            needed,
            bytes.len()
        )));
    }

    let mut out = Vec::with_capacity(count);
    for chunk in bytes[..needed].chunks_exact(size) {
        let mut buf = [0u8; 8];
        buf[..size].copy_from_slice(chunk);
        if big_endian {
            buf[..size].reverse();
        }
        // `buf` now holds the value little-endian, zero-extended.
        let v = match elem {
            VoxelType::U8 => buf[0] as f32,
            VoxelType::I8 => buf[0] as i8 as f32,
            VoxelType::I16 => i16::from_le_bytes([buf[0], buf[1]]) as f32,
            VoxelType::U16 => u16::from_le_bytes([buf[0], buf[1]]) as f32,
            VoxelType::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f32,
            VoxelType::U32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f32,
            VoxelType::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            VoxelType::I64 => i64::from_le_bytes(buf) as f32,
            VoxelType::F64 => f64::from_le_bytes(buf) as f32,
        };
        out.push(v);
    }
    Ok(out)
}

pub fn parse_header(bytes: &[u8]) -> Result<NiftiHeader, VolumeError> {
    if bytes.len() < NIFTI1_HEADER_SIZE as usize {
        return Err(VolumeError::Parse("file too small for a NIfTI-1 header".to_string()));
    }
    let big_endian = match read_i32(bytes, 0, false) {
        NIFTI1_HEADER_SIZE => false,
        _ if read_i32(bytes, 0, true) == NIFTI1_HEADER_SIZE => true,
        _ => {
            return Err(VolumeError::Parse(
                "sizeof_hdr is not 348; not a NIfTI-1 file".to_string(),
            ));
        }
    };
    let magic = &bytes[344..348];
    if magic != b"n+1\0" {
        return Err(VolumeError::InvalidInput(
            "only single-file NIfTI-1 images (magic n+1) are supported".to_string(),
        ));
    }

    let ndim = read_i16(bytes, 40, big_endian);
    if !(1..=7).contains(&ndim) {
        return Err(VolumeError::Parse(format!("invalid dim[0] = {}", ndim)));
    }
    let mut dims = Vec::with_capacity(ndim as usize);
    for axis in 0..ndim as usize {
        let d = read_i16(bytes, 42 + axis * 2, big_endian);
        if d < 1 {
            return Err(VolumeError::Parse(format!(
                "invalid dim[{}] = {}",
                axis + 1,
                d
            )));
        }
        dims.push(d as usize);
    }

    let vox_offset = read_f32(bytes, 108, big_endian);
    if !vox_offset.is_finite() || vox_offset < NIFTI1_HEADER_SIZE as f32 {
        return Err(VolumeError::Parse(format!(
            "invalid vox_offset {}",
            vox_offset
        )));
    }

    Ok(NiftiHeader {
        dims,
        datatype: read_i16(bytes, 70, big_endian),
        vox_offset: vox_offset as usize,
        scl_slope: read_f32(bytes, 112, big_endian),
        scl_inter: read_f32(bytes, 116, big_endian),
        big_endian,
    })
}

fn read_i16(bytes: &[u8], offset: usize, big_endian: bool) -> i16 {
    let b = [bytes[offset], bytes[offset + 1]];
    if big_endian {
        i16::from_be_bytes(b)
    } else {
        i16::from_le_bytes(b)
    }
}

fn read_i32(bytes: &[u8], offset: usize, big_endian: bool) -> i32 {
    let b = [
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ];
    if big_endian {
        i32::from_be_bytes(b)
    } else {
        i32::from_le_bytes(b)
    }
}

fn read_f32(bytes: &[u8], offset: usize, big_endian: bool) -> f32 {
    f32::from_bits(read_i32(bytes, offset, big_endian) as u32)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/nifti.rs"]
mod tests;
