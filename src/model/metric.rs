use std::borrow::Cow;
use std::cmp::Ordering;

use clap::ValueEnum;
use ndarray::Array3;

use crate::input::VolumeError;
use crate::simd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SimilarityMetric {
    Dice,
    L2,
}

impl SimilarityMetric {
    pub fn label(self) -> &'static str {
        match self {
            SimilarityMetric::Dice => "dice",
            SimilarityMetric::L2 => "l2",
        }
    }

    /// Dice is a similarity (higher wins); L2 is a distance (lower wins).
    pub fn higher_is_better(self) -> bool {
        match self {
            SimilarityMetric::Dice => true,
            SimilarityMetric::L2 => false,
        }
    }

    /// Strictly better; ties keep the incumbent.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        if self.higher_is_better() {
            candidate > incumbent
        } else {
            candidate < incumbent
        }
    }

    /// Orders scores best-first. NaN sorts last.
    pub fn rank_cmp(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                if self.higher_is_better() {
                    b.total_cmp(&a)
                } else {
                    a.total_cmp(&b)
                }
            }
        }
    }

    pub fn compare(self, mask: &Array3<f32>, reference: &Array3<f32>) -> Result<f64, VolumeError> {
        match self {
            SimilarityMetric::Dice => dice_coefficient(mask, reference),
            SimilarityMetric::L2 => l2_norm(mask, reference),
        }
    }
}

/// `2|A∩B| / (|A| + |B|)` over 0/1 masks. Two empty masks are identical (1.0).
pub fn dice_coefficient(a: &Array3<f32>, b: &Array3<f32>) -> Result<f64, VolumeError> {
    check_same_shape(a, b)?;
    let a = flat(a);
    let b = flat(b);
    let intersection = simd::dot_f32_f64(&a, &b);
    let denom = simd::sum_f32_f64(&a) + simd::sum_f32_f64(&b);
    if denom == 0.0 {
        return Ok(1.0);
    }
    Ok(2.0 * intersection / denom)
}

/// Euclidean distance between two grids.
pub fn l2_norm(a: &Array3<f32>, b: &Array3<f32>) -> Result<f64, VolumeError> {
    check_same_shape(a, b)?;
    let a = flat(a);
    let b = flat(b);
    Ok(simd::sq_dist_f32_f64(&a, &b).sqrt())
}

fn check_same_shape(a: &Array3<f32>, b: &Array3<f32>) -> Result<(), VolumeError> {
    if a.dim() != b.dim() {
        return Err(VolumeError::ShapeMismatch {
            expected: format!("{:?}", b.shape()),
            actual: a.shape().to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn flat(a: &Array3<f32>) -> Cow<'_, [f32]> {
    match a.as_slice() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(a.iter().copied().collect()),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/metric.rs"]
mod tests;
