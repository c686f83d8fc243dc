#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

const LANES: usize = 8;

pub fn sum_f32_f64(values: &[f32]) -> f64 {
    // Deterministic order: process chunks, but accumulate each lane in order.
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + LANES <= n {
            let v = _mm256_loadu_ps(values.as_ptr().add(i));
            let mut lanes = [0f32; LANES];
            _mm256_storeu_ps(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                sum += *lane as f64;
            }
            i += LANES;
        }
    }
    while i < n {
        sum += values[i] as f64;
        i += 1;
    }
    sum
}

pub fn max_f32(values: &[f32]) -> f32 {
    let mut max = f32::NEG_INFINITY;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + LANES <= n {
            let v = _mm256_loadu_ps(values.as_ptr().add(i));
            let mut lanes = [0f32; LANES];
            _mm256_storeu_ps(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                if *lane > max {
                    max = *lane;
                }
            }
            i += LANES;
        }
    }
    while i < n {
        let v = values[i];
        if v > max {
            max = v;
        }
        i += 1;
    }
    if max.is_finite() { max } else { 0.0 }
}

pub fn dot_f32_f64(a: &[f32], b: &[f32]) -> f64 {
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = a.len().min(b.len());
    unsafe {
        while i + LANES <= n {
            let va = _mm256_loadu_ps(a.as_ptr().add(i));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i));
            let prod = _mm256_mul_ps(va, vb);
            let mut lanes = [0f32; LANES];
            _mm256_storeu_ps(lanes.as_mut_ptr(), prod);
            for lane in &lanes {
                sum += *lane as f64;
            }
            i += LANES;
        }
    }
    while i < n {
        sum += (a[i] * b[i]) as f64;
        i += 1;
    }
    sum
}

pub fn sq_dist_f32_f64(a: &[f32], b: &[f32]) -> f64 {
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = a.len().min(b.len());
    unsafe {
        while i + LANES <= n {
            let va = _mm256_loadu_ps(a.as_ptr().add(i));
            let vb = _mm256_loadu_ps(b.as_ptr().add(i));
            let d = _mm256_sub_ps(va, vb);
            let sq = _mm256_mul_ps(d, d);
            let mut lanes = [0f32; LANES];
            _mm256_storeu_ps(lanes.as_mut_ptr(), sq);
            for lane in &lanes {
                sum += *lane as f64;
            }
            i += LANES;
        }
    }
    while i < n {
        let d = a[i] - b[i];
        sum += (d * d) as f64;
        i += 1;
    }
    sum
}

pub fn backend_name() -> &'static str {
    "avx2"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/avx2.rs"]
mod tests;
