pub fn sum_f32_f64(values: &[f32]) -> f64 {
    let mut sum = 0f64;
    for &v in values {
        sum += v as f64;
    }
    sum
}

pub fn max_f32(values: &[f32]) -> f32 {
    let mut max = f32::NEG_INFINITY;
    for &v in values {
        if v > max {
            max = v;
        }
    }
    if max.is_finite() { max } else { 0.0 }
}

pub fn dot_f32_f64(a: &[f32], b: &[f32]) -> f64 {
    let mut sum = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        sum += (x * y) as f64;
    }
    sum
}

pub fn sq_dist_f32_f64(a: &[f32], b: &[f32]) -> f64 {
    let mut sum = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        let d = x - y;
        sum += (d * d) as f64;
    }
    sum
}

pub fn backend_name() -> &'static str {
    "scalar"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/scalar.rs"]
mod tests;
