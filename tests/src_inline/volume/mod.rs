use super::*;

fn ramp(edge: usize) -> Array3<f32> {
    Array3::from_shape_fn((edge, edge, edge), |(x, y, z)| {
        (x * 10_000 + y * 100 + z) as f32
    })
}

#[test]
fn test_crop_129_to_128() {
    let vol = ramp(129);
    let cropped = crop_to_canonical(vol.clone()).unwrap();
    assert_eq!(cropped.dim(), (128, 128, 128));
    assert_eq!(cropped[(0, 0, 0)], vol[(0, 0, 0)]);
    assert_eq!(cropped[(127, 127, 127)], vol[(127, 127, 127)]);
    assert_eq!(cropped[(5, 77, 127)], vol[(5, 77, 127)]);
    assert_eq!(cropped, vol.slice(s![0..128, 0..128, 0..128]));
}

#[test]
fn test_crop_keeps_canonical() {
    let vol = Array3::from_elem((128, 128, 128), 0.5f32);
    let out = crop_to_canonical(vol.clone()).unwrap();
    assert_eq!(out, vol);
}

#[test]
fn test_crop_rejects_other_shapes() {
    let vol = Array3::<f32>::zeros((64, 64, 64));
    assert!(matches!(
        crop_to_canonical(vol),
        Err(VolumeError::ShapeMismatch { .. })
    ));
    let vol = Array3::<f32>::zeros((129, 128, 128));
    assert!(crop_to_canonical(vol).is_err());
}

#[test]
fn test_nearest_index_map_endpoints() {
    let m = nearest_index_map(128, 64);
    assert_eq!(m.len(), 64);
    assert_eq!(m[0], 0);
    assert_eq!(m[63], 127);
    // 127 / 63 ≈ 2.0159; dst 1 → 2.0159 → 2
    assert_eq!(m[1], 2);
    assert!(m.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(nearest_index_map(128, 1), vec![0]);
}

#[test]
fn test_downsample_shape_and_corners() {
    let vol = ramp(128);
    let small = downsample_nearest(&vol, 32);
    assert_eq!(small.dim(), (32, 32, 32));
    assert_eq!(small[(0, 0, 0)], vol[(0, 0, 0)]);
    assert_eq!(small[(31, 31, 31)], vol[(127, 127, 127)]);
}

#[test]
fn test_prepare_geometry_full_size_is_noop() {
    let vol = Array3::from_elem((128, 128, 128), 1.0f32);
    let out = prepare_geometry(vol.clone(), Some(128)).unwrap();
    assert_eq!(out, vol);
    let out = prepare_geometry(vol, Some(16)).unwrap();
    assert_eq!(out.dim(), (16, 16, 16));
}

#[test]
fn test_normalize_max_is_one() {
    let mut vol = Array3::from_shape_vec((1, 2, 3), vec![0.1, 0.3, 0.7, 0.0, 0.35, 0.2]).unwrap();
    let max = normalize_max(&mut vol);
    assert_eq!(max, 0.7);
    let new_max = vol.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    assert_eq!(new_max, 1.0);
    assert_eq!(vol[(0, 1, 1)], 0.35 / 0.7);
}

#[test]
fn test_normalize_zero_volume_untouched() {
    let mut vol = Array3::<f32>::zeros((2, 2, 2));
    assert_eq!(normalize_max(&mut vol), 0.0);
    assert!(vol.iter().all(|v| *v == 0.0));
}

#[test]
fn test_threshold_cutoffs_inclusive() {
    let vol = Array3::from_shape_vec((1, 1, 5), vec![0.19, 0.2, 0.59, 0.6, f32::NAN]).unwrap();
    let masks = derive_masks(&vol, &MaskThresholds::default_v1());
    assert_eq!(masks.flair.as_slice().unwrap(), &[0.0, 1.0, 1.0, 1.0, 0.0]);
    assert_eq!(masks.t1c.as_slice().unwrap(), &[0.0, 0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_threshold_idempotent() {
    let vol = Array3::from_shape_fn((4, 4, 4), |(x, y, z)| ((x * 7 + y * 3 + z) % 10) as f32 / 10.0);
    for cutoff in [0.2f32, 0.6] {
        let once = threshold(&vol, cutoff);
        let twice = threshold(&once, cutoff);
        assert_eq!(once, twice);
    }
}

#[test]
fn test_binarize_nonzero() {
    let vol = Array3::from_shape_vec((1, 1, 4), vec![0.0, 2.0, -1.0, 0.5]).unwrap();
    assert_eq!(
        binarize_nonzero(&vol).as_slice().unwrap(),
        &[0.0, 1.0, 0.0, 1.0]
    );
}
