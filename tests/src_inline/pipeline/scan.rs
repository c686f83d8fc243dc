use super::*;
use crate::input::npy::write_npy_f32;
use crate::volume::threshold;
use std::fs;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("tumorsim_scan_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A 10-voxel slab starting at `offset` along x: a dense core (both masks)
/// followed by a faint rim (FLAIR only after normalization).
fn candidate(edge: usize, offset: usize) -> Array3<f32> {
    Array3::from_shape_fn((edge, edge, edge), |(x, y, z)| {
        if x >= offset && x < offset + 10 && y < 10 && z < 10 {
            if x < offset + 5 { 2.0 } else { 0.8 }
        } else {
            0.0
        }
    })
}

fn write_volume(path: &Path, vol: &Array3<f32>) {
    write_npy_f32(path, vol).unwrap();
}

/// Dataset with candidates 1, 2, 3 and a reference equal to candidate 2's masks.
fn build_fixture() -> (PathBuf, PathBuf) {
    let root = make_temp_dir();
    let dataset = root.join("Dataset");
    for (id, offset) in [("1", 0usize), ("2", 20), ("3", 25)] {
        let dir = dataset.join(id);
        fs::create_dir_all(&dir).unwrap();
        write_volume(&dir.join("Data_0001.npy"), &candidate(128, offset));
    }

    let reference = root.join("tgm001_preop");
    fs::create_dir_all(&reference).unwrap();
    let mut vol = candidate(128, 20);
    normalize_max(&mut vol);
    write_volume(
        &reference.join("tumor_mask_t_to_atlas.npy"),
        &threshold(&vol, 0.6),
    );
    write_volume(
        &reference.join("tumor_mask_f_to_atlas.npy"),
        &threshold(&vol, 0.2),
    );
    (dataset, reference)
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_dice_scan_selects_identical_candidate() {
    let (dataset, reference_dir) = build_fixture();
    let reference = load_reference(&reference_dir, None).unwrap();
    let params = ScanParams::new(SimilarityMetric::Dice);
    let out = run_scan(&dataset, &ids(&["1", "2", "3"]), &reference, &params).unwrap();

    assert_eq!(out.scores.len(), 3);
    assert_eq!(out.scores.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec!["1", "2", "3"]);
    assert_eq!(out.best.partner, "2");
    assert_eq!(out.best.best_score.t1c, 1.0);
    assert_eq!(out.best.best_score.flair, 1.0);
    assert_eq!(out.best.best_score.combined, 2.0);
    assert_eq!(out.scores.get("1").unwrap().combined, 0.0);
    let partial = out.scores.get("3").unwrap();
    assert!(partial.combined > 0.0 && partial.combined < 2.0);
}

#[test]
fn test_l2_scan_selects_minimum() {
    let (dataset, reference_dir) = build_fixture();
    let reference = load_reference(&reference_dir, None).unwrap();
    let params = ScanParams::new(SimilarityMetric::L2);
    let out = run_scan(&dataset, &ids(&["1", "2", "3"]), &reference, &params).unwrap();

    assert_eq!(out.best.partner, "2");
    assert_eq!(out.best.best_score.combined, 0.0);
    assert!(out.scores.get("1").unwrap().combined > out.scores.get("3").unwrap().combined);
}

#[test]
fn test_parallel_matches_sequential() {
    let (dataset, reference_dir) = build_fixture();
    let reference = load_reference(&reference_dir, None).unwrap();
    let candidates = ids(&["3", "1", "2"]);

    let seq = run_scan(
        &dataset,
        &candidates,
        &reference,
        &ScanParams::new(SimilarityMetric::Dice),
    )
    .unwrap();
    let mut params = ScanParams::new(SimilarityMetric::Dice);
    params.threads = 3;
    let par = run_scan(&dataset, &candidates, &reference, &params).unwrap();

    assert_eq!(seq.scores, par.scores);
    assert_eq!(seq.best, par.best);
    assert_eq!(par.scores.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec!["3", "1", "2"]);
}

#[test]
fn test_missing_candidate_aborts() {
    let (dataset, reference_dir) = build_fixture();
    fs::create_dir_all(dataset.join("4")).unwrap();
    let reference = load_reference(&reference_dir, None).unwrap();
    let err = run_scan(
        &dataset,
        &ids(&["1", "4", "2"]),
        &reference,
        &ScanParams::new(SimilarityMetric::Dice),
    )
    .unwrap_err();
    match err {
        ScanError::Candidate { id, source } => {
            assert_eq!(id, "4");
            assert!(matches!(source, VolumeError::MissingInput(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_candidate_aborts() {
    let (dataset, reference_dir) = build_fixture();
    let dir = dataset.join("5");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("Data_0001.npy"), b"garbage").unwrap();
    let reference = load_reference(&reference_dir, None).unwrap();
    let mut params = ScanParams::new(SimilarityMetric::L2);
    params.threads = 2;
    let err = run_scan(&dataset, &ids(&["1", "5"]), &reference, &params).unwrap_err();
    assert!(matches!(err, ScanError::Candidate { .. }));
}

#[test]
fn test_crops_129_candidates() {
    let (dataset, reference_dir) = build_fixture();
    let dir = dataset.join("9");
    fs::create_dir_all(&dir).unwrap();
    write_volume(&dir.join("Data_0001.npy"), &candidate(129, 20));
    let reference = load_reference(&reference_dir, None).unwrap();
    let out = run_scan(
        &dataset,
        &ids(&["9"]),
        &reference,
        &ScanParams::new(SimilarityMetric::Dice),
    )
    .unwrap();
    assert_eq!(out.best.best_score.combined, 2.0);
}

#[test]
fn test_downsampled_scan() {
    let (dataset, reference_dir) = build_fixture();
    let mut params = ScanParams::new(SimilarityMetric::Dice);
    params.downsample_to = Some(32);
    let reference = load_reference(&reference_dir, params.downsample_to).unwrap();
    assert_eq!(reference.t1c.dim(), (32, 32, 32));
    let out = run_scan(&dataset, &ids(&["1", "2", "3"]), &reference, &params).unwrap();
    assert_eq!(out.best.partner, "2");
    assert_eq!(out.best.best_score.combined, 2.0);
    assert_eq!(params.effective_edge(), 32);
}

#[test]
fn test_empty_candidate_list() {
    let (dataset, reference_dir) = build_fixture();
    let reference = load_reference(&reference_dir, None).unwrap();
    let err = run_scan(
        &dataset,
        &[],
        &reference,
        &ScanParams::new(SimilarityMetric::Dice),
    )
    .unwrap_err();
    assert!(matches!(err, ScanError::Empty(_)));
}

#[test]
fn test_missing_reference_mask() {
    let dir = make_temp_dir();
    let err = load_reference(&dir, None).unwrap_err();
    assert!(matches!(
        err,
        ScanError::Reference(VolumeError::MissingInput(_))
    ));
}

#[test]
fn test_params_validation() {
    let mut params = ScanParams::new(SimilarityMetric::Dice);
    params.downsample_to = Some(0);
    assert!(params.validate().is_err());
    params.downsample_to = Some(129);
    assert!(params.validate().is_err());
    params.downsample_to = Some(64);
    assert!(params.validate().is_ok());
    params.threads = 0;
    assert!(params.validate().is_err());
}

#[test]
fn test_degenerate_candidate_scores_zero_overlap() {
    let (_, reference_dir) = build_fixture();
    let reference = load_reference(&reference_dir, None).unwrap();
    let params = ScanParams::new(SimilarityMetric::Dice);
    let scores = score_volume(Array3::zeros((128, 128, 128)), &reference, &params).unwrap();
    assert_eq!(scores.combined, 0.0);
}
