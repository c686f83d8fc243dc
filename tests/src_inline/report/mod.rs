use super::*;

#[test]
fn test_scan_output_paths_layout() {
    let paths = scan_output_paths(
        Path::new("results"),
        "50k",
        128,
        SimilarityMetric::Dice,
        "tgm001_preop",
    );
    assert_eq!(paths.dir, Path::new("results/50k/dim_128/dice"));
    assert_eq!(
        paths.scores,
        Path::new("results/50k/dim_128/dice/tgm001_preop.json")
    );
    assert_eq!(
        paths.best,
        Path::new("results/50k/dim_128/dice/tgm001_preop_best.json")
    );

    let paths = scan_output_paths(Path::new("r"), "200", 64, SimilarityMetric::L2, "x");
    assert_eq!(paths.dir, Path::new("r/200/dim_64/l2"));
}

#[test]
fn test_tumor_id_from_reference_dir() {
    assert_eq!(
        tumor_id(Path::new("/data/real/tgm042_preop")).unwrap(),
        "tgm042_preop"
    );
    assert_eq!(tumor_id(Path::new("tgm042_preop/")).unwrap(), "tgm042_preop");
    assert!(tumor_id(Path::new("/")).is_err());
}

#[test]
fn test_format_f64_6() {
    assert_eq!(format_f64_6(1.0), "1.000000");
    assert_eq!(format_f64_6(0.1234567), "0.123457");
}
