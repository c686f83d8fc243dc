use super::*;
use crate::model::scores::{ScoreTable, ScoreTriple};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("tumorsim_main_test_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_parse_scan_defaults() {
    let cli = Cli::try_parse_from([
        "tumorsim",
        "scan",
        "--dataset",
        "data",
        "--reference",
        "real/tgm001_preop",
    ])
    .unwrap();
    match cli.command {
        Command::Scan {
            metric,
            subset,
            downsample_to,
            threads,
            out,
            no_save,
            ..
        } => {
            assert_eq!(metric, SimilarityMetric::Dice);
            assert_eq!(subset, None);
            assert_eq!(downsample_to, None);
            assert_eq!(threads, 1);
            assert_eq!(out, PathBuf::from("results"));
            assert!(!no_save);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_scan_options() {
    let cli = Cli::try_parse_from([
        "tumorsim",
        "scan",
        "--dataset",
        "data",
        "--reference",
        "ref",
        "--metric",
        "l2",
        "--subset",
        "100:300",
        "--downsample-to",
        "64",
        "--threads",
        "8",
        "--no-save",
    ])
    .unwrap();
    match cli.command {
        Command::Scan {
            metric,
            subset,
            downsample_to,
            threads,
            no_save,
            ..
        } => {
            assert_eq!(metric, SimilarityMetric::L2);
            assert_eq!(subset, Some(Subset::new(100, 300).unwrap()));
            assert_eq!(downsample_to, Some(64));
            assert_eq!(threads, 8);
            assert!(no_save);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_rejects_bad_values() {
    assert!(
        Cli::try_parse_from([
            "tumorsim",
            "scan",
            "--dataset",
            "d",
            "--reference",
            "r",
            "--metric",
            "cosine"
        ])
        .is_err()
    );
    assert!(
        Cli::try_parse_from([
            "tumorsim",
            "scan",
            "--dataset",
            "d",
            "--reference",
            "r",
            "--subset",
            "9:3"
        ])
        .is_err()
    );
    assert!(Cli::try_parse_from(["tumorsim", "scan", "--dataset", "d"]).is_err());
}

#[test]
fn test_parse_encode() {
    let cli = Cli::try_parse_from([
        "tumorsim",
        "encode",
        "--source",
        "synthetic",
        "--root",
        "data",
        "--checkpoint",
        "model.npz",
        "--kind",
        "variational",
        "--channel",
        "flair",
        "--subset",
        "0:200",
    ])
    .unwrap();
    match cli.command {
        Command::Encode {
            source,
            kind,
            channel,
            subset,
            out,
            ..
        } => {
            assert_eq!(source, EncodeSource::Synthetic);
            assert_eq!(kind, EncoderKind::Variational);
            assert_eq!(channel, MaskChannel::Flair);
            assert_eq!(subset.map(|s| s.len()), Some(200));
            assert_eq!(out, PathBuf::from("encoded"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_rank_output_paths() {
    let (tsv, txt) = rank_output_paths(Path::new("/r/50k/dim_128/dice/t1.json"), None);
    assert_eq!(tsv, PathBuf::from("/r/50k/dim_128/dice/t1_rank.tsv"));
    assert_eq!(txt, PathBuf::from("/r/50k/dim_128/dice/t1_rank.txt"));
    let (tsv, _) = rank_output_paths(Path::new("t1.json"), Some(Path::new("/tmp/x")));
    assert_eq!(tsv, PathBuf::from("/tmp/x/t1_rank.tsv"));
}

#[test]
fn test_rank_command_writes_reports() {
    let dir = make_temp_dir();
    let scores = dir.join("tgm001_preop.json");
    let mut table = ScoreTable::default();
    table.insert("1".into(), ScoreTriple::new(0.3, 0.2)).unwrap();
    table.insert("2".into(), ScoreTriple::new(0.9, 0.8)).unwrap();
    fs::write(&scores, serde_json::to_vec_pretty(&table).unwrap()).unwrap();

    run(Cli::try_parse_from([
        "tumorsim",
        "rank",
        "--scores",
        scores.to_str().unwrap(),
    ])
    .unwrap())
    .unwrap();

    let tsv = fs::read_to_string(dir.join("tgm001_preop_rank.tsv")).unwrap();
    assert_eq!(tsv.lines().nth(1).unwrap().split('\t').nth(1), Some("2"));
    let txt = fs::read_to_string(dir.join("tgm001_preop_rank.txt")).unwrap();
    assert!(txt.contains("Best partner: 2"));
}

#[test]
fn test_scan_command_invalid_threads() {
    let err = run(Cli::try_parse_from([
        "tumorsim",
        "scan",
        "--dataset",
        "d",
        "--reference",
        "r",
        "--threads",
        "0",
    ])
    .unwrap())
    .unwrap_err();
    assert!(matches!(err, CliError::Scan(ScanError::InvalidParams(_))));
}
