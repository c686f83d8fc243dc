mod input;
mod logging;
mod model;
mod pipeline;
mod report;
mod simd;
mod volume;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::input::VolumeError;
use crate::input::dataset::{Subset, list_candidate_ids, testset_label};
use crate::logging::timed;
use crate::model::encoder::{EncodeError, EncoderKind, LinearEncoder};
use crate::model::metric::SimilarityMetric;
use crate::model::thresholds::MaskChannel;
use crate::pipeline::encode::{EncodeParams, EncodeSource, run_encode};
use crate::pipeline::scan::{ScanError, ScanParams, load_reference, run_scan};
use crate::report::json::{read_score_table, write_scan_outputs};
use crate::report::text::{
    compare_tables, render_compare_text, render_rank_summary, render_rank_tsv, write_text,
};
use crate::report::{ReportError, scan_output_paths, tumor_id};

#[derive(Debug, Parser)]
#[command(name = "tumorsim", version, about = "Tumor similarity scans and latent encoding")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score every synthetic candidate against one reference tumor.
    Scan {
        /// Directory of numbered candidate folders.
        #[arg(long)]
        dataset: PathBuf,
        /// Reference case directory holding the T1c and FLAIR masks.
        #[arg(long)]
        reference: PathBuf,
        #[arg(long, value_enum, default_value_t = SimilarityMetric::Dice)]
        metric: SimilarityMetric,
        /// Half-open candidate window, START:END.
        #[arg(long)]
        subset: Option<Subset>,
        #[arg(long)]
        downsample_to: Option<usize>,
        #[arg(long, default_value_t = 1)]
        threads: usize,
        #[arg(long, default_value = "results")]
        out: PathBuf,
        /// Print the best match without writing files.
        #[arg(long)]
        no_save: bool,
    },
    /// Run the pretrained encoder over a dataset and store one latent per case.
    Encode {
        #[arg(long, value_enum)]
        source: EncodeSource,
        /// Real-tumor root or synthetic dataset directory.
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        checkpoint: PathBuf,
        #[arg(long, value_enum, default_value_t = EncoderKind::Plain)]
        kind: EncoderKind,
        #[arg(long, value_enum)]
        channel: MaskChannel,
        #[arg(long)]
        subset: Option<Subset>,
        #[arg(long)]
        downsample_to: Option<usize>,
        #[arg(long, default_value = "encoded")]
        out: PathBuf,
    },
    /// Rank a score table and write TSV and text summaries.
    Rank {
        #[arg(long)]
        scores: PathBuf,
        #[arg(long, value_enum, default_value_t = SimilarityMetric::Dice)]
        metric: SimilarityMetric,
        /// Output directory; defaults to the score table's directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Top-N overlap between two score tables.
    Compare {
        #[arg(long)]
        first: PathBuf,
        #[arg(long, value_enum, default_value_t = SimilarityMetric::Dice)]
        first_metric: SimilarityMetric,
        #[arg(long)]
        second: PathBuf,
        #[arg(long, value_enum, default_value_t = SimilarityMetric::L2)]
        second_metric: SimilarityMetric,
        #[arg(long, default_value_t = 10)]
        top_n: usize,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Volume(#[from] VolumeError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

fn main() {
    logging::init_logging();
    tracing::info!(backend = simd::backend_name(), "SIMD backend");
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Scan {
            dataset,
            reference,
            metric,
            subset,
            downsample_to,
            threads,
            out,
            no_save,
        } => {
            let params = ScanParams {
                downsample_to,
                threads,
                ..ScanParams::new(metric)
            };
            cmd_scan(&dataset, &reference, subset, &params, &out, no_save)
        }
        Command::Encode {
            source,
            root,
            checkpoint,
            kind,
            channel,
            subset,
            downsample_to,
            out,
        } => {
            let mut params = EncodeParams::new(source, channel, kind);
            params.subset = subset;
            params.downsample_to = downsample_to;
            cmd_encode(&root, &checkpoint, &params, &out)
        }
        Command::Rank { scores, metric, out } => cmd_rank(&scores, metric, out.as_deref()),
        Command::Compare {
            first,
            first_metric,
            second,
            second_metric,
            top_n,
        } => {
            let a = read_score_table(&first)?;
            let b = read_score_table(&second)?;
            let summary = compare_tables(&a, first_metric, &b, second_metric, top_n)?;
            print!("{}", render_compare_text(&summary));
            Ok(())
        }
    }
}

fn cmd_scan(
    dataset: &Path,
    reference: &Path,
    subset: Option<Subset>,
    params: &ScanParams,
    out: &Path,
    no_save: bool,
) -> Result<(), CliError> {
    params.validate()?;
    let tumor = tumor_id(reference)?;
    let ids = list_candidate_ids(dataset, subset)?;
    tracing::info!(
        tumor = %tumor,
        dataset = %dataset.display(),
        candidates = ids.len(),
        metric = params.metric.label(),
        downsample_to = params.effective_edge(),
        "scan parameters"
    );

    let reference = load_reference(reference, params.downsample_to)?;
    let output = timed("scan", || run_scan(dataset, &ids, &reference, params))?;

    println!(
        "best partner {} combined {} (t1c {}, flair {})",
        output.best.partner,
        output.best.best_score.combined,
        output.best.best_score.t1c,
        output.best.best_score.flair
    );
    if no_save {
        return Ok(());
    }
    let paths = scan_output_paths(
        out,
        &testset_label(subset),
        params.effective_edge(),
        params.metric,
        &tumor,
    );
    write_scan_outputs(&paths, &output)?;
    Ok(())
}

fn cmd_encode(
    root: &Path,
    checkpoint: &Path,
    params: &EncodeParams,
    out: &Path,
) -> Result<(), CliError> {
    let encoder = LinearEncoder::from_checkpoint(checkpoint, params.kind)?;
    tracing::info!(
        checkpoint = %checkpoint.display(),
        kind = ?encoder.kind(),
        pool = encoder.pool(),
        "loaded encoder"
    );
    let summary = timed("encode", || run_encode(root, out, &encoder, params))?;
    println!(
        "encoded {} items into {}",
        summary.encoded,
        summary.out_dir.display()
    );
    Ok(())
}

/// `<dir>/<stem>_rank.tsv` and `<dir>/<stem>_rank.txt`.
fn rank_output_paths(scores: &Path, out: Option<&Path>) -> (PathBuf, PathBuf) {
    let dir = out
        .map(Path::to_path_buf)
        .or_else(|| scores.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let stem = scores
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scores".to_string());
    (
        dir.join(format!("{stem}_rank.tsv")),
        dir.join(format!("{stem}_rank.txt")),
    )
}

fn cmd_rank(scores: &Path, metric: SimilarityMetric, out: Option<&Path>) -> Result<(), CliError> {
    let table = read_score_table(scores)?;
    let (tsv_path, txt_path) = rank_output_paths(scores, out);
    let summary = render_rank_summary(&table, metric);
    write_text(&tsv_path, &render_rank_tsv(&table, metric))?;
    write_text(&txt_path, &summary)?;
    print!("{summary}");
    tracing::info!(tsv = %tsv_path.display(), text = %txt_path.display(), "wrote ranking");
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
