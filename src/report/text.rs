use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::metric::SimilarityMetric;
use crate::model::scores::ScoreTable;
use crate::report::{ReportError, format_f64_6};

const SUMMARY_TOP: usize = 5;

/// `rank, id, t1c, flair, combined`, best first, ranks 1-based.
pub fn render_rank_tsv(table: &ScoreTable, metric: SimilarityMetric) -> String {
    let mut out = String::from("rank\tid\tt1c\tflair\tcombined\n");
    for (i, (id, s)) in table.ranked(metric).into_iter().enumerate() {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            i + 1,
            id,
            format_f64_6(s.t1c),
            format_f64_6(s.flair),
            format_f64_6(s.combined)
        ));
    }
    out
}

pub fn render_rank_summary(table: &ScoreTable, metric: SimilarityMetric) -> String {
    let direction = if metric.higher_is_better() {
        "higher"
    } else {
        "lower"
    };
    let mut out = String::new();
    out.push_str(&format!(
        "Similarity ranking ({}, {} is better)\n",
        metric.label(),
        direction
    ));
    out.push_str(&format!("Candidates: {}\n", table.len()));
    if let Some(best) = table.best(metric) {
        out.push_str(&format!(
            "Best partner: {} (combined {}, t1c {}, flair {})\n",
            best.partner,
            format_f64_6(best.best_score.combined),
            format_f64_6(best.best_score.t1c),
            format_f64_6(best.best_score.flair)
        ));
    }
    let top: Vec<String> = table
        .ranked(metric)
        .into_iter()
        .take(SUMMARY_TOP)
        .map(|(id, s)| format!("{}={}", id, format_f64_6(s.combined)))
        .collect();
    out.push_str(&format!("Top {}: {}\n", top.len(), top.join(", ")));
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareSummary {
    pub top_n: usize,
    /// Shared IDs of both top-N lists, in the first table's rank order.
    pub overlap: Vec<String>,
    pub partner: String,
    /// 1-based rank of `partner` in the second table.
    pub partner_rank: Option<usize>,
    /// Combined score of `partner` in the second table.
    pub partner_score: Option<f64>,
}

/// Compares two rankings: top-N intersection and where the first table's
/// best partner lands in the second.
pub fn compare_tables(
    first: &ScoreTable,
    first_metric: SimilarityMetric,
    second: &ScoreTable,
    second_metric: SimilarityMetric,
    top_n: usize,
) -> Result<CompareSummary, ReportError> {
    if top_n == 0 {
        return Err(ReportError::Invalid("top-n must be at least 1".into()));
    }
    let best = first
        .best(first_metric)
        .ok_or_else(|| ReportError::Invalid("first score table is empty".into()))?;
    let second_top: HashSet<&str> = second
        .ranked(second_metric)
        .into_iter()
        .take(top_n)
        .map(|(id, _)| id)
        .collect();
    let overlap = first
        .ranked(first_metric)
        .into_iter()
        .take(top_n)
        .filter(|(id, _)| second_top.contains(id))
        .map(|(id, _)| id.to_string())
        .collect();
    let partner_rank = second.rank_of(&best.partner, second_metric).map(|r| r + 1);
    let partner_score = second.get(&best.partner).map(|s| s.combined);
    Ok(CompareSummary {
        top_n,
        overlap,
        partner: best.partner,
        partner_rank,
        partner_score,
    })
}

pub fn render_compare_text(summary: &CompareSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Top-{} overlap: {} ({})\n",
        summary.top_n,
        summary.overlap.len(),
        summary.overlap.join(", ")
    ));
    match (summary.partner_rank, summary.partner_score) {
        (Some(rank), Some(score)) => out.push_str(&format!(
            "Best partner {} ranks {} in the second table (combined {})\n",
            summary.partner,
            rank,
            format_f64_6(score)
        )),
        _ => out.push_str(&format!(
            "Best partner {} is absent from the second table\n",
            summary.partner
        )),
    }
    out
}

pub fn write_text(path: &Path, contents: &str) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/text.rs"]
mod tests;
