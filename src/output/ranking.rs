//! Result ordering and the `top_files.txt` table.

use crate::error::{Error, Result};
use crate::output::ScoreReport;
use crate::utils::fs::write_atomic;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::Path;

/// Ordering used for every ranked artifact: score descending, then total
/// clicks descending, then file identifier ascending.
pub fn compare_reports(a: &ScoreReport, b: &ScoreReport) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.total_clicks.cmp(&a.total_clicks))
        .then_with(|| a.file.cmp(&b.file))
}

/// Sort reports best first.
pub fn rank_reports(reports: &mut [ScoreReport]) {
    reports.sort_by(compare_reports);
}

/// Render the top `n` of already ranked reports as a text table.
pub fn render_top_files(reports: &[ScoreReport], n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>6}  {:>6}  {:>6}  {:>5}  {:>7}  {:>6}  {:>7}  {}",
        "rank", "score", "chirp", "click", "snr", "chirps", "trains", "clicks", "file"
    );
    for (i, r) in reports.iter().take(n).enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:>6.1}  {:>6.1}  {:>6.1}  {:>5.1}  {:>7}  {:>6}  {:>7}  {}",
            i + 1,
            r.score,
            r.chirp_score,
            r.click_score,
            r.snr_score,
            r.n_chirps,
            r.n_click_trains,
            r.total_clicks,
            r.file
        );
    }
    out
}

/// Write the top `n` table atomically.
pub fn write_top_files(path: &Path, reports: &[ScoreReport], n: usize) -> Result<()> {
    write_atomic(path, render_top_files(reports, n).as_bytes()).map_err(|e| Error::ResultsWrite {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}
