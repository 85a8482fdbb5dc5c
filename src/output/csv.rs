//! `results.csv` writer.

use crate::error::{Error, Result};
use crate::output::ScoreReport;
use crate::utils::fs::write_atomic;
use std::path::Path;

/// Write one row per report, with a header derived from [`ScoreReport`]'s
/// field names. Missing optional values become empty cells.
pub fn write_results_csv(path: &Path, reports: &[ScoreReport]) -> Result<()> {
    let wrap = |e: Box<dyn std::error::Error + Send + Sync>| Error::ResultsWrite {
        path: path.to_path_buf(),
        source: e,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    for report in reports {
        writer.serialize(report).map_err(|e| wrap(Box::new(e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| wrap(Box::new(e.into_error())))?;

    write_atomic(path, &bytes).map_err(|e| wrap(Box::new(e)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scoring::{DetectionSummary, ScoreBreakdown};
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn report(name: &str, ici: Option<f64>) -> ScoreReport {
        ScoreReport::new(
            Path::new(name),
            DateTime::<Utc>::UNIX_EPOCH,
            10.0,
            &DetectionSummary {
                n_click_trains: usize::from(ici.is_some()),
                mean_ici_secs: ici,
                ..DetectionSummary::default()
            },
            ScoreBreakdown::default(),
            1.0,
        )
    }

    #[test]
    fn test_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        write_results_csv(
            &path,
            &[report("/d/a,b.190", Some(0.02)), report("/d/c.190", None)],
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("file,filename,recording_start,duration_secs,score"));
        assert!(lines[1].starts_with("\"/d/a,b.190\""));
        assert!(lines[1].contains("0.02"));
    }

    #[test]
    fn test_empty_reports_write_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        write_results_csv(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
