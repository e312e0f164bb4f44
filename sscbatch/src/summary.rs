//! Console rendering of batch results.
use ssc_platform::{BatchReport, BatchSummary, SscError};
use std::fmt::Write as _;

/// Render one batch as a small table, failures after successes.
#[must_use]
pub fn render_batch(report: &BatchReport<String, String, SscError>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Batch {}: {} succeeded, {} failed",
        report.index,
        report.ok.len(),
        report.error.len()
    );
    for record in &report.ok {
        if let Ok(status) = &record.outcome {
            let _ = writeln!(out, "  ✅ versionId={:<8} status={status}", record.item);
        }
    }
    for record in &report.error {
        if let Err(e) = &record.outcome {
            let status = e
                .status()
                .map_or_else(|| "-".to_string(), |s| s.to_string());
            let message = e.to_string().lines().next().unwrap_or_default().to_string();
            let _ = writeln!(
                out,
                "  ❌ versionId={:<8} status={status} message={message}",
                record.item
            );
        }
    }
    out
}

/// Print every batch in submission order followed by totals.
pub fn print_summary(summary: &BatchSummary<String, String, SscError>) {
    println!("\n📊 Batch summary");
    for report in &summary.batches {
        print!("{}", render_batch(report));
    }
    println!(
        "DONE ALL BATCHES: {} items, {} succeeded, {} failed",
        summary.total(),
        summary.ok_count(),
        summary.error_count()
    );
}
