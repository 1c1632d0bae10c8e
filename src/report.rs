//! Run statistics over a list of [`ProcessingResult`]s.

use crate::models::{ProcessingResult, Status};
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;

/// Aggregated counts plus one diagnostic line per failed article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub errors: usize,
    pub parsing_errors: usize,
    /// `  - {url}: {message}` for each `error` result.
    pub error_lines: Vec<String>,
    /// `  - {url}: {message}` for each `parsing_error` result, followed by
    /// the partially extracted fields when present.
    pub parsing_error_lines: Vec<String>,
}

impl RunSummary {
    pub fn from_results(results: &[ProcessingResult]) -> Self {
        let counts: HashMap<Status, usize> = results.iter().counts_by(|r| r.status);
        let count = |status: Status| counts.get(&status).copied().unwrap_or(0);

        let error_lines = results
            .iter()
            .filter(|r| r.status == Status::Error)
            .map(|r| format!("  - {}: {}", r.url, r.message))
            .collect();

        let parsing_error_lines = results
            .iter()
            .filter(|r| r.status == Status::ParsingError)
            .flat_map(|r| {
                let head = format!("  - {}: {}", r.url, r.message);
                let data = r
                    .extracted_data
                    .as_ref()
                    .map(|d| format!("    Extracted data: {d}"));
                std::iter::once(head).chain(data)
            })
            .collect();

        Self {
            total: results.len(),
            success: count(Status::Success),
            skipped: count(Status::Skipped),
            errors: count(Status::Error),
            parsing_errors: count(Status::ParsingError),
            error_lines,
            parsing_error_lines,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "FINAL SUMMARY")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total articles: {}", self.total)?;
        writeln!(f, "Successfully processed: {}", self.success)?;
        writeln!(f, "Skipped (already exist): {}", self.skipped)?;
        writeln!(f, "General errors: {}", self.errors)?;
        writeln!(f, "Parsing errors: {}", self.parsing_errors)?;

        if !self.error_lines.is_empty() {
            writeln!(f, "\nGeneral errors:")?;
            for line in &self.error_lines {
                writeln!(f, "{line}")?;
            }
        }
        if !self.parsing_error_lines.is_empty() {
            writeln!(f, "\nParsing errors:")?;
            for line in &self.parsing_error_lines {
                writeln!(f, "{line}")?;
            }
        }
        Ok(())
    }
}
