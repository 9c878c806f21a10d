use std::io::Read;
use std::path::Path;

use crate::error::EnaError;
use crate::tabular::TabularFile;

/// Per-file outcome reported by the file-transfer collaborator. This crate
/// never performs transfers itself; it only consumes the report to gate
/// the reads submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Sample identifier, carrying a `_f`/`_r` suffix for paired-end reads.
    pub sample_id: String,
    pub filename: String,
    pub success: bool,
    pub error: Option<String>,
    /// What the transfer did, e.g. `ADD` or `DELETE`.
    pub action: String,
}

/// The parsed file-transfer report: a header TSV with one row per
/// transferred file.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    pub const REQUIRED_COLUMNS: &[&str] = &["alias", "filename", "status"];

    pub fn read(path: &Path) -> Result<Self, EnaError> {
        Self::from_table(&TabularFile::read(path)?)
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, EnaError> {
        Self::from_table(&TabularFile::from_reader(reader, source)?)
    }

    pub fn from_table(table: &TabularFile) -> Result<Self, EnaError> {
        let missing = Self::REQUIRED_COLUMNS
            .iter()
            .filter(|column| !table.has_column(column))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(EnaError::MissingColumns {
                entity: "file transfer report",
                fields: missing.join(","),
            });
        }

        let outcomes = table
            .rows
            .iter()
            .map(|row| TransferOutcome {
                sample_id: row.get("alias").unwrap_or_default().to_string(),
                filename: row.get("filename").unwrap_or_default().to_string(),
                success: row
                    .get("status")
                    .map(|status| status.eq_ignore_ascii_case("true") || status == "1")
                    .unwrap_or(false),
                error: row.get_non_empty("error").map(str::to_string),
                action: row.get("action").unwrap_or("ADD").to_string(),
            })
            .collect();
        Ok(Self { outcomes })
    }

    /// Sample identifiers as reported, suffixes included.
    pub fn sample_ids(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|outcome| outcome.sample_id.clone())
            .collect()
    }

    pub fn failures(&self) -> Vec<&TransferOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.success)
            .collect()
    }

    pub fn outcomes(&self) -> &[TransferOutcome] {
        &self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_report() {
        let report = TransferReport::from_reader(
            "alias\tfilename\tstatus\terror\taction\n\
             s1_f\ts1_R1.fastq.gz\tTrue\t\tADD\n\
             s1_r\ts1_R2.fastq.gz\tTrue\t\tADD\n\
             s2\ts2.fastq.gz\tFalse\ttimed out\tADD\n"
                .as_bytes(),
            "transfer.tsv",
        )
        .unwrap();
        assert_eq!(report.sample_ids(), vec!["s1_f", "s1_r", "s2"]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].error.as_deref(), Some("timed out"));
    }

    #[test]
    fn missing_columns_are_reported() {
        let err =
            TransferReport::from_reader("alias\ts1\n".as_bytes(), "transfer.tsv").unwrap_err();
        assert_matches!(
            err,
            EnaError::MissingColumns {
                entity: "file transfer report",
                ref fields
            } if fields == "filename,status"
        );
    }
}
