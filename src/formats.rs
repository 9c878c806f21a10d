use std::io::Read;
use std::path::Path;

use crate::error::EnaError;
use crate::metadata::experiment::ExperimentSet;
use crate::metadata::sample::SampleSet;
use crate::metadata::study::{Study, StudySet};
use crate::tabular::{self, TabularFile, TabularRow};

/// Schema-level checks against a raw header table, run before any entity
/// is built so configuration mistakes are reported with file-level
/// context. Columns missing entirely and columns present with blank cells
/// are two distinct error kinds, each listing the offending fields in
/// declared order.
fn validate_table(
    table: &TabularFile,
    entity: &'static str,
    required: &[&str],
) -> Result<(), EnaError> {
    let missing = required
        .iter()
        .filter(|column| !table.has_column(column))
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(EnaError::MissingColumns {
            entity,
            fields: missing.join(","),
        });
    }

    let blank = required
        .iter()
        .filter(|column| {
            table
                .rows
                .iter()
                .any(|row| row.get_non_empty(column).is_none())
        })
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    if !blank.is_empty() {
        return Err(EnaError::MissingValues {
            entity,
            fields: blank.join(","),
        });
    }
    Ok(())
}

/// The samples metadata file: header TSV, one sample per row.
#[derive(Debug, Clone)]
pub struct SamplesTable {
    table: TabularFile,
}

impl SamplesTable {
    pub const REQUIRED_COLUMNS: &[&str] = &["alias", "taxon_id"];

    pub fn read(path: &Path) -> Result<Self, EnaError> {
        Ok(Self {
            table: TabularFile::read(path)?,
        })
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, EnaError> {
        Ok(Self {
            table: TabularFile::from_reader(reader, source)?,
        })
    }

    pub fn validate(&self) -> Result<(), EnaError> {
        validate_table(&self.table, "sample", Self::REQUIRED_COLUMNS)
    }

    pub fn sample_ids(&self) -> Vec<String> {
        self.table
            .rows
            .iter()
            .filter_map(|row| row.get_non_empty("alias").map(str::to_string))
            .collect()
    }

    pub fn to_xml(&self) -> Result<String, EnaError> {
        self.validate()?;
        SampleSet::from_rows(&self.table.rows).to_xml_string()
    }
}

/// The study metadata file: headerless two-column key/value TSV, one
/// attribute per row, describing a single study.
#[derive(Debug, Clone)]
pub struct StudyTable {
    row: TabularRow,
}

impl StudyTable {
    pub const REQUIRED_FIELDS: &[&str] = &["alias", "title"];

    pub fn read(path: &Path) -> Result<Self, EnaError> {
        Ok(Self {
            row: tabular::read_key_value(path)?,
        })
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, EnaError> {
        Ok(Self {
            row: tabular::key_value_from_reader(reader, source)?,
        })
    }

    pub fn validate(&self) -> Result<(), EnaError> {
        let missing = Self::REQUIRED_FIELDS
            .iter()
            .filter(|field| self.row.get(field).is_none())
            .map(|field| field.to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(EnaError::MissingColumns {
                entity: "study",
                fields: missing.join(","),
            });
        }

        let blank = Self::REQUIRED_FIELDS
            .iter()
            .filter(|field| self.row.get_non_empty(field).is_none())
            .map(|field| field.to_string())
            .collect::<Vec<_>>();
        if !blank.is_empty() {
            return Err(EnaError::MissingValues {
                entity: "study",
                fields: blank.join(","),
            });
        }
        Ok(())
    }

    pub fn study(&self) -> Study {
        Study::from_row(&self.row)
    }

    pub fn to_xml(&self) -> Result<String, EnaError> {
        self.validate()?;
        let mut set = StudySet::default();
        set.push(self.study());
        set.to_xml_string()
    }
}

/// The experiment metadata file: header TSV, one experiment per row,
/// indexed by `sample_description`.
#[derive(Debug, Clone)]
pub struct ExperimentTable {
    table: TabularFile,
}

impl ExperimentTable {
    pub const REQUIRED_COLUMNS: &[&str] = &[
        "study_ref",
        "sample_description",
        "platform",
        "instrument_model",
        "library_strategy",
        "library_source",
        "library_selection",
        "library_layout",
    ];

    pub fn read(path: &Path) -> Result<Self, EnaError> {
        Ok(Self {
            table: TabularFile::read(path)?,
        })
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, EnaError> {
        Ok(Self {
            table: TabularFile::from_reader(reader, source)?,
        })
    }

    pub fn validate(&self) -> Result<(), EnaError> {
        validate_table(&self.table, "experiment", Self::REQUIRED_COLUMNS)
    }

    pub fn sample_ids(&self) -> Vec<String> {
        ExperimentSet::from_rows(&self.table.rows).sample_ids()
    }

    pub fn to_xml(&self) -> Result<String, EnaError> {
        self.validate()?;
        ExperimentSet::from_rows(&self.table.rows).to_xml_string()
    }
}
