use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::EnaError;

/// One row of metadata: an ordered column-name to value mapping. Both
/// sides are stored trimmed; column order follows the source file because
/// it is preserved into the output documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularRow {
    cells: Vec<(String, String)>,
}

impl TabularRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(key, value)| {
                    (
                        key.as_ref().trim().to_string(),
                        value.as_ref().trim().to_string(),
                    )
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get), but a blank cell counts as absent. The
    /// builders use this so empty-string and missing-column fail the same
    /// required-field rule.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A parsed tab-delimited file with a header row: samples, experiments and
/// run manifests all arrive in this shape.
#[derive(Debug, Clone)]
pub struct TabularFile {
    pub columns: Vec<String>,
    pub rows: Vec<TabularRow>,
}

impl TabularFile {
    pub fn read(path: &Path) -> Result<Self, EnaError> {
        let file = File::open(path).map_err(|err| tabular_error(path, err))?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, EnaError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(false)
            .from_reader(reader);

        let columns = csv_reader
            .headers()
            .map_err(|err| tabular_message(source, err))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|err| tabular_message(source, err))?;
            let row = TabularRow::from_pairs(
                columns
                    .iter()
                    .map(String::as_str)
                    .zip(record.iter())
                    .collect::<Vec<_>>(),
            );
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }
}

/// The study file is a headerless two-column key/value table, one
/// attribute per row, parsed into a single [`TabularRow`].
pub fn read_key_value(path: &Path) -> Result<TabularRow, EnaError> {
    let file = File::open(path).map_err(|err| tabular_error(path, err))?;
    key_value_from_reader(file, &path.display().to_string())
}

pub fn key_value_from_reader<R: Read>(reader: R, source: &str) -> Result<TabularRow, EnaError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut pairs = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| tabular_message(source, err))?;
        let key = record.get(0).unwrap_or_default();
        if key.trim().is_empty() {
            continue;
        }
        let value = record.get(1).unwrap_or_default();
        pairs.push((key.to_string(), value.to_string()));
    }
    Ok(TabularRow::from_pairs(pairs))
}

fn tabular_error(path: &Path, err: std::io::Error) -> EnaError {
    EnaError::TabularRead {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn tabular_message<E: std::fmt::Display>(source: &str, err: E) -> EnaError {
    EnaError::TabularRead {
        path: source.to_string(),
        message: err.to_string(),
    }
}
