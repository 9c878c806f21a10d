use std::collections::BTreeMap;

use regex::Regex;

use crate::error::EnaError;
use crate::tabular::{TabularFile, TabularRow};
use crate::xml::XmlNode;

const DEFAULT_FILETYPE: &str = "fastq";
const DEFAULT_CHECKSUM_METHOD: &str = "MD5";

/// One sequence file attached to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFile {
    pub filename: String,
    pub filetype: String,
    pub checksum_method: String,
    pub checksum: String,
    pub read_types: Vec<String>,
}

impl RunFile {
    pub fn new(filename: &str, checksum: &str) -> Self {
        Self {
            filename: filename.to_string(),
            filetype: DEFAULT_FILETYPE.to_string(),
            checksum_method: DEFAULT_CHECKSUM_METHOD.to_string(),
            checksum: checksum.to_string(),
            read_types: Vec::new(),
        }
    }
}

/// One run, keyed by the same sample identifier as its experiment: alias
/// `run_<key>` always references experiment `exp_<key>`, so the 1:1
/// correlation holds by construction.
#[derive(Debug, Clone)]
pub struct Run {
    pub key: String,
    pub files: Vec<RunFile>,
}

impl Run {
    /// Builds from parallel filename/checksum sequences. The sequences
    /// must be non-empty and of equal length; truncating to the shorter
    /// side would silently drop files.
    pub fn from_files(key: &str, filenames: &[String], checksums: &[String]) -> Result<Self, EnaError> {
        if filenames.len() != checksums.len() {
            return Err(EnaError::RunFileMismatch {
                alias: format!("run_{key}"),
                filenames: filenames.len(),
                checksums: checksums.len(),
            });
        }
        let files = filenames
            .iter()
            .zip(checksums)
            .map(|(filename, checksum)| RunFile::new(filename, checksum))
            .collect();
        Ok(Self {
            key: key.to_string(),
            files,
        })
    }

    /// Builds from a raw row with numbered columns (`filename1`,
    /// `filetype1`, `checksum_method1`, `checksum1`, `read_type1`, ...),
    /// grouped by their numeric suffix in ascending order. `read_type` is
    /// pipe-delimited into repeated values; `filetype` and
    /// `checksum_method` fall back to the fastq/MD5 defaults.
    pub fn from_raw_row(key: &str, row: &TabularRow) -> Result<Self, EnaError> {
        let suffix_pattern = Regex::new(r"^([a-zA-Z_]+?)_?(\d+)$").unwrap();
        let mut groups: BTreeMap<u32, BTreeMap<String, String>> = BTreeMap::new();
        for (column, value) in row.iter() {
            if value.is_empty() {
                continue;
            }
            if let Some(captures) = suffix_pattern.captures(column) {
                let field = captures[1].trim_end_matches('_').to_string();
                if !matches!(
                    field.as_str(),
                    "filename" | "filetype" | "checksum_method" | "checksum" | "read_type"
                ) {
                    continue;
                }
                let group = captures[2].parse::<u32>().unwrap_or_default();
                groups.entry(group).or_default().insert(field, value.to_string());
            }
        }

        let mut files = Vec::new();
        for (group, fields) in groups {
            let filename = fields
                .get("filename")
                .ok_or(EnaError::IncompleteRunFile {
                    group,
                    field: "filename",
                })?
                .clone();
            let checksum = fields
                .get("checksum")
                .ok_or(EnaError::IncompleteRunFile {
                    group,
                    field: "checksum",
                })?
                .clone();
            let mut file = RunFile::new(&filename, &checksum);
            if let Some(filetype) = fields.get("filetype") {
                file.filetype = filetype.clone();
            }
            if let Some(method) = fields.get("checksum_method") {
                file.checksum_method = method.clone();
            }
            if let Some(read_type) = fields.get("read_type") {
                file.read_types = read_type.split('|').map(str::to_string).collect();
            }
            files.push(file);
        }

        Ok(Self {
            key: key.to_string(),
            files,
        })
    }

    pub fn validate(&self) -> Vec<EnaError> {
        if self.files.is_empty() {
            vec![EnaError::EmptyRunFiles(format!("run_{}", self.key))]
        } else {
            Vec::new()
        }
    }

    /// The `RUN` element with its `DATA_BLOCK/FILES` listing.
    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        if let Some(violation) = self.validate().into_iter().next() {
            return Err(violation);
        }
        let mut files = XmlNode::new("FILES");
        for file in &self.files {
            let mut file_element = XmlNode::new("FILE")
                .attr("filename", &file.filename)
                .attr("filetype", &file.filetype)
                .attr("checksum_method", &file.checksum_method)
                .attr("checksum", &file.checksum);
            for read_type in &file.read_types {
                file_element.add_child(XmlNode::leaf("READ_TYPE", read_type));
            }
            files.add_child(file_element);
        }

        Ok(XmlNode::new("RUN")
            .attr("alias", &format!("run_{}", self.key))
            .child(XmlNode::new("EXPERIMENT_REF").attr("refname", &format!("exp_{}", self.key)))
            .child(XmlNode::new("DATA_BLOCK").child(files)))
    }
}

/// Ordered runs serialized under one `RUN_SET` root.
#[derive(Debug, Clone, Default)]
pub struct RunSet {
    runs: Vec<Run>,
}

impl RunSet {
    pub fn from_manifest(manifest: &RunManifest) -> Result<Self, EnaError> {
        let mut runs = Vec::new();
        for entry in &manifest.entries {
            runs.push(Run::from_files(&entry.sample_id, &entry.filenames, &entry.checksums)?);
        }
        Ok(Self { runs })
    }

    pub fn push(&mut self, run: Run) {
        self.runs.push(run);
    }

    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        let mut root = XmlNode::new("RUN_SET");
        for run in &self.runs {
            root.add_child(run.to_xml()?);
        }
        Ok(root)
    }

    pub fn to_xml_string(&self) -> Result<String, EnaError> {
        self.to_xml()?.to_xml_string()
    }
}

/// The sequence manifest: per-sample file lists in first-seen order,
/// parsed from a header TSV with `alias`, `filename` and `checksum`
/// columns, one row per file.
#[derive(Debug, Clone, Default)]
pub struct RunManifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub sample_id: String,
    pub filenames: Vec<String>,
    pub checksums: Vec<String>,
}

impl RunManifest {
    pub const REQUIRED_COLUMNS: &[&str] = &["alias", "filename", "checksum"];

    pub fn from_table(table: &TabularFile) -> Result<Self, EnaError> {
        let missing = Self::REQUIRED_COLUMNS
            .iter()
            .filter(|column| !table.has_column(column))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(EnaError::MissingColumns {
                entity: "run manifest",
                fields: missing.join(","),
            });
        }

        let mut manifest = Self::default();
        for row in &table.rows {
            let alias = row.get_non_empty("alias").unwrap_or_default().to_string();
            let filename = row.get_non_empty("filename").unwrap_or_default().to_string();
            let checksum = row.get_non_empty("checksum").unwrap_or_default().to_string();
            if alias.is_empty() || filename.is_empty() || checksum.is_empty() {
                return Err(EnaError::MissingValues {
                    entity: "run manifest",
                    fields: Self::REQUIRED_COLUMNS.join(","),
                });
            }
            match manifest.entries.iter_mut().find(|entry| entry.sample_id == alias) {
                Some(entry) => {
                    entry.filenames.push(filename);
                    entry.checksums.push(checksum);
                }
                None => manifest.entries.push(ManifestEntry {
                    sample_id: alias,
                    filenames: vec![filename],
                    checksums: vec![checksum],
                }),
            }
        }
        Ok(manifest)
    }

    /// Sample identifiers in first-seen order.
    pub fn sample_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.sample_id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
