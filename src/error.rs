use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnaError {
    #[error("missing {0}, make sure it is set as an environment variable")]
    MissingCredentials(String),

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("invalid hold date {0}: expected YYYY-MM-DD within two years of today")]
    InvalidHoldDate(String),

    #[error("either the study file or the sample file must be included for an ENA submission")]
    EmptySubmission,

    #[error("some required {entity} attributes are missing from the metadata file: {fields}")]
    MissingColumns { entity: &'static str, fields: String },

    #[error("some {entity} rows are missing values in the following fields: {fields}")]
    MissingValues { entity: &'static str, fields: String },

    #[error("{entity} {field} must have a value for an ENA submission")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("some of the library descriptors are empty, provide values for all of them")]
    EmptyLibraryDescriptors,

    #[error("malformed compound value {value:?}: expected exactly one '|' separator")]
    MalformedPair { value: String },

    #[error("run {0} has no files attached")]
    EmptyRunFiles(String),

    #[error("run {alias} has {filenames} filenames but {checksums} checksums")]
    RunFileMismatch {
        alias: String,
        filenames: usize,
        checksums: usize,
    },

    #[error("run file group {group} is missing the {field} column")]
    IncompleteRunFile { group: u32, field: &'static str },

    #[error("sample ids do not match across the submission sources:\n{0}")]
    SampleIdMismatch(String),

    #[error("failed to read tabular file {path}: {message}")]
    TabularRead { path: String, message: String },

    #[error("failed to serialize XML document: {0}")]
    XmlWrite(String),

    #[error("ENA receipt is not a valid xml form: {0}")]
    ReceiptParse(String),

    #[error("xml receipt is missing values in the following fields: {0}")]
    ReceiptIncomplete(String),

    #[error("ENA request failed: {0}")]
    SubmitHttp(String),
}
