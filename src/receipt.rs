use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::error::EnaError;

/// Object tags the archive assigns accession numbers to.
const OBJECT_TAGS: &[&str] = &["PROJECT", "SAMPLE", "EXPERIMENT", "RUN"];

/// Terminal state of one dispatched submission, derived from the server's
/// receipt. There is no retry at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Succeeded,
    Failed(String),
    Unparseable,
}

/// One accession number assigned by the archive, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accession {
    pub object_type: String,
    pub value: String,
}

/// The parsed server receipt. Only ever constructed from response bytes
/// (or literals in tests), never assembled by the client.
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    pub success: Option<bool>,
    pub receipt_date: Option<String>,
    pub submission_file: Option<String>,
    pub errors: Vec<String>,
    pub accessions: Vec<Accession>,
    pub sample_aliases: Vec<String>,
}

impl Receipt {
    pub fn parse(bytes: &[u8]) -> Result<Self, EnaError> {
        let content =
            std::str::from_utf8(bytes).map_err(|err| EnaError::ReceiptParse(err.to_string()))?;
        let mut reader = Reader::from_str(content);
        let mut receipt = Receipt::default();
        let mut saw_root = false;
        let mut in_error = false;

        loop {
            match reader
                .read_event()
                .map_err(|err| EnaError::ReceiptParse(err.to_string()))?
            {
                Event::Start(element) => {
                    if !saw_root {
                        receipt.read_root_attributes(&element)?;
                        saw_root = true;
                    } else {
                        receipt.read_object(&element)?;
                    }
                    in_error = element.name().as_ref() == b"ERROR";
                }
                Event::Empty(element) => {
                    if !saw_root {
                        receipt.read_root_attributes(&element)?;
                        saw_root = true;
                    } else {
                        receipt.read_object(&element)?;
                    }
                }
                Event::Text(text) => {
                    if in_error {
                        let message = text
                            .unescape()
                            .map_err(|err| EnaError::ReceiptParse(err.to_string()))?
                            .trim()
                            .to_string();
                        if !message.is_empty() {
                            receipt.errors.push(message);
                        }
                    }
                }
                Event::End(_) => in_error = false,
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(EnaError::ReceiptParse("no root element".to_string()));
        }
        Ok(receipt)
    }

    fn read_root_attributes(&mut self, element: &BytesStart<'_>) -> Result<(), EnaError> {
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|err| EnaError::ReceiptParse(err.to_string()))?;
            let value = attribute
                .unescape_value()
                .map_err(|err| EnaError::ReceiptParse(err.to_string()))?
                .to_string();
            match attribute.key.as_ref() {
                b"success" => self.success = Some(value == "true"),
                b"receiptDate" => self.receipt_date = Some(value),
                b"submissionFile" => self.submission_file = Some(value),
                _ => {}
            }
        }
        Ok(())
    }

    fn read_object(&mut self, element: &BytesStart<'_>) -> Result<(), EnaError> {
        let name = String::from_utf8_lossy(element.name().as_ref()).to_string();
        if !OBJECT_TAGS.contains(&name.as_str()) {
            return Ok(());
        }
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|err| EnaError::ReceiptParse(err.to_string()))?;
            let value = attribute
                .unescape_value()
                .map_err(|err| EnaError::ReceiptParse(err.to_string()))?
                .to_string();
            match attribute.key.as_ref() {
                b"accession" => self.accessions.push(Accession {
                    object_type: name.clone(),
                    value,
                }),
                b"alias" if name == "SAMPLE" => self.sample_aliases.push(value),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }

    /// Well-formedness gate for downstream consumption: the root must
    /// carry `receiptDate`, `submissionFile` and `success`.
    pub fn validate_well_formed(&self) -> Result<(), EnaError> {
        let mut missing = Vec::new();
        if self.receipt_date.is_none() {
            missing.push("receiptDate");
        }
        if self.submission_file.is_none() {
            missing.push("submissionFile");
        }
        if self.success.is_none() {
            missing.push("success");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EnaError::ReceiptIncomplete(missing.join(",")))
        }
    }

    /// Accession values in receipt order, for the cancellation fan-out.
    pub fn accession_values(&self) -> Vec<String> {
        self.accessions
            .iter()
            .map(|accession| accession.value.clone())
            .collect()
    }
}

/// Fail-soft interpretation of a response body: warns on failure or on an
/// unparseable body and classifies the outcome, never raising, so the raw
/// receipt stays available to the caller either way.
pub fn report_outcome(bytes: &[u8]) -> SubmissionStatus {
    match Receipt::parse(bytes) {
        Err(_) => {
            warn!("unable to parse the ENA response as XML");
            SubmissionStatus::Unparseable
        }
        Ok(receipt) if receipt.is_success() => SubmissionStatus::Succeeded,
        Ok(receipt) => {
            let message = if receipt.errors.is_empty() {
                "no error message in receipt".to_string()
            } else {
                receipt.errors.join("; ")
            };
            warn!("ENA submission was not successful: {message}");
            SubmissionStatus::Failed(message)
        }
    }
}
