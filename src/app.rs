use serde::Serialize;
use tracing::{info, warn};

use crate::crossref::CrossReferenceSet;
use crate::domain::Action;
use crate::error::EnaError;
use crate::formats::{ExperimentTable, SamplesTable, StudyTable};
use crate::metadata::run::{RunManifest, RunSet};
use crate::receipt::{Receipt, SubmissionStatus, report_outcome};
use crate::submit::{SubmissionClient, SubmissionPart, cancellation_xml, submission_xml};
use crate::transfer::TransferReport;

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub action: Action,
    /// Empty means release immediately after the archive's default hold.
    pub hold_date: String,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            action: Action::Add,
            hold_date: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessionRecord {
    pub object_type: String,
    pub accession: String,
}

/// Outcome of one dispatched submission. The raw receipt is kept for
/// persistence but not echoed into the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub status: String,
    pub error: Option<String>,
    pub accessions: Vec<AccessionRecord>,
    pub sample_aliases: Vec<String>,
    #[serde(skip)]
    pub receipt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub accession: String,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationResult {
    pub cancellations: Vec<CancellationOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedDocument {
    pub kind: String,
    pub xml: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub documents: Vec<ValidatedDocument>,
}

/// Offline check: validates whichever metadata files are given and
/// renders their XML documents without contacting the archive.
pub fn validate_documents(
    study: Option<&StudyTable>,
    samples: Option<&SamplesTable>,
    experiments: Option<&ExperimentTable>,
    manifest: Option<&RunManifest>,
) -> Result<ValidationResult, EnaError> {
    let mut documents = Vec::new();
    if let Some(study) = study {
        documents.push(ValidatedDocument {
            kind: "project".to_string(),
            xml: study.to_xml()?,
        });
    }
    if let Some(samples) = samples {
        documents.push(ValidatedDocument {
            kind: "sample".to_string(),
            xml: samples.to_xml()?,
        });
    }
    if let Some(experiments) = experiments {
        documents.push(ValidatedDocument {
            kind: "experiment".to_string(),
            xml: experiments.to_xml()?,
        });
    }
    if let Some(manifest) = manifest {
        documents.push(ValidatedDocument {
            kind: "run".to_string(),
            xml: RunSet::from_manifest(manifest)?.to_xml_string()?,
        });
    }
    if documents.is_empty() {
        return Err(EnaError::EmptySubmission);
    }
    Ok(ValidationResult { documents })
}

pub struct App<C: SubmissionClient> {
    client: C,
}

impl<C: SubmissionClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Submits the study and/or samples metadata. Validation and XML
    /// rendering both happen before the request is built, so nothing is
    /// dispatched for broken input.
    pub fn submit_metadata(
        &self,
        study: Option<&StudyTable>,
        samples: Option<&SamplesTable>,
        options: &SubmitOptions,
    ) -> Result<SubmissionOutcome, EnaError> {
        if study.is_none() && samples.is_none() {
            return Err(EnaError::EmptySubmission);
        }

        let mut parts = vec![SubmissionPart::new(
            "SUBMISSION",
            "submission.xml",
            submission_xml(options.action, &options.hold_date)?,
        )];
        if let Some(study) = study {
            parts.push(SubmissionPart::new("PROJECT", "project.xml", study.to_xml()?));
        }
        if let Some(samples) = samples {
            parts.push(SubmissionPart::new("SAMPLE", "samples.xml", samples.to_xml()?));
        }

        self.dispatch(parts)
    }

    /// Submits the experiment and run metadata for sequence files that
    /// were already transferred. The cross-reference gate must pass
    /// before anything is dispatched.
    pub fn submit_reads(
        &self,
        experiments: &ExperimentTable,
        manifest: &RunManifest,
        transfer: &TransferReport,
        sample_receipt: &Receipt,
        options: &SubmitOptions,
    ) -> Result<SubmissionOutcome, EnaError> {
        sample_receipt.validate_well_formed()?;
        CrossReferenceSet::new(
            manifest.sample_ids(),
            transfer.sample_ids(),
            sample_receipt.sample_aliases.clone(),
            experiments.sample_ids(),
        )
        .validate()?;

        for failure in transfer.failures() {
            warn!(
                "transfer of {} for sample {} was reported as failed",
                failure.filename, failure.sample_id
            );
        }

        let parts = vec![
            SubmissionPart::new(
                "SUBMISSION",
                "submission.xml",
                submission_xml(options.action, &options.hold_date)?,
            ),
            SubmissionPart::new("EXPERIMENT", "experiments.xml", experiments.to_xml()?),
            SubmissionPart::new(
                "RUN",
                "runs.xml",
                RunSet::from_manifest(manifest)?.to_xml_string()?,
            ),
        ];

        self.dispatch(parts)
    }

    /// Cancels a single object by accession. The archive propagates the
    /// cancellation to dependent objects on its side.
    pub fn cancel(&self, accession: &str) -> Result<CancellationOutcome, EnaError> {
        let parts = vec![SubmissionPart::new(
            "SUBMISSION",
            "submission.xml",
            cancellation_xml(accession)?,
        )];
        let bytes = self.client.submit(parts)?;
        let (status, error) = classify(&report_outcome(&bytes));
        Ok(CancellationOutcome {
            accession: accession.to_string(),
            status,
            error,
        })
    }

    /// Cancels every accession found in a prior receipt, one request per
    /// accession in receipt order. A failed cancellation is recorded and
    /// the fan-out continues.
    pub fn cancel_all(&self, receipt: &Receipt) -> Result<CancellationResult, EnaError> {
        let accessions = receipt.accession_values();
        if accessions.is_empty() {
            warn!("the receipt carries no accession numbers, nothing to cancel");
        }
        let mut cancellations = Vec::new();
        for accession in accessions {
            info!("cancelling {accession}");
            let outcome = match self.cancel(&accession) {
                Ok(outcome) => outcome,
                Err(err) => CancellationOutcome {
                    accession,
                    status: "failure".to_string(),
                    error: Some(err.to_string()),
                },
            };
            cancellations.push(outcome);
        }
        Ok(CancellationResult { cancellations })
    }

    fn dispatch(&self, parts: Vec<SubmissionPart>) -> Result<SubmissionOutcome, EnaError> {
        let bytes = self.client.submit(parts)?;
        let (status, error) = classify(&report_outcome(&bytes));

        let mut accessions = Vec::new();
        let mut sample_aliases = Vec::new();
        if let Ok(receipt) = Receipt::parse(&bytes) {
            accessions = receipt
                .accessions
                .iter()
                .map(|accession| AccessionRecord {
                    object_type: accession.object_type.clone(),
                    accession: accession.value.clone(),
                })
                .collect();
            sample_aliases = receipt.sample_aliases;
        }

        Ok(SubmissionOutcome {
            status,
            error,
            accessions,
            sample_aliases,
            receipt: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn classify(status: &SubmissionStatus) -> (String, Option<String>) {
    match status {
        SubmissionStatus::Succeeded => ("success".to_string(), None),
        SubmissionStatus::Failed(message) => ("failure".to_string(), Some(message.clone())),
        SubmissionStatus::Unparseable => ("unparseable".to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    const SUCCESS_RECEIPT: &[u8] = br#"<RECEIPT receiptDate="2024-05-01T10:00:00" submissionFile="submission.xml" success="true"><PROJECT accession="PRJEB1" alias="ST1"/><SAMPLE accession="ERS1" alias="s1"/><SAMPLE accession="ERS2" alias="s2"/></RECEIPT>"#;

    struct MockClient {
        response: Vec<u8>,
        calls: Mutex<Vec<Vec<SubmissionPart>>>,
    }

    impl MockClient {
        fn new(response: &[u8]) -> Self {
            Self {
                response: response.to_vec(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn part_keys(&self, call: usize) -> Vec<&'static str> {
            self.calls.lock().unwrap()[call]
                .iter()
                .map(|part| part.key)
                .collect()
        }
    }

    impl SubmissionClient for MockClient {
        fn submit(&self, parts: Vec<SubmissionPart>) -> Result<Vec<u8>, EnaError> {
            self.calls.lock().unwrap().push(parts);
            Ok(self.response.clone())
        }
    }

    fn study_table() -> StudyTable {
        StudyTable::from_reader("alias\tST1\ntitle\tMy Study\n".as_bytes(), "study.tsv").unwrap()
    }

    fn samples_table() -> SamplesTable {
        SamplesTable::from_reader(
            "alias\ttaxon_id\ns1\t9606\ns2\t9606\n".as_bytes(),
            "samples.tsv",
        )
        .unwrap()
    }

    fn experiment_table() -> ExperimentTable {
        ExperimentTable::from_reader(
            "study_ref\tsample_description\tplatform\tinstrument_model\t\
             library_strategy\tlibrary_source\tlibrary_selection\tlibrary_layout\n\
             ST1\ts1\tillumina\tIllumina MiSeq\tWGS\tGENOMIC\tRANDOM\tsingle\n\
             ST1\ts2\tillumina\tIllumina MiSeq\tWGS\tGENOMIC\tRANDOM\tsingle\n"
                .as_bytes(),
            "experiment.tsv",
        )
        .unwrap()
    }

    fn manifest() -> RunManifest {
        let table = crate::tabular::TabularFile::from_reader(
            "alias\tfilename\tchecksum\n\
             s1\ts1.fastq.gz\tabc\n\
             s2\ts2.fastq.gz\tdef\n"
                .as_bytes(),
            "manifest.tsv",
        )
        .unwrap();
        RunManifest::from_table(&table).unwrap()
    }

    fn transfer_report(rows: &str) -> TransferReport {
        TransferReport::from_reader(
            format!("alias\tfilename\tstatus\n{rows}").as_bytes(),
            "transfer.tsv",
        )
        .unwrap()
    }

    #[test]
    fn metadata_submission_requires_a_document() {
        let client = MockClient::new(SUCCESS_RECEIPT);
        let app = App::new(client);
        let err = app
            .submit_metadata(None, None, &SubmitOptions::default())
            .unwrap_err();
        assert_matches!(err, EnaError::EmptySubmission);
        assert_eq!(app.client.call_count(), 0);
    }

    #[test]
    fn metadata_submission_bundles_envelope_and_documents() {
        let client = MockClient::new(SUCCESS_RECEIPT);
        let app = App::new(client);
        let outcome = app
            .submit_metadata(
                Some(&study_table()),
                Some(&samples_table()),
                &SubmitOptions::default(),
            )
            .unwrap();

        assert_eq!(outcome.status, "success");
        assert_eq!(outcome.sample_aliases, vec!["s1", "s2"]);
        assert_eq!(outcome.accessions[0].accession, "PRJEB1");
        assert_eq!(app.client.part_keys(0), vec!["SUBMISSION", "PROJECT", "SAMPLE"]);
        let calls = app.client.calls.lock().unwrap();
        assert!(calls[0][0].content.contains("<ADD/>"));
        assert!(calls[0][1].content.starts_with("<PROJECT_SET>"));
        assert!(calls[0][2].content.starts_with("<SAMPLE_SET>"));
    }

    #[test]
    fn failed_receipt_is_reported_not_raised() {
        let client =
            MockClient::new(br#"<RECEIPT success="false"><ERROR>bad study</ERROR></RECEIPT>"#);
        let app = App::new(client);
        let outcome = app
            .submit_metadata(Some(&study_table()), None, &SubmitOptions::default())
            .unwrap();
        assert_eq!(outcome.status, "failure");
        assert_eq!(outcome.error.as_deref(), Some("bad study"));
    }

    #[test]
    fn reads_submission_gate_blocks_before_any_dispatch() {
        let client = MockClient::new(SUCCESS_RECEIPT);
        let app = App::new(client);
        let receipt = Receipt::parse(SUCCESS_RECEIPT).unwrap();
        // The transfer report is missing s2.
        let err = app
            .submit_reads(
                &experiment_table(),
                &manifest(),
                &transfer_report("s1\ts1.fastq.gz\tTrue\n"),
                &receipt,
                &SubmitOptions::default(),
            )
            .unwrap_err();
        assert_matches!(err, EnaError::SampleIdMismatch(_));
        assert_eq!(app.client.call_count(), 0);
    }

    #[test]
    fn reads_submission_bundles_experiments_and_runs() {
        let client = MockClient::new(SUCCESS_RECEIPT);
        let app = App::new(client);
        let receipt = Receipt::parse(SUCCESS_RECEIPT).unwrap();
        let outcome = app
            .submit_reads(
                &experiment_table(),
                &manifest(),
                &transfer_report("s1\ts1.fastq.gz\tTrue\ns2\ts2.fastq.gz\tTrue\n"),
                &receipt,
                &SubmitOptions::default(),
            )
            .unwrap();

        assert_eq!(outcome.status, "success");
        assert_eq!(app.client.part_keys(0), vec!["SUBMISSION", "EXPERIMENT", "RUN"]);
        let calls = app.client.calls.lock().unwrap();
        assert!(calls[0][1].content.starts_with("<EXPERIMENT_SET>"));
        assert!(calls[0][2].content.starts_with("<RUN_SET>"));
    }

    #[test]
    fn cancel_all_fans_out_in_receipt_order() {
        let client = MockClient::new(SUCCESS_RECEIPT);
        let app = App::new(client);
        let receipt = Receipt::parse(SUCCESS_RECEIPT).unwrap();
        let result = app.cancel_all(&receipt).unwrap();

        let accessions = result
            .cancellations
            .iter()
            .map(|outcome| outcome.accession.as_str())
            .collect::<Vec<_>>();
        assert_eq!(accessions, vec!["PRJEB1", "ERS1", "ERS2"]);
        assert_eq!(app.client.call_count(), 3);
        let calls = app.client.calls.lock().unwrap();
        assert!(calls[1][0].content.contains(r#"<CANCEL target="ERS1"/>"#));
    }

    #[test]
    fn validate_renders_documents_offline() {
        let result = validate_documents(
            Some(&study_table()),
            Some(&samples_table()),
            Some(&experiment_table()),
            Some(&manifest()),
        )
        .unwrap();
        let kinds = result
            .documents
            .iter()
            .map(|document| document.kind.as_str())
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec!["project", "sample", "experiment", "run"]);

        assert_matches!(
            validate_documents(None, None, None, None),
            Err(EnaError::EmptySubmission)
        );
    }
}
