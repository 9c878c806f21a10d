use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;

use ena_submit::app::{App, SubmitOptions};
use ena_submit::domain::Action;
use ena_submit::error::EnaError;
use ena_submit::formats::{ExperimentTable, SamplesTable, StudyTable};
use ena_submit::metadata::run::RunManifest;
use ena_submit::receipt::Receipt;
use ena_submit::submit::{SubmissionClient, SubmissionPart};
use ena_submit::tabular::TabularFile;
use ena_submit::transfer::TransferReport;

const METADATA_RECEIPT: &[u8] = br#"<RECEIPT receiptDate="2024-05-01T10:00:00" submissionFile="submission.xml" success="true"><PROJECT accession="PRJEB100" alias="ST1"/><SAMPLE accession="ERS100" alias="s1"/><SAMPLE accession="ERS101" alias="s2"/></RECEIPT>"#;

const READS_RECEIPT: &[u8] = br#"<RECEIPT receiptDate="2024-05-02T10:00:00" submissionFile="submission.xml" success="true"><EXPERIMENT accession="ERX100" alias="exp_s1"/><EXPERIMENT accession="ERX101" alias="exp_s2"/><RUN accession="ERR100" alias="run_s1"/><RUN accession="ERR101" alias="run_s2"/></RECEIPT>"#;

type RequestLog = Arc<Mutex<Vec<Vec<SubmissionPart>>>>;

/// Returns canned receipts in sequence, one per request, recording every
/// request into a log shared with the test.
struct ScriptedClient {
    responses: Mutex<Vec<Vec<u8>>>,
    requests: RequestLog,
}

impl ScriptedClient {
    fn new(responses: &[&[u8]]) -> (Self, RequestLog) {
        let mut queue = responses.iter().map(|bytes| bytes.to_vec()).collect::<Vec<_>>();
        queue.reverse();
        let requests = RequestLog::default();
        let client = Self {
            responses: Mutex::new(queue),
            requests: Arc::clone(&requests),
        };
        (client, requests)
    }
}

impl SubmissionClient for ScriptedClient {
    fn submit(&self, parts: Vec<SubmissionPart>) -> Result<Vec<u8>, EnaError> {
        self.requests.lock().unwrap().push(parts);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| EnaError::SubmitHttp("unexpected request".to_string()))
    }
}

fn study() -> StudyTable {
    StudyTable::from_reader(
        "alias\tST1\ntitle\tSoil metagenome survey\n".as_bytes(),
        "study.tsv",
    )
    .unwrap()
}

fn samples() -> SamplesTable {
    SamplesTable::from_reader(
        "alias\ttaxon_id\tscientific_name\n\
         s1\t410658\tsoil metagenome\n\
         s2\t410658\tsoil metagenome\n"
            .as_bytes(),
        "samples.tsv",
    )
    .unwrap()
}

fn experiments() -> ExperimentTable {
    ExperimentTable::from_reader(
        "study_ref\tsample_description\tplatform\tinstrument_model\t\
         library_strategy\tlibrary_source\tlibrary_selection\tlibrary_layout\n\
         ST1\ts1\tillumina\tIllumina MiSeq\tAMPLICON\tMETAGENOMIC\tPCR\tpaired\n\
         ST1\ts2\tillumina\tIllumina MiSeq\tAMPLICON\tMETAGENOMIC\tPCR\tpaired\n"
            .as_bytes(),
        "experiment.tsv",
    )
    .unwrap()
}

fn manifest() -> RunManifest {
    let table = TabularFile::from_reader(
        "alias\tfilename\tchecksum\n\
         s1\ts1_R1.fastq.gz\taaa\n\
         s1\ts1_R2.fastq.gz\tbbb\n\
         s2\ts2_R1.fastq.gz\tccc\n\
         s2\ts2_R2.fastq.gz\tddd\n"
            .as_bytes(),
        "manifest.tsv",
    )
    .unwrap();
    RunManifest::from_table(&table).unwrap()
}

fn transfer() -> TransferReport {
    TransferReport::from_reader(
        "alias\tfilename\tstatus\n\
         s1_f\ts1_R1.fastq.gz\tTrue\n\
         s1_r\ts1_R2.fastq.gz\tTrue\n\
         s2_f\ts2_R1.fastq.gz\tTrue\n\
         s2_r\ts2_R2.fastq.gz\tTrue\n"
            .as_bytes(),
        "transfer.tsv",
    )
    .unwrap()
}

#[test]
fn metadata_then_reads_then_cancellation() {
    // Phase 1: study and samples.
    let (client, _requests) = ScriptedClient::new(&[METADATA_RECEIPT]);
    let app = App::new(client);
    let metadata = app
        .submit_metadata(Some(&study()), Some(&samples()), &SubmitOptions::default())
        .unwrap();
    assert_eq!(metadata.status, "success");
    assert_eq!(metadata.sample_aliases, vec!["s1", "s2"]);

    // Phase 2: reads, gated on the phase-1 receipt. The transfer report
    // carries paired-end suffixes that must fold back to s1/s2.
    let sample_receipt = Receipt::parse(metadata.receipt.as_bytes()).unwrap();
    let (client, requests) = ScriptedClient::new(&[READS_RECEIPT]);
    let app = App::new(client);
    let reads = app
        .submit_reads(
            &experiments(),
            &manifest(),
            &transfer(),
            &sample_receipt,
            &SubmitOptions::default(),
        )
        .unwrap();
    assert_eq!(reads.status, "success");
    assert_eq!(reads.accessions.len(), 4);
    assert_eq!(reads.accessions[0].object_type, "EXPERIMENT");

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0][2].content.contains("run_s1"));
    assert!(requests[0][2].content.contains("run_s2"));

    // Phase 3: cancel everything the reads receipt assigned.
    let reads_receipt = Receipt::parse(reads.receipt.as_bytes()).unwrap();
    let (client, _requests) = ScriptedClient::new(&[
        METADATA_RECEIPT,
        METADATA_RECEIPT,
        METADATA_RECEIPT,
        METADATA_RECEIPT,
    ]);
    let app = App::new(client);
    let cancelled = app.cancel_all(&reads_receipt).unwrap();
    let accessions = cancelled
        .cancellations
        .iter()
        .map(|outcome| outcome.accession.as_str())
        .collect::<Vec<_>>();
    assert_eq!(accessions, vec!["ERX100", "ERX101", "ERR100", "ERR101"]);
}

#[test]
fn hold_date_is_validated_before_dispatch() {
    let (client, requests) = ScriptedClient::new(&[METADATA_RECEIPT]);
    let app = App::new(client);
    let options = SubmitOptions {
        action: Action::Add,
        hold_date: "2019-01-01".to_string(),
    };
    let err = app
        .submit_metadata(Some(&study()), None, &options)
        .unwrap_err();
    assert_matches!(err, EnaError::InvalidHoldDate(_));
    assert!(requests.lock().unwrap().is_empty());
}

#[test]
fn transport_error_during_fan_out_is_recorded() {
    // Only one scripted response; the second cancellation hits an error
    // but the fan-out still reports every accession.
    let receipt = Receipt::parse(METADATA_RECEIPT).unwrap();
    let (client, _requests) = ScriptedClient::new(&[METADATA_RECEIPT]);
    let app = App::new(client);
    let result = app.cancel_all(&receipt).unwrap();
    assert_eq!(result.cancellations.len(), 3);
    assert_eq!(result.cancellations[0].status, "success");
    assert_eq!(result.cancellations[1].status, "failure");
    assert!(
        result.cancellations[1]
            .error
            .as_deref()
            .unwrap()
            .contains("unexpected request")
    );
}
