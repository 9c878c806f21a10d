use std::collections::BTreeSet;

use crate::error::EnaError;

/// The four independent sample-identifier sources reconciled before a
/// reads submission is dispatched: the sequence manifest, the
/// file-transfer report, the prior sample-submission receipt and the
/// experiment table.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceSet {
    manifest: BTreeSet<String>,
    transfer: BTreeSet<String>,
    receipt: BTreeSet<String>,
    experiment: BTreeSet<String>,
}

impl CrossReferenceSet {
    /// `transfer_ids` are taken as reported, i.e. possibly carrying the
    /// `_f`/`_r` pairing suffixes, and folded back to base identifiers.
    pub fn new<I, J, K, L>(manifest_ids: I, transfer_ids: J, receipt_ids: K, experiment_ids: L) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
        K: IntoIterator<Item = String>,
        L: IntoIterator<Item = String>,
    {
        Self {
            manifest: manifest_ids.into_iter().collect(),
            transfer: fold_pair_suffixes(&transfer_ids.into_iter().collect()),
            receipt: receipt_ids.into_iter().collect(),
            experiment: experiment_ids.into_iter().collect(),
        }
    }

    /// Hard gate: exact set equality between the manifest and each other
    /// source. All three comparisons run before raising so the aggregated
    /// report is complete.
    pub fn validate(&self) -> Result<(), EnaError> {
        let mut lines = Vec::new();
        compare(&self.manifest, &self.transfer, "the file transfer report", &mut lines);
        compare(&self.manifest, &self.receipt, "the submission receipt", &mut lines);
        compare(&self.manifest, &self.experiment, "the experiment metadata", &mut lines);
        if lines.is_empty() {
            Ok(())
        } else {
            Err(EnaError::SampleIdMismatch(lines.join("\n")))
        }
    }
}

fn compare(
    manifest: &BTreeSet<String>,
    other: &BTreeSet<String>,
    source: &str,
    lines: &mut Vec<String>,
) {
    let missing = manifest.difference(other).cloned().collect::<Vec<_>>();
    if !missing.is_empty() {
        lines.push(format!(
            "- samples in the manifest but missing in {source}: {}",
            missing.join(", ")
        ));
    }
    let extra = other.difference(manifest).cloned().collect::<Vec<_>>();
    if !extra.is_empty() {
        lines.push(format!(
            "- extra samples in {source} not in the manifest: {}",
            extra.join(", ")
        ));
    }
}

/// Folds the `_f`/`_r` suffixes the file-transfer report appends to
/// paired-end identifiers. A base identifier is re-added only when both
/// suffixed forms are present; unsuffixed identifiers pass through.
pub fn fold_pair_suffixes(ids: &BTreeSet<String>) -> BTreeSet<String> {
    let mut base_ids = BTreeSet::new();
    let mut suffixed = BTreeSet::new();
    for id in ids {
        if let Some(base) = id.strip_suffix("_f").or_else(|| id.strip_suffix("_r")) {
            suffixed.insert(base.to_string());
        } else {
            base_ids.insert(id.clone());
        }
    }
    for base in suffixed {
        if ids.contains(&format!("{base}_f")) && ids.contains(&format!("{base}_r")) {
            base_ids.insert(base);
        }
    }
    base_ids
}
