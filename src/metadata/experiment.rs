use crate::error::EnaError;
use crate::metadata::library::Library;
use crate::metadata::{attributes_block, pair_violations};
use crate::routing::{Bucket, RoutingTable};
use crate::tabular::TabularRow;
use crate::xml::XmlNode;

const SPECIAL_FIELDS: &[&str] = &[
    "title",
    "study_ref",
    "sample_description",
    "platform",
    "instrument_model",
];

fn routing_table() -> RoutingTable {
    RoutingTable::new(Bucket::Ignored)
        .exacts(SPECIAL_FIELDS, Bucket::Scalar)
        .prefix("library", Bucket::Library)
        .prefix("exp_attribute", Bucket::Attributes)
}

/// One experiment built from a row of the experiment table. The alias is
/// derived from `sample_description` (`exp_<sample>`), which makes that
/// field identity-bearing rather than a mere reference.
#[derive(Debug, Clone, Default)]
pub struct Experiment {
    pub title: Option<String>,
    pub study_ref: Option<String>,
    pub sample_description: Option<String>,
    pub platform: Option<String>,
    pub instrument_model: Option<String>,
    /// Raw `library_*` columns as routed, blanks included; needed to tell
    /// "no descriptors at all" apart from "descriptors present but empty".
    pub library_columns: Vec<(String, String)>,
    pub attributes: Vec<String>,
}

impl Experiment {
    pub fn from_row(row: &TabularRow) -> Self {
        let routed = routing_table().route(row);
        Self {
            title: routed.scalar("title").map(str::to_string),
            study_ref: routed.scalar("study_ref").map(str::to_string),
            sample_description: routed.scalar("sample_description").map(str::to_string),
            platform: routed.scalar("platform").map(str::to_string),
            instrument_model: routed.scalar("instrument_model").map(str::to_string),
            library_columns: routed.bucket(Bucket::Library).to_vec(),
            attributes: routed.bucket_values(Bucket::Attributes),
        }
    }

    pub fn library(&self) -> Library {
        Library::from_columns(&self.library_columns)
    }

    pub fn validate(&self) -> Vec<EnaError> {
        let mut violations = Vec::new();
        for (field, value) in [
            ("sample_description", &self.sample_description),
            ("study_ref", &self.study_ref),
            ("platform", &self.platform),
            ("instrument_model", &self.instrument_model),
        ] {
            if value.is_none() {
                violations.push(EnaError::MissingField {
                    entity: "experiment",
                    field,
                });
            }
        }
        if !self.library_columns.is_empty()
            && self.library_columns.iter().all(|(_, value)| value.is_empty())
        {
            violations.push(EnaError::EmptyLibraryDescriptors);
        } else {
            violations.extend(self.library().validate());
        }
        violations.extend(pair_violations(&self.attributes));
        violations
    }

    /// The `EXPERIMENT` element. Fails on the first rule violation.
    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        if let Some(violation) = self.validate().into_iter().next() {
            return Err(violation);
        }
        let sample = self.sample_description.as_deref().unwrap_or_default();
        let mut experiment =
            XmlNode::new("EXPERIMENT").attr("alias", &format!("exp_{sample}"));

        if let Some(title) = &self.title {
            experiment.add_child(XmlNode::leaf("TITLE", title));
        }
        experiment.add_child(
            XmlNode::new("STUDY_REF").attr("refname", self.study_ref.as_deref().unwrap_or_default()),
        );

        let design = XmlNode::new("DESIGN")
            .child(XmlNode::new("DESIGN_DESCRIPTION"))
            .child(XmlNode::new("SAMPLE_DESCRIPTOR").attr("refname", sample))
            .child(self.library().to_xml()?);
        experiment.add_child(design);

        let platform = self.platform.as_deref().unwrap_or_default().to_uppercase();
        experiment.add_child(
            XmlNode::new("PLATFORM").child(XmlNode::new(&platform).child(XmlNode::leaf(
                "INSTRUMENT_MODEL",
                self.instrument_model.as_deref().unwrap_or_default(),
            ))),
        );

        if let Some(attributes) =
            attributes_block("EXPERIMENT_ATTRIBUTES", "EXPERIMENT_ATTRIBUTE", &self.attributes)?
        {
            experiment.add_child(attributes);
        }
        Ok(experiment)
    }
}

/// Ordered experiments serialized under one `EXPERIMENT_SET` root.
#[derive(Debug, Clone, Default)]
pub struct ExperimentSet {
    experiments: Vec<Experiment>,
}

impl ExperimentSet {
    pub fn from_rows<'a, I: IntoIterator<Item = &'a TabularRow>>(rows: I) -> Self {
        Self {
            experiments: rows.into_iter().map(Experiment::from_row).collect(),
        }
    }

    pub fn push(&mut self, experiment: Experiment) {
        self.experiments.push(experiment);
    }

    /// Sample identifiers in row order, used by the cross-reference check.
    pub fn sample_ids(&self) -> Vec<String> {
        self.experiments
            .iter()
            .filter_map(|experiment| experiment.sample_description.clone())
            .collect()
    }

    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        let mut root = XmlNode::new("EXPERIMENT_SET");
        for experiment in &self.experiments {
            root.add_child(experiment.to_xml()?);
        }
        Ok(root)
    }

    pub fn to_xml_string(&self) -> Result<String, EnaError> {
        self.to_xml()?.to_xml_string()
    }
}
