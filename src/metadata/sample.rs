use crate::domain::AttributeValue;
use crate::error::EnaError;
use crate::metadata::{links_block, pair_violations};
use crate::routing::{Bucket, RoutingTable};
use crate::tabular::TabularRow;
use crate::xml::XmlNode;

const SPECIAL_FIELDS: &[&str] = &[
    "alias",
    "center_name",
    "title",
    "taxon_id",
    "scientific_name",
    "common_name",
    "description",
];

fn routing_table() -> RoutingTable {
    // Unmatched columns are free-form sample attributes (checklist fields).
    RoutingTable::new(Bucket::Attributes)
        .exacts(SPECIAL_FIELDS, Bucket::Scalar)
        .prefix("url_link", Bucket::UrlLinks)
        .prefix("xref_link", Bucket::XrefLinks)
}

/// One sample built from a row of the samples table.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub alias: Option<String>,
    pub center_name: Option<String>,
    pub title: Option<String>,
    pub taxon_id: Option<String>,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub description: Option<String>,
    pub url_links: Vec<String>,
    pub xref_links: Vec<String>,
    /// (tag, value) attribute pairs; the value may carry a `|units` suffix.
    pub attributes: Vec<(String, String)>,
}

impl Sample {
    pub fn from_row(row: &TabularRow) -> Self {
        let routed = routing_table().route(row);
        Self {
            alias: routed.scalar("alias").map(str::to_string),
            center_name: routed.scalar("center_name").map(str::to_string),
            title: routed.scalar("title").map(str::to_string),
            taxon_id: routed.scalar("taxon_id").map(str::to_string),
            scientific_name: routed.scalar("scientific_name").map(str::to_string),
            common_name: routed.scalar("common_name").map(str::to_string),
            description: routed.scalar("description").map(str::to_string),
            url_links: routed.bucket_values(Bucket::UrlLinks),
            xref_links: routed.bucket_values(Bucket::XrefLinks),
            attributes: routed
                .bucket(Bucket::Attributes)
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn validate(&self) -> Vec<EnaError> {
        let mut violations = Vec::new();
        if self.alias.is_none() {
            violations.push(EnaError::MissingField {
                entity: "sample",
                field: "alias",
            });
        }
        if self.taxon_id.is_none() {
            violations.push(EnaError::MissingField {
                entity: "sample",
                field: "taxon_id",
            });
        }
        violations.extend(pair_violations(&self.url_links));
        violations.extend(pair_violations(&self.xref_links));
        violations.extend(
            self.attributes
                .iter()
                .filter_map(|(_, value)| AttributeValue::parse(value).err()),
        );
        violations
    }

    /// The `SAMPLE` element. Fails on the first rule violation.
    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        if let Some(violation) = self.validate().into_iter().next() {
            return Err(violation);
        }
        let alias = self.alias.as_deref().unwrap_or_default();
        let mut sample = XmlNode::new("SAMPLE").attr("alias", alias);
        if let Some(center_name) = &self.center_name {
            sample = sample.attr("center_name", center_name);
        }

        if let Some(title) = &self.title {
            sample.add_child(XmlNode::leaf("TITLE", title));
        }

        let mut sample_name = XmlNode::new("SAMPLE_NAME").child(XmlNode::leaf(
            "TAXON_ID",
            self.taxon_id.as_deref().unwrap_or_default(),
        ));
        if let Some(scientific_name) = &self.scientific_name {
            sample_name.add_child(XmlNode::leaf("SCIENTIFIC_NAME", scientific_name));
        }
        if let Some(common_name) = &self.common_name {
            sample_name.add_child(XmlNode::leaf("COMMON_NAME", common_name));
        }
        sample.add_child(sample_name);

        if let Some(description) = &self.description {
            sample.add_child(XmlNode::leaf("DESCRIPTION", description));
        }

        if let Some(links) = links_block(
            "SAMPLE_LINKS",
            "SAMPLE_LINK",
            &self.url_links,
            &self.xref_links,
        )? {
            sample.add_child(links);
        }

        if !self.attributes.is_empty() {
            let mut attributes = XmlNode::new("SAMPLE_ATTRIBUTES");
            for (tag, raw_value) in &self.attributes {
                let value = AttributeValue::parse(raw_value)?;
                let mut attribute = XmlNode::new("SAMPLE_ATTRIBUTE")
                    .child(XmlNode::leaf("TAG", tag))
                    .child(XmlNode::leaf("VALUE", &value.value));
                if let Some(units) = &value.units {
                    attribute.add_child(XmlNode::leaf("UNITS", units));
                }
                attributes.add_child(attribute);
            }
            sample.add_child(attributes);
        }

        Ok(sample)
    }
}

/// Ordered samples serialized under one `SAMPLE_SET` root; row order is
/// preserved into the document.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn from_rows<'a, I: IntoIterator<Item = &'a TabularRow>>(rows: I) -> Self {
        Self {
            samples: rows.into_iter().map(Sample::from_row).collect(),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        let mut root = XmlNode::new("SAMPLE_SET");
        for sample in &self.samples {
            root.add_child(sample.to_xml()?);
        }
        Ok(root)
    }

    pub fn to_xml_string(&self) -> Result<String, EnaError> {
        self.to_xml()?.to_xml_string()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn minimal_sample_round_trip() {
        let row = TabularRow::from_pairs([("alias", "S1"), ("taxon_id", "9606")]);
        let xml = Sample::from_row(&row).to_xml().unwrap().to_xml_string().unwrap();
        assert_eq!(
            xml,
            "<SAMPLE alias=\"S1\"><SAMPLE_NAME><TAXON_ID>9606</TAXON_ID></SAMPLE_NAME></SAMPLE>"
        );
    }

    #[test]
    fn missing_taxon_id_fails() {
        let sample = Sample::from_row(&TabularRow::from_pairs([("alias", "S1")]));
        assert_matches!(
            sample.to_xml(),
            Err(EnaError::MissingField {
                entity: "sample",
                field: "taxon_id"
            })
        );
    }

    #[test]
    fn unmatched_columns_become_attributes() {
        let row = TabularRow::from_pairs([
            ("alias", "S1"),
            ("taxon_id", "9606"),
            ("isolation_source", "gut"),
            ("temperature", "37|celsius"),
        ]);
        let xml = Sample::from_row(&row).to_xml().unwrap().to_xml_string().unwrap();
        assert!(xml.contains(
            "<SAMPLE_ATTRIBUTE><TAG>isolation_source</TAG><VALUE>gut</VALUE></SAMPLE_ATTRIBUTE>"
        ));
        assert!(xml.contains(
            "<SAMPLE_ATTRIBUTE><TAG>temperature</TAG><VALUE>37</VALUE><UNITS>celsius</UNITS></SAMPLE_ATTRIBUTE>"
        ));
    }

    #[test]
    fn sample_set_preserves_row_order() {
        let rows = vec![
            TabularRow::from_pairs([("alias", "S2"), ("taxon_id", "9606")]),
            TabularRow::from_pairs([("alias", "S1"), ("taxon_id", "4932")]),
        ];
        let xml = SampleSet::from_rows(&rows).to_xml_string().unwrap();
        let first = xml.find("alias=\"S2\"").unwrap();
        let second = xml.find("alias=\"S1\"").unwrap();
        assert!(first < second);
    }
}
