use crate::error::EnaError;
use crate::metadata::{attributes_block, links_block, pair_violations};
use crate::routing::{Bucket, RoutingTable};
use crate::tabular::TabularRow;
use crate::xml::XmlNode;

const SPECIAL_FIELDS: &[&str] = &["alias", "title", "center_name", "name", "description"];

fn routing_table() -> RoutingTable {
    RoutingTable::new(Bucket::Ignored)
        .exacts(SPECIAL_FIELDS, Bucket::Scalar)
        .prefix("collaborator", Bucket::Collaborators)
        .prefix("project_attribute", Bucket::Attributes)
        .prefix("url_link", Bucket::UrlLinks)
        .prefix("xref_link", Bucket::XrefLinks)
}

/// One study (ENA "project") built from the key/value study file.
/// Construction never fails; required-field rules are enforced by
/// [`validate`](Study::validate) and [`to_xml`](Study::to_xml).
#[derive(Debug, Clone, Default)]
pub struct Study {
    pub alias: Option<String>,
    pub center_name: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub collaborators: Vec<String>,
    pub url_links: Vec<String>,
    pub xref_links: Vec<String>,
    pub attributes: Vec<String>,
}

impl Study {
    pub fn from_row(row: &TabularRow) -> Self {
        let routed = routing_table().route(row);
        Self {
            alias: routed.scalar("alias").map(str::to_string),
            center_name: routed.scalar("center_name").map(str::to_string),
            title: routed.scalar("title").map(str::to_string),
            name: routed.scalar("name").map(str::to_string),
            description: routed.scalar("description").map(str::to_string),
            collaborators: routed.bucket_values(Bucket::Collaborators),
            url_links: routed.bucket_values(Bucket::UrlLinks),
            xref_links: routed.bucket_values(Bucket::XrefLinks),
            attributes: routed.bucket_values(Bucket::Attributes),
        }
    }

    /// Every rule violation, in document order.
    pub fn validate(&self) -> Vec<EnaError> {
        let mut violations = Vec::new();
        if self.alias.is_none() {
            violations.push(EnaError::MissingField {
                entity: "study",
                field: "alias",
            });
        }
        if self.title.is_none() {
            violations.push(EnaError::MissingField {
                entity: "study",
                field: "title",
            });
        }
        violations.extend(pair_violations(&self.url_links));
        violations.extend(pair_violations(&self.xref_links));
        violations.extend(pair_violations(&self.attributes));
        violations
    }

    /// The `PROJECT` element. Fails on the first rule violation.
    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        if let Some(violation) = self.validate().into_iter().next() {
            return Err(violation);
        }
        let alias = self.alias.as_deref().unwrap_or_default();
        let mut project = XmlNode::new("PROJECT").attr("alias", alias);
        if let Some(center_name) = &self.center_name {
            project = project.attr("center_name", center_name);
        }

        if let Some(name) = &self.name {
            project.add_child(XmlNode::leaf("NAME", name));
        }
        project.add_child(XmlNode::leaf("TITLE", self.title.as_deref().unwrap_or_default()));
        if let Some(description) = &self.description {
            project.add_child(XmlNode::leaf("DESCRIPTION", description));
        }

        if !self.collaborators.is_empty() {
            let mut collaborators = XmlNode::new("COLLABORATORS");
            for collaborator in &self.collaborators {
                collaborators.add_child(XmlNode::leaf("COLLABORATOR", collaborator));
            }
            project.add_child(collaborators);
        }

        // Fixed marker pair the archive expects on every sequencing project.
        project.add_child(XmlNode::new("SUBMISSION_PROJECT").child(XmlNode::new("SEQUENCING_PROJECT")));

        if let Some(links) = links_block(
            "PROJECT_LINKS",
            "PROJECT_LINK",
            &self.url_links,
            &self.xref_links,
        )? {
            project.add_child(links);
        }
        if let Some(attributes) =
            attributes_block("PROJECT_ATTRIBUTES", "PROJECT_ATTRIBUTE", &self.attributes)?
        {
            project.add_child(attributes);
        }
        Ok(project)
    }
}

/// Ordered studies serialized under one `PROJECT_SET` root.
#[derive(Debug, Clone, Default)]
pub struct StudySet {
    studies: Vec<Study>,
}

impl StudySet {
    pub fn from_rows<'a, I: IntoIterator<Item = &'a TabularRow>>(rows: I) -> Self {
        Self {
            studies: rows.into_iter().map(Study::from_row).collect(),
        }
    }

    pub fn push(&mut self, study: Study) {
        self.studies.push(study);
    }

    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        let mut root = XmlNode::new("PROJECT_SET");
        for study in &self.studies {
            root.add_child(study.to_xml()?);
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
    fn minimal_study_round_trip() {
        let row = TabularRow::from_pairs([("alias", "ST1"), ("title", "My Study")]);
        let mut set = StudySet::default();
        set.push(Study::from_row(&row));
        assert_eq!(
            set.to_xml_string().unwrap(),
            "<PROJECT_SET><PROJECT alias=\"ST1\"><TITLE>My Study</TITLE>\
             <SUBMISSION_PROJECT><SEQUENCING_PROJECT/></SUBMISSION_PROJECT>\
             </PROJECT></PROJECT_SET>"
        );
    }

    #[test]
    fn missing_title_fails() {
        let study = Study::from_row(&TabularRow::from_pairs([("alias", "ST1")]));
        assert_matches!(
            study.to_xml(),
            Err(EnaError::MissingField {
                entity: "study",
                field: "title"
            })
        );
    }

    #[test]
    fn blank_alias_counts_as_missing() {
        let study = Study::from_row(&TabularRow::from_pairs([
            ("alias", ""),
            ("title", "My Study"),
        ]));
        let violations = study.validate();
        assert_eq!(violations.len(), 1);
        assert_matches!(
            &violations[0],
            EnaError::MissingField {
                entity: "study",
                field: "alias"
            }
        );
    }

    #[test]
    fn links_and_attributes_are_nested() {
        let row = TabularRow::from_pairs([
            ("alias", "ST1"),
            ("title", "My Study"),
            ("center_name", "lab"),
            ("collaborator1", "J. Doe"),
            ("url_link_1", "lab site|https://lab.org"),
            ("xref_link_1", "PUBMED|123"),
            ("project_attribute_1", "depth|deep"),
        ]);
        let xml = Study::from_row(&row).to_xml().unwrap().to_xml_string().unwrap();
        assert!(xml.contains("<COLLABORATORS><COLLABORATOR>J. Doe</COLLABORATOR></COLLABORATORS>"));
        assert!(xml.contains(
            "<PROJECT_LINK><URL_LINK><LABEL>lab site</LABEL><URL>https://lab.org</URL></URL_LINK></PROJECT_LINK>"
        ));
        assert!(xml.contains(
            "<PROJECT_LINK><XREF_LINK><DB>PUBMED</DB><ID>123</ID></XREF_LINK></PROJECT_LINK>"
        ));
        assert!(xml.contains(
            "<PROJECT_ATTRIBUTE><TAG>depth</TAG><VALUE>deep</VALUE></PROJECT_ATTRIBUTE>"
        ));
    }

    #[test]
    fn malformed_link_fails_instead_of_truncating() {
        let row = TabularRow::from_pairs([
            ("alias", "ST1"),
            ("title", "My Study"),
            ("url_link_1", "label|url|extra"),
        ]);
        assert_matches!(
            Study::from_row(&row).to_xml(),
            Err(EnaError::MalformedPair { .. })
        );
    }
}
