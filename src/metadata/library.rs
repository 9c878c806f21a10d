use tracing::warn;

use crate::error::EnaError;
use crate::xml::XmlNode;

/// Library descriptor nested inside an experiment, built from the
/// `library_*` columns of the experiment table.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub strategy: Option<String>,
    pub source: Option<String>,
    pub selection: Option<String>,
    pub layout: Option<String>,
    pub nominal_length: Option<String>,
    pub nominal_sdev: Option<String>,
    pub construction_protocol: Option<String>,
}

impl Library {
    /// Builds from (column, value) pairs routed into the library bucket.
    /// Blank cells count as absent.
    pub fn from_columns(columns: &[(String, String)]) -> Self {
        let mut library = Self::default();
        for (column, value) in columns {
            if value.is_empty() {
                continue;
            }
            let value = Some(value.clone());
            match column.as_str() {
                "library_strategy" => library.strategy = value,
                "library_source" => library.source = value,
                "library_selection" => library.selection = value,
                "library_layout" => library.layout = value,
                "library_nominal_length" => library.nominal_length = value,
                "library_nominal_sdev" => library.nominal_sdev = value,
                "library_construction_protocol" => library.construction_protocol = value,
                _ => {}
            }
        }
        library
    }

    pub fn validate(&self) -> Vec<EnaError> {
        let required: [(&'static str, &Option<String>); 4] = [
            ("library_strategy", &self.strategy),
            ("library_source", &self.source),
            ("library_selection", &self.selection),
            ("library_layout", &self.layout),
        ];
        required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| EnaError::MissingField {
                entity: "library",
                field,
            })
            .collect()
    }

    /// The `LIBRARY_DESCRIPTOR` element. A `PAIRED` layout carries the
    /// nominal attributes only when supplied; a nominal sdev without a
    /// nominal length is ignored with a warning.
    pub fn to_xml(&self) -> Result<XmlNode, EnaError> {
        if let Some(violation) = self.validate().into_iter().next() {
            return Err(violation);
        }
        let mut descriptor = XmlNode::new("LIBRARY_DESCRIPTOR")
            .child(XmlNode::leaf(
                "LIBRARY_STRATEGY",
                self.strategy.as_deref().unwrap_or_default(),
            ))
            .child(XmlNode::leaf(
                "LIBRARY_SOURCE",
                self.source.as_deref().unwrap_or_default(),
            ))
            .child(XmlNode::leaf(
                "LIBRARY_SELECTION",
                self.selection.as_deref().unwrap_or_default(),
            ));

        let layout = self.layout.as_deref().unwrap_or_default();
        let layout_child = if layout.eq_ignore_ascii_case("paired") {
            let mut paired = XmlNode::new("PAIRED");
            match (&self.nominal_length, &self.nominal_sdev) {
                (Some(length), Some(sdev)) => {
                    paired = paired
                        .attr("NOMINAL_LENGTH", length)
                        .attr("NOMINAL_SDEV", sdev);
                }
                (Some(length), None) => {
                    paired = paired.attr("NOMINAL_LENGTH", length);
                }
                (None, Some(_)) => {
                    warn!(
                        "library_nominal_sdev requires library_nominal_length, \
                         ignoring the sdev value"
                    );
                }
                (None, None) => {}
            }
            paired
        } else {
            XmlNode::new("SINGLE")
        };
        descriptor.add_child(XmlNode::new("LIBRARY_LAYOUT").child(layout_child));

        if let Some(protocol) = &self.construction_protocol {
            descriptor.add_child(XmlNode::leaf("LIBRARY_CONSTRUCTION_PROTOCOL", protocol));
        }
        Ok(descriptor)
    }
}
