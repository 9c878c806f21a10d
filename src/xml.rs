use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::EnaError;

/// One node of an ENA document tree: a tag with ordered attributes,
/// optional text content and ordered children. Serialization is
/// deterministic, so building the same tree twice yields identical bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Leaf element holding only text content.
    pub fn leaf(tag: &str, text: &str) -> Self {
        Self::new(tag).text(text)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, value: &str) -> Self {
        self.text = Some(value.to_string());
        self
    }

    pub fn child(mut self, node: XmlNode) -> Self {
        self.children.push(node);
        self
    }

    pub fn add_child(&mut self, node: XmlNode) {
        self.children.push(node);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serializes the tree as UTF-8 XML without a declaration. Childless,
    /// textless elements collapse to `<TAG/>`.
    pub fn to_xml_string(&self) -> Result<String, EnaError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_into(&mut writer)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|err| EnaError::XmlWrite(err.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), EnaError> {
        let mut start = BytesStart::new(self.tag.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|err| EnaError::XmlWrite(err.to_string()))?;
            return Ok(());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|err| EnaError::XmlWrite(err.to_string()))?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|err| EnaError::XmlWrite(err.to_string()))?;
        }
        for node in &self.children {
            node.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.tag.as_str())))
            .map_err(|err| EnaError::XmlWrite(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_element_collapses() {
        let node = XmlNode::new("SEQUENCING_PROJECT");
        assert_eq!(node.to_xml_string().unwrap(), "<SEQUENCING_PROJECT/>");
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let node = XmlNode::new("PROJECT")
            .attr("alias", "ST1")
            .attr("center_name", "lab");
        assert_eq!(
            node.to_xml_string().unwrap(),
            r#"<PROJECT alias="ST1" center_name="lab"/>"#
        );
    }

    #[test]
    fn text_is_escaped() {
        let node = XmlNode::leaf("TITLE", "a < b & c");
        assert_eq!(
            node.to_xml_string().unwrap(),
            "<TITLE>a &lt; b &amp; c</TITLE>"
        );
    }

    #[test]
    fn serialization_is_idempotent() {
        let node = XmlNode::new("RUN")
            .attr("alias", "run_s1")
            .child(XmlNode::new("EXPERIMENT_REF").attr("refname", "exp_s1"));
        assert_eq!(
            node.to_xml_string().unwrap(),
            node.to_xml_string().unwrap()
        );
    }
}
