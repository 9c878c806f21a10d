pub mod experiment;
pub mod library;
pub mod run;
pub mod sample;
pub mod study;

use crate::domain::PipePair;
use crate::error::EnaError;
use crate::xml::XmlNode;

/// Builds the optional `*_LINKS` block shared by studies and samples: one
/// `link_tag` child per url link (`label|url`) and per xref link (`db|id`).
/// Returns `None` when there are no links at all.
pub(crate) fn links_block(
    block_tag: &str,
    link_tag: &str,
    url_links: &[String],
    xref_links: &[String],
) -> Result<Option<XmlNode>, EnaError> {
    if url_links.is_empty() && xref_links.is_empty() {
        return Ok(None);
    }
    let mut block = XmlNode::new(block_tag);
    for link in url_links {
        let pair = PipePair::parse(link)?;
        block.add_child(
            XmlNode::new(link_tag).child(
                XmlNode::new("URL_LINK")
                    .child(XmlNode::leaf("LABEL", &pair.left))
                    .child(XmlNode::leaf("URL", &pair.right)),
            ),
        );
    }
    for link in xref_links {
        let pair = PipePair::parse(link)?;
        block.add_child(
            XmlNode::new(link_tag).child(
                XmlNode::new("XREF_LINK")
                    .child(XmlNode::leaf("DB", &pair.left))
                    .child(XmlNode::leaf("ID", &pair.right)),
            ),
        );
    }
    Ok(Some(block))
}

/// Builds the optional `*_ATTRIBUTES` block from `tag|value` compound
/// values. Returns `None` when there are no attributes.
pub(crate) fn attributes_block(
    block_tag: &str,
    item_tag: &str,
    attributes: &[String],
) -> Result<Option<XmlNode>, EnaError> {
    if attributes.is_empty() {
        return Ok(None);
    }
    let mut block = XmlNode::new(block_tag);
    for attribute in attributes {
        let pair = PipePair::parse(attribute)?;
        block.add_child(
            XmlNode::new(item_tag)
                .child(XmlNode::leaf("TAG", &pair.left))
                .child(XmlNode::leaf("VALUE", &pair.right)),
        );
    }
    Ok(Some(block))
}

/// Collects link/attribute arity violations without building a document,
/// so `validate()` can report them alongside missing required fields.
pub(crate) fn pair_violations(values: &[String]) -> Vec<EnaError> {
    values
        .iter()
        .filter_map(|value| PipePair::parse(value).err())
        .collect()
}
