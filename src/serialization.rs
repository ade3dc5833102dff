use std::io;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::model::tree;

pub use roxmltree::Error as ParseError;

/// Builds an arena tree from XML text. Whitespace-only text content between
/// elements is dropped; everything else round-trips structurally.
pub fn parse_tree(text: &str) -> Result<tree::Tree, ParseError> {
    let document = roxmltree::Document::parse(text)?;
    let root = document.root_element();

    let mut out = tree::Tree::new(root.tag_name().name());
    let root_id = out.root();

    copy_element(&mut out, root_id, root);

    Ok(out)
}

fn copy_element(out: &mut tree::Tree, id: tree::NodeId, element: roxmltree::Node) {
    for attribute in element.attributes() {
        /* roxmltree guarantees non-empty attribute names, so this can't fail. */
        let _ = out.set_attribute(id, attribute.name(), attribute.value());
    }

    if let Some(text) = element.text() {
        if !text.trim().is_empty() {
            out.set_text(id, text);
        }
    }

    for child in element.children().filter(|child| child.is_element()) {
        if let Ok(child_id) = out.append_child(id, child.tag_name().name(), None) {
            copy_element(out, child_id, child);
        }
    }
}

pub fn serialize_tree(tree: &tree::Tree) -> Result<Vec<u8>, io::Error> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, tree, tree.root())?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, tree: &tree::Tree, id: tree::NodeId) -> Result<(), io::Error> {
    let node = tree.node(id);

    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.text.is_none() && node.children().is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }

    for child in node.children() {
        write_element(writer, tree, *child)?;
    }

    writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;

    Ok(())
}
