//! Generic XML tree used to rebuild documents the strict decoder rejects.
//!
//! BGG is not consistent about how it encodes the same data across endpoints
//! and items: repeated elements are sometimes interleaved with other fields,
//! optional values show up as empty self-closing tags, end tags are
//! occasionally mismatched. Parsing into a tree and writing it back out
//! smooths most of this over. The round trip is lossy (comments, processing
//! instructions, the original element order between different names and
//! surrounding whitespace are not kept), which is fine because only data
//! values are consumed downstream.

use crate::error::{BggError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// One element of a parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Element name, including any namespace prefix
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
    /// Unescaped text and CDATA content
    pub text: String,
}

impl XmlNode {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();

        for attribute in start.attributes().with_checks(false) {
            let attribute = attribute.map_err(|e| BggError::xml_parse(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| BggError::xml_parse(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    /// Look up an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn is_empty_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty() && self.text.is_empty()
    }

    /// Reshape the tree into something the serde decoder accepts.
    ///
    /// Repeated siblings are made contiguous at the position of their first
    /// occurrence and empty attribute-less elements below the root are removed,
    /// so optional fields decode as `None` and required fields need a serde
    /// default.
    pub fn normalize(&mut self) {
        for child in &mut self.children {
            child.normalize();
        }
        self.children.retain(|child| !child.is_empty_leaf());

        let mut grouped: Vec<(String, Vec<XmlNode>)> = Vec::new();
        for child in self.children.drain(..) {
            match grouped.iter_mut().find(|(name, _)| *name == child.name) {
                Some((_, group)) => group.push(child),
                None => grouped.push((child.name.clone(), vec![child])),
            }
        }
        self.children = grouped.into_iter().flat_map(|(_, group)| group).collect();
    }

    /// Serialize this element and its descendants
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| BggError::regenerate(e.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        if !self.text.is_empty() {
            write_event(writer, Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| BggError::regenerate(e.to_string()))
}

/// Parse a document into a tree, tolerating mismatched or missing end tags.
///
/// Comments, processing instructions, the declaration and the doctype are
/// skipped. Text outside the root element is ignored; a document without any
/// element is an [`BggError::XmlParse`].
pub fn parse_lenient(body: &[u8]) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(body);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => stack.push(XmlNode::from_start(&start)?),
            Ok(Event::Empty(start)) => {
                let node = XmlNode::from_start(&start)?;
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::End(_)) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| BggError::xml_parse(e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(BggError::xml_parse(format!(
                    "error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    while let Some(node) = stack.pop() {
        attach(&mut stack, &mut root, node);
    }

    root.ok_or_else(|| BggError::xml_parse("document has no root element"))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Parse, normalize and re-serialize a document
pub fn regenerate(body: &[u8]) -> Result<String> {
    let mut tree = parse_lenient(body)?;
    tree.normalize();
    tree.to_xml()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let xml = br#"<?xml version="1.0"?>
            <!-- generated -->
            <items total="2">
                <item id="1"><name>Catan</name></item>
                <item id="2"><name><![CDATA[Tigris & Euphrates]]></name></item>
            </items>"#;

        let tree = parse_lenient(xml).unwrap();
        assert_eq!(tree.name, "items");
        assert_eq!(tree.attribute("total"), Some("2"));
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[1].attribute("id"), Some("2"));
        assert_eq!(tree.children[1].children[0].text, "Tigris & Euphrates");
    }

    #[test]
    fn test_not_xml_is_parse_error() {
        let err = parse_lenient(b"This is not valid XML").unwrap_err();
        assert!(matches!(err, BggError::XmlParse { .. }));

        let err = parse_lenient(b"").unwrap_err();
        assert!(matches!(err, BggError::XmlParse { .. }));
    }

    #[test]
    fn test_mismatched_and_missing_end_tags() {
        let tree = parse_lenient(b"<a><b>one</c><d>two").unwrap();
        assert_eq!(tree.name, "a");
        assert_eq!(tree.children[0].name, "b");
        assert_eq!(tree.children[0].text, "one");
        assert_eq!(tree.children[1].name, "d");
        assert_eq!(tree.children[1].text, "two");
    }

    #[test]
    fn test_normalize_groups_repeated_siblings() {
        let mut tree =
            parse_lenient(b"<r><link v=\"1\"/><name>x</name><link v=\"2\"/><rank/></r>").unwrap();
        tree.normalize();

        let names: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["link", "link", "name"]);
        assert_eq!(tree.children[1].attribute("v"), Some("2"));
    }

    #[test]
    fn test_regenerate_escapes_content() {
        let xml = regenerate(b"<a title=\"&quot;Q&quot;\"><b>t &amp; u</b><!-- c --><b/></a>").unwrap();
        assert_eq!(xml, "<a title=\"&quot;Q&quot;\"><b>t &amp; u</b></a>");
    }

    #[test]
    fn test_empty_root_is_kept() {
        assert_eq!(regenerate(b"<items total=\"0\"/>").unwrap(), "<items total=\"0\"/>");
        assert_eq!(regenerate(b"<items></items>").unwrap(), "<items/>");
    }
}
