// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// XML payload values.
//
// Contract bodies are JSON or XML; both feed the same pattern machinery, so
// an XML document is just another `Value` shape. Only the structural subset
// needed for payload comparison is kept: elements, attributes, text and
// CDATA children. Processing instructions and comments are skipped on read.

use std::sync::Arc;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: Arc<str>,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Value>,
}

impl XmlNode {
    pub fn new(name: &str) -> Self {
        XmlNode {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Concatenated text content of all text/CDATA children.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Value::String(s) | Value::Cdata(s) => out.push_str(s),
                _ => {}
            }
        }
        out
    }

    pub fn parse(text: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let node = read_element(&mut reader, &start, false)?;
                    return Ok(node);
                }
                Event::Empty(start) => {
                    let node = read_element(&mut reader, &start, true)?;
                    return Ok(node);
                }
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => bail!("no XML element found in `{text}`"),
                event => bail!("unexpected XML content before root element: {event:?}"),
            }
        }
    }

    pub fn render(&self) -> String {
        let mut writer = Writer::new(Vec::new());
        // Writing into a Vec cannot fail.
        let _ = self.write_into(&mut writer);
        String::from_utf8(writer.into_inner()).unwrap_or_default()
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> quick_xml::Result<()> {
        let mut start = BytesStart::new(self.name.as_ref());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Value::Xml(node) => node.write_into(writer)?,
                Value::Cdata(text) => {
                    writer.write_event(Event::CData(BytesCData::new(text.as_ref())))?
                }
                other => writer
                    .write_event(Event::Text(BytesText::new(&other.to_string_literal())))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_ref())))?;
        Ok(())
    }
}

fn read_element(reader: &mut Reader<&[u8]>, start: &BytesStart, empty: bool) -> Result<XmlNode> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = XmlNode::new(&name);

    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        node.attributes.insert(key, value);
    }

    if empty {
        return Ok(node);
    }

    loop {
        match reader.read_event()? {
            Event::Start(child) => {
                let child = child.into_owned();
                node.children
                    .push(Value::Xml(Arc::new(read_element(reader, &child, false)?)));
            }
            Event::Empty(child) => {
                let child = child.into_owned();
                node.children
                    .push(Value::Xml(Arc::new(read_element(reader, &child, true)?)));
            }
            Event::Text(text) => {
                let text = text.unescape()?.into_owned();
                if !text.is_empty() {
                    node.children.push(Value::from(text));
                }
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                node.children.push(Value::Cdata(text.into()));
            }
            Event::End(end) => {
                let end_name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if end_name != name {
                    bail!("mismatched XML closing tag: expected </{name}>, got </{end_name}>");
                }
                return Ok(node);
            }
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) | Event::Decl(_) => {}
            Event::Eof => bail!("unexpected end of XML inside <{name}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let node = XmlNode::parse(r#"<person id="10"><name>Jill</name><city/></person>"#).unwrap();
        assert_eq!(node.name.as_ref(), "person");
        assert_eq!(node.attributes.get("id").map(String::as_str), Some("10"));
        assert_eq!(node.children.len(), 2);
        match &node.children[0] {
            Value::Xml(name) => assert_eq!(name.text_content(), "Jill"),
            other => panic!("Expected element child, got {other:?}"),
        }
    }

    #[test]
    fn render_round_trips() {
        let text = r#"<order id="7"><item>pen</item></order>"#;
        let node = XmlNode::parse(text).unwrap();
        assert_eq!(XmlNode::parse(&node.render()).unwrap(), node);
    }

    #[test]
    fn cdata_compares_equal_to_text() {
        let plain = XmlNode::parse("<note>call me</note>").unwrap();
        let cdata = XmlNode::parse("<note><![CDATA[call me]]></note>").unwrap();
        assert_eq!(plain, cdata);
    }

    #[test]
    fn reports_mismatched_close_tag() {
        let err = XmlNode::parse("<a><b></a></b>").unwrap_err();
        assert!(err.to_string().contains("</b>"), "{err}");
    }
}
