//! Response formatters.
//!
//! JSON is the default. XML uses a generic object-to-element convention:
//! the value is wrapped in a single `<response>` root, maps become nested
//! elements in iteration order, arrays become repeated sibling elements with
//! the same tag (`<item>` for a top-level list), scalars become text, null
//! becomes an empty element. No attributes are ever written.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use serde_json::Value;

use crate::errors::GatewayError;

/// Root element name for XML output.
pub const XML_ROOT: &str = "response";

/// Element name for entries of a top-level list.
pub const XML_ITEM: &str = "item";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// JSON document (default)
    #[default]
    Json,
    /// Generic XML encoding
    Xml,
}

impl Format {
    /// Resolve a caller-supplied format name.
    ///
    /// Exactly `xml` in any case selects XML; everything else is JSON.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("xml") {
            Self::Xml
        } else {
            Self::Json
        }
    }

    /// Media type for this format.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

/// Serialized bytes plus their media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Serialize `data` in the requested format.
///
/// # Errors
///
/// Returns [`GatewayError::Encoding`] if the value cannot be serialized.
pub fn format<T: Serialize>(data: &T, format: Format) -> Result<Formatted, GatewayError> {
    let body = match format {
        Format::Json => serde_json::to_vec(data).map_err(|e| GatewayError::Encoding(e.to_string()))?,
        Format::Xml => {
            let value = serde_json::to_value(data).map_err(|e| GatewayError::Encoding(e.to_string()))?;
            to_xml(&value).map_err(|e| GatewayError::Encoding(e.to_string()))?
        }
    };

    Ok(Formatted {
        body,
        content_type: format.content_type(),
    })
}

/// Encode a value as a pretty-printed XML document under `<response>`.
fn to_xml(value: &Value) -> std::io::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    if let Value::Array(_) = value {
        // A bare list still gets exactly one root.
        writer.write_event(Event::Start(BytesStart::new(XML_ROOT)))?;
        write_element(&mut writer, XML_ITEM, value)?;
        writer.write_event(Event::End(BytesEnd::new(XML_ROOT)))?;
    } else {
        write_element(&mut writer, XML_ROOT, value)?;
    }
    Ok(writer.into_inner().into_inner())
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, tag: &str, value: &Value) -> std::io::Result<()> {
    match value {
        // Repeated siblings share the parent's tag.
        Value::Array(items) => {
            for item in items {
                write_element(writer, tag, item)?;
            }
        }
        Value::Object(map) => {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            for (key, child) in map {
                write_element(writer, key, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
        Value::Null => {
            writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        }
        Value::Bool(b) => write_text(writer, tag, if *b { "true" } else { "false" })?,
        Value::Number(n) => write_text(writer, tag, &n.to_string())?,
        Value::String(s) => write_text(writer, tag, s)?,
    }
    Ok(())
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;
    use serde_json::{Map, json};

    /// Generic XML-to-value decoder: repeated tags become arrays, leaf text
    /// stays a string, empty elements become null.
    fn decode(xml: &[u8]) -> Value {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        // Stack of (tag, children, text)
        let mut stack: Vec<(String, Map<String, Value>, Option<String>)> =
            vec![(String::new(), Map::new(), None)];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) => {
                    let tag = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                    stack.push((tag, Map::new(), None));
                }
                Event::Text(t) => {
                    let text = t.unescape().unwrap().into_owned();
                    stack.last_mut().unwrap().2 = Some(text);
                }
                Event::Empty(e) => {
                    let tag = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                    insert(&mut stack.last_mut().unwrap().1, tag, Value::Null);
                }
                Event::End(_) => {
                    let (tag, children, text) = stack.pop().unwrap();
                    let value = if !children.is_empty() {
                        Value::Object(children)
                    } else {
                        text.map_or(Value::Null, Value::String)
                    };
                    insert(&mut stack.last_mut().unwrap().1, tag, value);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Value::Object(stack.pop().unwrap().1)
    }

    fn insert(map: &mut Map<String, Value>, tag: String, value: Value) {
        match map.get_mut(&tag) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(tag, value);
            }
        }
    }

    #[test]
    fn test_format_name_resolution() {
        assert_eq!(Format::from_name("xml"), Format::Xml);
        assert_eq!(Format::from_name("XML"), Format::Xml);
        assert_eq!(Format::from_name("json"), Format::Json);
        assert_eq!(Format::from_name("csv"), Format::Json);
        assert_eq!(Format::from_name(""), Format::Json);
        assert_eq!("Xml".parse::<Format>().unwrap(), Format::Xml);
    }

    #[test]
    fn test_json_output() {
        let out = format(&json!({"a": 1, "b": [1, 2, 3]}), Format::Json).unwrap();
        assert_eq!(out.content_type, "application/json");
        let back: Value = serde_json::from_slice(&out.body).unwrap();
        assert_eq!(back, json!({"a": 1, "b": [1, 2, 3]}));
    }

    #[test]
    fn test_xml_round_trip_is_structural() {
        let out = format(&json!({"a": 1, "b": [1, 2, 3]}), Format::Xml).unwrap();
        assert_eq!(out.content_type, "application/xml");

        let decoded = decode(&out.body);
        let root = &decoded[XML_ROOT];
        assert_eq!(root["a"], "1");
        assert_eq!(root["b"], json!(["1", "2", "3"]));
    }

    #[test]
    fn test_xml_nested_maps_keep_order() {
        let data = json!({"z": {"inner": true}, "m": null, "a": "text & <more>"});
        let out = format(&data, Format::Xml).unwrap();
        let text = String::from_utf8(out.body.clone()).unwrap();

        assert!(text.starts_with("<?xml"));
        let body_start = text.find("?>").unwrap();
        assert!(!text[body_start..].contains('='), "no attributes expected");
        let z = text.find("<z>").unwrap();
        let m = text.find("<m/>").unwrap();
        let a = text.find("<a>").unwrap();
        assert!(z < m && m < a);

        let decoded = decode(&out.body);
        assert_eq!(decoded[XML_ROOT]["z"]["inner"], "true");
        assert_eq!(decoded[XML_ROOT]["m"], Value::Null);
        assert_eq!(decoded[XML_ROOT]["a"], "text & <more>");
    }

    #[test]
    fn test_xml_feature_collection_shape() {
        let data = json!({
            "type": "FeatureCollection",
            "features": [
                {"properties": {"mag": 2.5}, "id": "x"},
                {"properties": {"mag": 3.5}, "id": "y"}
            ]
        });
        let decoded = decode(&format(&data, Format::Xml).unwrap().body);
        let features = decoded[XML_ROOT]["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1]["properties"]["mag"], "3.5");
    }

    #[test]
    fn test_xml_top_level_list_has_single_root() {
        let out = format(&json!([1, 2]), Format::Xml).unwrap();
        let text = String::from_utf8(out.body.clone()).unwrap();
        assert_eq!(text.matches("<response>").count(), 1);

        let decoded = decode(&out.body);
        assert_eq!(decoded.as_object().unwrap().len(), 1);
        assert_eq!(decoded[XML_ROOT][XML_ITEM], json!(["1", "2"]));
    }
}
