// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! XML payloads.
//!
//! The document is parsed under a synthetic root so that payloads with several
//! top-level elements are accepted. Elements become maps: leaf text becomes a
//! string, repeated names become arrays, attributes are stored under `-name`
//! and text mixed with child elements under `#content`.

use async_trait::async_trait;
use roxmltree::{Document, Node};

use crate::core::{
    CodecError, CodecValue, PayloadEncoding, PayloadType, Record, RecordPayload, Result, ValueMap,
};
use crate::encoding::codec::{payload_from_record, structured_input, Serde, SerializeOption};

const ROOT_TAG: &str = "topiccodec-root";
const ATTRIBUTE_PREFIX: char = '-';
const CONTENT_KEY: &str = "#content";
/// Maximum element nesting below the synthetic root.
const MAX_DEPTH: usize = 128;

/// XML codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlSerde;

#[async_trait]
impl Serde for XmlSerde {
    fn name(&self) -> PayloadEncoding {
        PayloadEncoding::Xml
    }

    async fn deserialize_payload(
        &self,
        record: &Record,
        payload_type: PayloadType,
    ) -> Result<RecordPayload> {
        let payload = payload_from_record(record, payload_type);
        let value = decode_xml(payload)?;
        Ok(RecordPayload::structured(value, PayloadEncoding::Xml))
    }

    async fn serialize_object(
        &self,
        value: &CodecValue,
        _payload_type: PayloadType,
        _options: &[SerializeOption],
    ) -> Result<Vec<u8>> {
        match value {
            CodecValue::String(text) if text.trim_start().starts_with('<') => {
                decode_xml(text.as_bytes()).map_err(|e| CodecError::encode("xml", e.to_string()))?;
                Ok(text.trim().as_bytes().to_vec())
            }
            CodecValue::Bytes(bytes) => {
                decode_xml(bytes).map_err(|e| CodecError::encode("xml", e.to_string()))?;
                Ok(bytes.clone())
            }
            other => match structured_input(other).as_ref() {
                CodecValue::Map(entries) => {
                    let mut out = String::new();
                    for (name, child) in entries {
                        write_element(name, child, &mut out)?;
                    }
                    Ok(out.into_bytes())
                }
                v => Err(CodecError::encode(
                    "xml",
                    format!("expected an object or XML text, got {}", v.type_name()),
                )),
            },
        }
    }
}

/// Parse an XML payload into a value tree.
pub fn decode_xml(payload: &[u8]) -> Result<CodecValue> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| CodecError::parse("xml", format!("payload is not valid UTF-8: {e}")))?;
    let trimmed = text.trim();
    if !trimmed.starts_with('<') {
        return Err(CodecError::parse(
            "xml",
            "first byte indicates this is not valid XML, expected '<'",
        ));
    }

    let body = strip_declaration(trimmed);
    let wrapped = format!("<{ROOT_TAG}>{body}</{ROOT_TAG}>");
    let doc = Document::parse(&wrapped)
        .map_err(|e| CodecError::parse("xml", format!("failed to parse XML payload: {e}")))?;

    let root = doc.root_element();
    if !root.children().any(|n| n.is_element()) {
        return Err(CodecError::parse("xml", "no XML elements found"));
    }
    element_to_value(root, 0)
}

fn strip_declaration(text: &str) -> &str {
    if text.starts_with("<?xml") {
        if let Some(end) = text.find("?>") {
            return text[end + 2..].trim_start();
        }
    }
    text
}

fn element_to_value(node: Node<'_, '_>, depth: usize) -> Result<CodecValue> {
    if depth > MAX_DEPTH {
        return Err(CodecError::parse("xml", "element nesting too deep"));
    }
    let mut map = ValueMap::new();
    for attr in node.attributes() {
        map.insert(
            format!("{ATTRIBUTE_PREFIX}{}", attr.name()),
            CodecValue::String(attr.value().to_string()),
        );
    }

    let mut text = String::new();
    let mut has_children = false;
    for child in node.children() {
        if child.is_element() {
            has_children = true;
            let name = child.tag_name().name().to_string();
            let value = element_to_value(child, depth + 1)?;
            match map.remove(&name) {
                None => {
                    map.insert(name, value);
                }
                Some(CodecValue::Array(mut items)) => {
                    items.push(value);
                    map.insert(name, CodecValue::Array(items));
                }
                Some(existing) => {
                    map.insert(name, CodecValue::Array(vec![existing, value]));
                }
            }
        } else if let Some(t) = child.text() {
            text.push_str(t);
        }
    }

    let text = text.trim();
    if !has_children && map.is_empty() {
        return Ok(CodecValue::String(text.to_string()));
    }
    if !text.is_empty() {
        map.insert(CONTENT_KEY.to_string(), CodecValue::String(text.to_string()));
    }
    Ok(CodecValue::Map(map))
}

// =============================================================================
// Rendering
// =============================================================================

fn write_element(name: &str, value: &CodecValue, out: &mut String) -> Result<()> {
    if name.is_empty() || name.starts_with(ATTRIBUTE_PREFIX) || name == CONTENT_KEY {
        return Err(CodecError::encode(
            "xml",
            format!("'{name}' is not a valid element name"),
        ));
    }

    match value {
        CodecValue::Array(items) => {
            for item in items {
                write_element(name, item, out)?;
            }
        }
        CodecValue::Null => {
            out.push('<');
            out.push_str(name);
            out.push_str("/>");
        }
        CodecValue::Map(entries) => {
            out.push('<');
            out.push_str(name);
            for (key, attr) in entries {
                if let Some(attr_name) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    out.push(' ');
                    out.push_str(attr_name);
                    out.push_str("=\"");
                    escape_into(&scalar_text(attr), out);
                    out.push('"');
                }
            }
            out.push('>');
            if let Some(content) = entries.get(CONTENT_KEY) {
                escape_into(&scalar_text(content), out);
            }
            for (key, child) in entries {
                if key.starts_with(ATTRIBUTE_PREFIX) || key == CONTENT_KEY {
                    continue;
                }
                write_element(key, child, out)?;
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        scalar => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            escape_into(&scalar_text(scalar), out);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
    Ok(())
}

fn scalar_text(value: &CodecValue) -> String {
    match value {
        CodecValue::String(s) => s.clone(),
        CodecValue::Bytes(b) => hex::encode(b),
        other => other.to_json().to_string(),
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PERSON: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?><name>John</name><age>30</age>"#;

    #[tokio::test]
    async fn test_decode_value() {
        let record = Record::new("t").with_value(PERSON.to_vec());
        let payload = XmlSerde
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .unwrap();
        assert_eq!(payload.encoding, Some(PayloadEncoding::Xml));
        assert!(payload.troubleshooting.is_none());
        assert!(payload.schema_id.is_none());
        let parsed = payload.parsed_payload.unwrap();
        assert_eq!(parsed.get("name"), Some(&CodecValue::from("John")));
        assert_eq!(parsed.get("age"), Some(&CodecValue::from("30")));
    }

    #[tokio::test]
    async fn test_decode_key() {
        let record = Record::new("t").with_key(PERSON.to_vec());
        let payload = XmlSerde
            .deserialize_payload(&record, PayloadType::Key)
            .await
            .unwrap();
        assert_eq!(payload.encoding, Some(PayloadEncoding::Xml));
    }

    #[tokio::test]
    async fn test_invalid_xml() {
        let record = Record::new("t").with_value(b"this is no valid XML".to_vec());
        assert!(XmlSerde
            .deserialize_payload(&record, PayloadType::Value)
            .await
            .is_err());
    }

    #[test]
    fn test_attributes_and_repeated_elements() {
        let value = decode_xml(br#"<order id="7"><item>a</item><item>b</item>note</order>"#).unwrap();
        assert_eq!(
            value,
            CodecValue::from(json!({
                "order": {"-id": "7", "item": ["a", "b"], "#content": "note"}
            }))
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep = format!("{}{}", "<a>".repeat(3000), "</a>".repeat(3000));
        let err = decode_xml(deep.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::ParseError { .. }));

        let ok = format!("{}x{}", "<a>".repeat(MAX_DEPTH), "</a>".repeat(MAX_DEPTH));
        assert!(decode_xml(ok.as_bytes()).is_ok());
    }

    #[test]
    fn test_unclosed_tag() {
        assert!(decode_xml(b"<a><b></a>").is_err());
    }

    #[tokio::test]
    async fn test_serialize_map() {
        let value = CodecValue::from(json!({"order": {"-id": "7", "item": ["a", "b<"]}}));
        let bytes = XmlSerde
            .serialize_object(&value, PayloadType::Value, &[])
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"<order id="7"><item>a</item><item>b&lt;</item></order>"#
        );
        assert_eq!(decode_xml(&bytes).unwrap(), CodecValue::from(json!({"order": {"-id": "7", "item": ["a", "b<"]}})));
    }

    #[tokio::test]
    async fn test_serialize_text_is_validated() {
        let ok = XmlSerde
            .serialize_object(&CodecValue::from(" <a>1</a> "), PayloadType::Value, &[])
            .await
            .unwrap();
        assert_eq!(ok, b"<a>1</a>");

        assert!(XmlSerde
            .serialize_object(&CodecValue::from("<a>"), PayloadType::Value, &[])
            .await
            .is_err());
    }
}
