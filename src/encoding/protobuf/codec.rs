// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Protobuf message conversion using prost-reflect for dynamic message handling.
//!
//! Shared by the topic-mapped and registry-framed protobuf codecs. Messages
//! are handled without code generation: a [`MessageDescriptor`] taken from a
//! runtime [`DescriptorPool`] drives both directions.

use std::collections::HashMap;

use prost::Message;
use prost_reflect::{
    DescriptorPool, DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor,
    ReflectMessage,
};
use prost_types::FileDescriptorSet;

use crate::core::{CodecError, CodecValue, Result, ValueMap};

/// Build a descriptor pool from serialized `FileDescriptorSet` bytes.
pub fn pool_from_file_descriptor_set(fds_bytes: &[u8]) -> Result<DescriptorPool> {
    let fds = FileDescriptorSet::decode(fds_bytes).map_err(|e| {
        CodecError::parse(
            "protobuf",
            format!("Failed to decode FileDescriptorSet: {e}"),
        )
    })?;

    DescriptorPool::from_file_descriptor_set(fds)
        .map_err(|e| CodecError::parse("protobuf", format!("Failed to build descriptor pool: {e}")))
}

/// Decode a binary message into a value tree.
pub fn decode_message(descriptor: &MessageDescriptor, data: &[u8]) -> Result<CodecValue> {
    let message = DynamicMessage::decode(descriptor.clone(), data)
        .map_err(|e| CodecError::parse("protobuf", format!("Failed to decode message: {e}")))?;
    Ok(message_to_value(&message))
}

/// Encode a value tree as a binary message.
pub fn encode_message(descriptor: &MessageDescriptor, value: &CodecValue) -> Result<Vec<u8>> {
    let message = value_to_message(value, descriptor)?;
    Ok(message.encode_to_vec())
}

// =============================================================================
// Message -> CodecValue
// =============================================================================

/// Convert a dynamic message into a map keyed by proto field names.
///
/// Unset fields are rendered with their default value, except for members
/// of a oneof (including proto3 `optional`) which only appear when set.
pub fn message_to_value(message: &DynamicMessage) -> CodecValue {
    let descriptor = message.descriptor();
    let mut fields = ValueMap::new();

    for field in descriptor.fields() {
        if field.containing_oneof().is_some() && !message.has_field(&field) {
            continue;
        }
        let value = message.get_field(&field);
        fields.insert(field.name().to_string(), reflect_to_value(&value, &field.kind()));
    }

    CodecValue::Map(fields)
}

fn reflect_to_value(value: &prost_reflect::Value, kind: &Kind) -> CodecValue {
    match value {
        prost_reflect::Value::Bool(v) => CodecValue::Bool(*v),
        prost_reflect::Value::I32(v) => CodecValue::Int64(i64::from(*v)),
        prost_reflect::Value::I64(v) => CodecValue::Int64(*v),
        prost_reflect::Value::U32(v) => CodecValue::Int64(i64::from(*v)),
        prost_reflect::Value::U64(v) => CodecValue::from(*v),
        prost_reflect::Value::F32(v) => CodecValue::Float64(f64::from(*v)),
        prost_reflect::Value::F64(v) => CodecValue::Float64(*v),
        prost_reflect::Value::Bytes(v) => CodecValue::Bytes(v.to_vec()),
        prost_reflect::Value::String(v) => CodecValue::String(v.clone()),
        prost_reflect::Value::EnumNumber(n) => match kind {
            Kind::Enum(enum_desc) => enum_desc
                .get_value(*n)
                .map(|v| CodecValue::String(v.name().to_string()))
                .unwrap_or(CodecValue::Int64(i64::from(*n))),
            _ => CodecValue::Int64(i64::from(*n)),
        },
        prost_reflect::Value::Message(v) => message_to_value(v),
        prost_reflect::Value::List(items) => {
            CodecValue::Array(items.iter().map(|v| reflect_to_value(v, kind)).collect())
        }
        prost_reflect::Value::Map(entries) => {
            let value_kind = match kind {
                Kind::Message(entry) => entry.map_entry_value_field().kind(),
                other => other.clone(),
            };
            CodecValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (map_key_to_string(k), reflect_to_value(v, &value_kind)))
                    .collect(),
            )
        }
    }
}

fn map_key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}

// =============================================================================
// CodecValue -> Message
// =============================================================================

/// Build a dynamic message from a map keyed by proto or JSON field names.
pub fn value_to_message(value: &CodecValue, descriptor: &MessageDescriptor) -> Result<DynamicMessage> {
    let fields = value.as_map().ok_or_else(|| {
        CodecError::encode(
            "protobuf",
            format!(
                "expected an object for message {}, got {}",
                descriptor.full_name(),
                value.type_name()
            ),
        )
    })?;

    let mut message = DynamicMessage::new(descriptor.clone());
    for (name, field_value) in fields {
        let field = descriptor
            .get_field_by_name(name)
            .or_else(|| descriptor.get_field_by_json_name(name))
            .ok_or_else(|| {
                CodecError::encode(
                    "protobuf",
                    format!("unknown field '{name}' in message {}", descriptor.full_name()),
                )
            })?;
        if field_value.is_null() {
            continue;
        }
        let reflect = field_to_reflect(field_value, &field)?;
        message.try_set_field(&field, reflect).map_err(|e| {
            CodecError::encode("protobuf", format!("field '{}': {e}", field.name()))
        })?;
    }

    Ok(message)
}

fn field_to_reflect(value: &CodecValue, field: &FieldDescriptor) -> Result<prost_reflect::Value> {
    let kind = field.kind();

    if field.is_map() {
        let Kind::Message(entry) = &kind else {
            return Err(CodecError::invalid_schema(field.full_name(), "map field without entry type"));
        };
        let entries = value.as_map().ok_or_else(|| {
            CodecError::encode("protobuf", format!("field '{}' expects an object", field.name()))
        })?;
        let key_kind = entry.map_entry_key_field().kind();
        let value_kind = entry.map_entry_value_field().kind();
        let mut map = HashMap::with_capacity(entries.len());
        for (k, v) in entries {
            map.insert(string_to_map_key(k, &key_kind)?, scalar_to_reflect(v, &value_kind)?);
        }
        return Ok(prost_reflect::Value::Map(map));
    }

    if field.is_list() {
        let items = value.as_array().ok_or_else(|| {
            CodecError::encode("protobuf", format!("field '{}' expects an array", field.name()))
        })?;
        let list = items
            .iter()
            .map(|item| scalar_to_reflect(item, &kind))
            .collect::<Result<Vec<_>>>()?;
        return Ok(prost_reflect::Value::List(list));
    }

    scalar_to_reflect(value, &kind)
}

fn scalar_to_reflect(value: &CodecValue, kind: &Kind) -> Result<prost_reflect::Value> {
    let mismatch = || {
        CodecError::encode(
            "protobuf",
            format!("cannot convert {} to {kind:?}", value.type_name()),
        )
    };

    let converted = match kind {
        Kind::Double => prost_reflect::Value::F64(value.as_f64().ok_or_else(mismatch)?),
        Kind::Float => prost_reflect::Value::F32(value.as_f64().ok_or_else(mismatch)? as f32),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            prost_reflect::Value::I32(i32::try_from(v).map_err(|_| mismatch())?)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            prost_reflect::Value::I64(value.as_i64().ok_or_else(mismatch)?)
        }
        Kind::Uint32 | Kind::Fixed32 => {
            let v = value.as_u64().ok_or_else(mismatch)?;
            prost_reflect::Value::U32(u32::try_from(v).map_err(|_| mismatch())?)
        }
        Kind::Uint64 | Kind::Fixed64 => prost_reflect::Value::U64(value.as_u64().ok_or_else(mismatch)?),
        Kind::Bool => match value {
            CodecValue::Bool(b) => prost_reflect::Value::Bool(*b),
            _ => return Err(mismatch()),
        },
        Kind::String => prost_reflect::Value::String(value.as_str().ok_or_else(mismatch)?.to_string()),
        Kind::Bytes => match value {
            CodecValue::Bytes(b) => prost_reflect::Value::Bytes(b.clone().into()),
            CodecValue::String(s) => prost_reflect::Value::Bytes(s.clone().into_bytes().into()),
            _ => return Err(mismatch()),
        },
        Kind::Enum(enum_desc) => match value {
            CodecValue::String(name) => {
                let number = enum_desc
                    .get_value_by_name(name)
                    .map(|v| v.number())
                    .ok_or_else(|| {
                        CodecError::encode(
                            "protobuf",
                            format!("unknown value '{name}' for enum {}", enum_desc.full_name()),
                        )
                    })?;
                prost_reflect::Value::EnumNumber(number)
            }
            _ => {
                let v = value.as_i64().ok_or_else(mismatch)?;
                prost_reflect::Value::EnumNumber(i32::try_from(v).map_err(|_| mismatch())?)
            }
        },
        Kind::Message(msg_desc) => prost_reflect::Value::Message(value_to_message(value, msg_desc)?),
    };

    Ok(converted)
}

fn string_to_map_key(key: &str, kind: &Kind) -> Result<MapKey> {
    let invalid = || CodecError::encode("protobuf", format!("invalid map key '{key}' for {kind:?}"));
    let parsed = match kind {
        Kind::String => MapKey::String(key.to_string()),
        Kind::Bool => MapKey::Bool(key.parse().map_err(|_| invalid())?),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => MapKey::I32(key.parse().map_err(|_| invalid())?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => MapKey::I64(key.parse().map_err(|_| invalid())?),
        Kind::Uint32 | Kind::Fixed32 => MapKey::U32(key.parse().map_err(|_| invalid())?),
        Kind::Uint64 | Kind::Fixed64 => MapKey::U64(key.parse().map_err(|_| invalid())?),
        _ => return Err(invalid()),
    };
    Ok(parsed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::{Label, Type as ProtoType};
    use prost_types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto, MessageOptions,
    };
    use serde_json::json;

    // =========================================================================
    // Test Fixtures
    // =========================================================================

    fn field(name: &str, number: i32, ty: ProtoType) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            json_name: None,
            ..Default::default()
        }
    }

    /// `test.Order` with scalars, an enum, a repeated string, a nested message
    /// and a `map<string, int64>`.
    pub(crate) fn order_fds() -> Vec<u8> {
        let fds = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("order.proto".to_string()),
                package: Some("test".to_string()),
                syntax: Some("proto3".to_string()),
                enum_type: vec![EnumDescriptorProto {
                    name: Some("Status".to_string()),
                    value: vec![
                        EnumValueDescriptorProto {
                            name: Some("UNKNOWN".to_string()),
                            number: Some(0),
                            ..Default::default()
                        },
                        EnumValueDescriptorProto {
                            name: Some("SHIPPED".to_string()),
                            number: Some(1),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                message_type: vec![
                    DescriptorProto {
                        name: Some("Order".to_string()),
                        field: vec![
                            field("id", 1, ProtoType::Int64),
                            field("customer", 2, ProtoType::String),
                            FieldDescriptorProto {
                                type_name: Some(".test.Status".to_string()),
                                ..field("status", 3, ProtoType::Enum)
                            },
                            FieldDescriptorProto {
                                label: Some(Label::Repeated as i32),
                                ..field("tags", 4, ProtoType::String)
                            },
                            FieldDescriptorProto {
                                type_name: Some(".test.Address".to_string()),
                                ..field("address", 5, ProtoType::Message)
                            },
                            FieldDescriptorProto {
                                label: Some(Label::Repeated as i32),
                                type_name: Some(".test.Order.CountsEntry".to_string()),
                                ..field("counts", 6, ProtoType::Message)
                            },
                        ],
                        nested_type: vec![DescriptorProto {
                            name: Some("CountsEntry".to_string()),
                            field: vec![
                                field("key", 1, ProtoType::String),
                                field("value", 2, ProtoType::Int64),
                            ],
                            options: Some(MessageOptions {
                                map_entry: Some(true),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                    DescriptorProto {
                        name: Some("Address".to_string()),
                        field: vec![field("city", 1, ProtoType::String)],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
        };
        fds.encode_to_vec()
    }

    fn order_descriptor() -> MessageDescriptor {
        pool_from_file_descriptor_set(&order_fds())
            .unwrap()
            .get_message_by_name("test.Order")
            .unwrap()
    }

    #[test]
    fn test_round_trip_order() {
        let descriptor = order_descriptor();
        let value = CodecValue::from(json!({
            "id": 42,
            "customer": "ada",
            "status": "SHIPPED",
            "tags": ["a", "b"],
            "address": {"city": "Berlin"},
            "counts": {"x": 1}
        }));

        let bytes = encode_message(&descriptor, &value).unwrap();
        let decoded = decode_message(&descriptor, &bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_defaults_are_rendered() {
        let descriptor = order_descriptor();
        let decoded = decode_message(&descriptor, &[]).unwrap();
        assert_eq!(decoded.get("id"), Some(&CodecValue::Int64(0)));
        assert_eq!(decoded.get("status"), Some(&CodecValue::from("UNKNOWN")));
        assert_eq!(decoded.get("tags"), Some(&CodecValue::Array(vec![])));
    }

    #[test]
    fn test_enum_by_number() {
        let descriptor = order_descriptor();
        let value = CodecValue::from(json!({"status": 1}));
        let bytes = encode_message(&descriptor, &value).unwrap();
        let decoded = decode_message(&descriptor, &bytes).unwrap();
        assert_eq!(decoded.get("status"), Some(&CodecValue::from("SHIPPED")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let descriptor = order_descriptor();
        let err = encode_message(&descriptor, &CodecValue::from(json!({"nope": 1}))).unwrap_err();
        assert!(err.to_string().contains("unknown field 'nope'"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let descriptor = order_descriptor();
        let err = encode_message(&descriptor, &CodecValue::from(json!({"id": "x"}))).unwrap_err();
        assert!(matches!(err, CodecError::EncodeError { .. }));
    }

    #[test]
    fn test_garbage_does_not_decode() {
        let descriptor = order_descriptor();
        assert!(decode_message(&descriptor, &[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_invalid_descriptor_set() {
        assert!(pool_from_file_descriptor_set(&[0xff, 0x01]).is_err());
    }
}
