// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! End-to-end tests of the codec chain without a schema registry.

mod common;

use std::sync::Arc;

use common::*;
use regex::Regex;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use topiccodec::encoding::{MsgPackSerde, ProtobufSerde, SerializeOption, UintSize};
use topiccodec::{
    CodecValue, Config, DeserializationOptions, PayloadEncoding, ProgressEvent, Record,
    SerdeService, SerializeInput, SerializePayloadInput, StreamProgressReporter,
};

fn msgpack_service(pattern: &str) -> SerdeService {
    let msgpack = MsgPackSerde::new(vec![Regex::new(pattern).unwrap()]);
    SerdeService::new(None, ProtobufSerde::disabled(), msgpack)
}

async fn encode_value(
    service: &SerdeService,
    topic: &str,
    value: SerializePayloadInput,
) -> Vec<u8> {
    let input = SerializeInput {
        topic: topic.to_string(),
        key: SerializePayloadInput::new(PayloadEncoding::None, ""),
        value,
    };
    let output = service.serialize_record(&input).await.unwrap();
    assert!(output.key.payload.is_empty());
    output.value.payload
}

// ============================================================================
// Detection
// ============================================================================

#[tokio::test]
async fn test_json_round_trip() {
    let service = SerdeService::default();
    let bytes = encode_value(
        &service,
        "orders",
        SerializePayloadInput::new(PayloadEncoding::Json, json!({"id": 1, "tags": ["a", "b"]})),
    )
    .await;

    let payload = decode_value(&service, "orders", bytes).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Json));
    assert_eq!(
        payload.parsed_payload.unwrap().to_json(),
        json!({"id": 1, "tags": ["a", "b"]})
    );
    assert!(payload.schema_id.is_none());
}

#[tokio::test]
async fn test_xml_round_trip() {
    let service = SerdeService::default();
    let bytes = encode_value(
        &service,
        "feeds",
        SerializePayloadInput::new(PayloadEncoding::Xml, "<item id=\"3\"><title>News</title></item>"),
    )
    .await;

    let payload = decode_value(&service, "feeds", bytes).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Xml));
    let parsed = payload.parsed_payload.unwrap();
    let item = parsed.get("item").expect("root element");
    assert_eq!(item.get("-id"), Some(&CodecValue::from("3")));
    assert_eq!(item.get("title"), Some(&CodecValue::from("News")));
}

#[tokio::test]
async fn test_msgpack_depends_on_topic() {
    let service = msgpack_service("^metrics");
    let bytes = encode_value(
        &service,
        "metrics",
        SerializePayloadInput::new(PayloadEncoding::MsgPack, json!({"a": 1})),
    )
    .await;
    assert_eq!(bytes, vec![0x81, 0xA1, b'a', 0x01]);

    let payload = decode_value(&service, "metrics", bytes.clone()).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::MsgPack));
    assert_eq!(payload.parsed_payload.unwrap().to_json(), json!({"a": 1}));

    // Not valid UTF-8, and four bytes long.
    let payload = decode_value(&service, "orders", bytes).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Uint));
    assert_eq!(payload.parsed_payload, Some(CodecValue::Int64(0x81A1_6101)));
}

#[tokio::test]
async fn test_msgpack_disabled_by_default_config() {
    let service = SerdeService::from_config(&Config::default()).unwrap();
    let payload = decode_value(&service, "metrics", vec![0x92, 0x01, 0x02]).await;
    assert_ne!(payload.encoding, Some(PayloadEncoding::MsgPack));
}

#[tokio::test]
async fn test_smile_value() {
    let mut bytes = vec![b':', b')', b'\n', 0x00];
    bytes.extend_from_slice(&[0xFA, 0x80, b'a', 0xC2, 0xFB]);

    let payload = decode_value(&SerdeService::default(), "events", bytes).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Smile));
    assert_eq!(payload.parsed_payload.unwrap().to_json(), json!({"a": 1}));
}

#[tokio::test]
async fn test_text_and_control_characters() {
    let service = SerdeService::default();

    let payload = decode_value(&service, "logs", b"line one\tcolumn\r\n".to_vec()).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Text));
    assert_eq!(
        payload.normalized_payload.as_deref(),
        Some(&b"line one\tcolumn\r\n"[..])
    );

    let payload = decode_value(&service, "logs", b"bell\x07here".to_vec()).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Utf8WithControlChars));
}

#[tokio::test]
async fn test_uint_key_round_trip() {
    let service = SerdeService::default();
    let input = SerializeInput {
        topic: "counters".to_string(),
        key: SerializePayloadInput::new(PayloadEncoding::Uint, "513")
            .with_option(SerializeOption::UintSize(UintSize::U16)),
        value: SerializePayloadInput::new(PayloadEncoding::Text, "ok"),
    };
    let output = service.serialize_record(&input).await.unwrap();
    assert_eq!(output.key.payload, vec![0x02, 0x01]);

    // Two bytes of control characters would be detected as UTF-8 first.
    let record = Record::new("counters").with_key(output.key.payload);
    let opts = DeserializationOptions {
        key_encoding: Some(PayloadEncoding::Uint),
        ..Default::default()
    };
    let decoded = service.deserialize_record(&record, &opts).await;
    assert_eq!(decoded.key.encoding, Some(PayloadEncoding::Uint));
    assert_eq!(decoded.key.parsed_payload, Some(CodecValue::Int64(513)));
}

// ============================================================================
// Results
// ============================================================================

#[tokio::test]
async fn test_binary_fallback_carries_bytes_and_reports() {
    let payload = decode_value(&SerdeService::default(), "blobs", vec![0xC1, 0xFF, 0x00]).await;
    assert_eq!(payload.encoding, Some(PayloadEncoding::Binary));
    assert_eq!(
        payload.parsed_payload,
        Some(CodecValue::Bytes(vec![0xC1, 0xFF, 0x00]))
    );
    let reports = payload.troubleshooting.unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.serde_name.as_str()).collect();
    assert_eq!(names.first(), Some(&"none"));
    assert_eq!(names.last(), Some(&"uint"));
    assert!(reports.iter().all(|r| !r.message.is_empty()));
}

#[tokio::test]
async fn test_record_level_flags() {
    let service = SerdeService::default();
    let record = Record::new("orders")
        .with_key(Vec::new())
        .with_value(br#"{"note":"a fairly long value"}"#.to_vec())
        .with_header("trace", b"abc".to_vec());
    let opts = DeserializationOptions {
        max_payload_size: 10,
        include_raw_data: true,
        troubleshoot: true,
        ..Default::default()
    };
    let decoded = service.deserialize_record(&record, &opts).await;

    assert_eq!(decoded.key.encoding, Some(PayloadEncoding::None));
    assert!(!decoded.key.is_payload_null);
    assert_eq!(decoded.key.original_payload.as_deref(), Some(&[][..]));

    assert_eq!(decoded.value.encoding, Some(PayloadEncoding::Json));
    assert!(decoded.value.is_payload_too_large);
    assert!(decoded.value.normalized_payload.is_none());
    assert!(decoded.value.parsed_payload.is_none());
    assert_eq!(decoded.value.payload_size_bytes, 30);
    assert_eq!(decoded.value.troubleshooting.map(|r| r.len()), Some(1));

    assert_eq!(decoded.headers.len(), 1);
    assert_eq!(decoded.headers[0].key, "trace");
}

#[tokio::test]
async fn test_schema_encodings_need_registry() {
    let service = SerdeService::default();
    let input = SerializeInput {
        topic: "users".to_string(),
        key: SerializePayloadInput::new(PayloadEncoding::Text, "k"),
        value: SerializePayloadInput::new(PayloadEncoding::Avro, json!({"name": "ann"}))
            .with_option(SerializeOption::SchemaId(7)),
    };
    let err = service.serialize_record(&input).await.unwrap_err();
    assert_eq!(err.output.key.payload, b"k");
    assert!(err.output.value.payload.is_empty());
    assert_eq!(err.output.value.troubleshooting[0].serde_name, "avro");

    let payload = decode_value(&service, "users", framed(7, &user_avro_datum("ann", 30))).await;
    assert_ne!(payload.encoding, Some(PayloadEncoding::Avro));
    assert!(payload.schema_id.is_none());
}

// ============================================================================
// Progress reporting
// ============================================================================

#[tokio::test]
async fn test_scan_with_progress_reporter() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let reporter = Arc::new(StreamProgressReporter::new(tx, cancel.clone()));
    let handle = reporter.start();

    let service = SerdeService::default();
    let records = [
        Record::new("orders").with_value(br#"{"id":1}"#.to_vec()),
        Record::new("orders").with_value(b"plain".to_vec()),
        // Not UTF-8 and not a uint width.
        Record::new("orders").with_value(vec![0xFF, 0x00, 0x13]),
    ];

    reporter.on_phase("Consuming messages");
    for record in &records {
        let size = record.value.as_ref().map_or(0, Vec::len) as i64;
        reporter.on_message_consumed(size);
        let decoded = service
            .deserialize_record(record, &DeserializationOptions::default())
            .await;
        reporter.on_message(decoded);
    }
    cancel.cancel();
    handle.await.unwrap();
    reporter.on_complete(12, false);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    let encodings: Vec<Option<PayloadEncoding>> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Data(record) => Some(record.value.encoding),
            _ => None,
        })
        .collect();
    assert_eq!(
        encodings,
        vec![
            Some(PayloadEncoding::Json),
            Some(PayloadEncoding::Text),
            Some(PayloadEncoding::Binary)
        ]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Phase(name) if name == "Consuming messages")));
    match events.last() {
        Some(ProgressEvent::Done {
            messages_consumed,
            bytes_consumed,
            is_cancelled,
            ..
        }) => {
            assert_eq!(*messages_consumed, 3);
            assert_eq!(*bytes_consumed, 16);
            assert!(!is_cancelled);
        }
        other => panic!("expected a final Done event, got {other:?}"),
    }
}
