//! Unit tests for the ACP NDJSON codec.
//!
//! Covers:
//! - single and batched lines decode to their raw text
//! - partial delivery is buffered until the newline arrives
//! - oversized lines fail with `AppError::Acp("line too long…")`
//! - outbound values encode as one compact line
//! - an unterminated final line is flushed at EOF

use bytes::BytesMut;
use serde_json::json;
use tokio_util::codec::{Decoder, Encoder};

use agent_switchboard::acp::codec::{AcpCodec, MAX_LINE_BYTES};
use agent_switchboard::AppError;

// ── Decoding ─────────────────────────────────────────────────────────────────

/// A complete line decodes to its content without the trailing newline.
#[test]
fn single_line_decodes_without_newline() {
    let mut codec = AcpCodec::new();
    let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\",\"method\":\"session/update\"}\n");

    let line = codec.decode(&mut buf).expect("decode must succeed");

    assert_eq!(
        line.as_deref(),
        Some("{\"jsonrpc\":\"2.0\",\"method\":\"session/update\"}")
    );
}

/// Two lines in one buffer are returned by successive `decode` calls.
#[test]
fn batched_lines_are_each_decoded() {
    let mut codec = AcpCodec::new();
    let mut buf = BytesMut::from("{\"id\":1}\n{\"id\":2}\n");

    let first = codec.decode(&mut buf).expect("first decode");
    let second = codec.decode(&mut buf).expect("second decode");
    let third = codec.decode(&mut buf).expect("third decode");

    assert_eq!(first.as_deref(), Some("{\"id\":1}"));
    assert_eq!(second.as_deref(), Some("{\"id\":2}"));
    assert!(third.is_none(), "buffer must be drained");
}

/// Bytes without a newline stay buffered until the rest of the line arrives.
#[test]
fn partial_line_is_buffered_until_newline() {
    let mut codec = AcpCodec::new();
    let mut buf = BytesMut::from("{\"method\":\"sess");

    assert!(codec.decode(&mut buf).expect("partial decode").is_none());

    buf.extend_from_slice(b"ion/update\"}\n");
    let line = codec.decode(&mut buf).expect("completed decode");
    assert_eq!(line.as_deref(), Some("{\"method\":\"session/update\"}"));
}

/// Malformed JSON is not the codec's concern; the raw line is returned.
#[test]
fn malformed_json_is_returned_as_raw_line() {
    let mut codec = AcpCodec::new();
    let mut buf = BytesMut::from("not json at all\n");

    let line = codec.decode(&mut buf).expect("decode must not parse JSON");
    assert_eq!(line.as_deref(), Some("not json at all"));
}

/// A line longer than the limit surfaces an `Acp` framing error.
#[test]
fn line_over_limit_is_an_acp_error() {
    let mut codec = AcpCodec::with_max_length(16);
    let mut buf = BytesMut::from("{\"payload\":\"0123456789abcdef\"}\n");

    let err = codec
        .decode(&mut buf)
        .expect_err("oversized line must fail");

    match err {
        AppError::Acp(msg) => assert!(msg.starts_with("line too long"), "got: {msg}"),
        other => panic!("expected AppError::Acp, got {other:?}"),
    }
}

/// The default limit is 1 MiB.
#[test]
fn default_limit_is_one_mebibyte() {
    assert_eq!(MAX_LINE_BYTES, 1_048_576);
    assert_eq!(AcpCodec::new().max_length(), MAX_LINE_BYTES);
    assert_eq!(AcpCodec::default().max_length(), MAX_LINE_BYTES);
}

/// An unterminated trailing line is still delivered at end of stream.
#[test]
fn unterminated_line_is_flushed_at_eof() {
    let mut codec = AcpCodec::new();
    let mut buf = BytesMut::from("{\"id\":9}");

    assert!(codec.decode(&mut buf).expect("decode").is_none());
    let line = codec.decode_eof(&mut buf).expect("decode_eof");
    assert_eq!(line.as_deref(), Some("{\"id\":9}"));
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Outbound messages are written as one compact, newline-terminated line.
#[test]
fn value_encodes_as_single_line() {
    let mut codec = AcpCodec::new();
    let mut dst = BytesMut::new();

    codec
        .encode(
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
            &mut dst,
        )
        .expect("encode must succeed");

    let text = std::str::from_utf8(&dst).expect("utf-8");
    assert!(text.ends_with('\n'));
    assert_eq!(text.matches('\n').count(), 1, "exactly one line");

    let parsed: serde_json::Value =
        serde_json::from_str(text.trim_end()).expect("line must be valid JSON");
    assert_eq!(parsed["method"], "initialize");
}

/// Embedded newlines in string values are escaped, never split the frame.
#[test]
fn embedded_newlines_do_not_split_frames() {
    let mut codec = AcpCodec::new();
    let mut dst = BytesMut::new();

    codec
        .encode(json!({ "text": "line one\nline two" }), &mut dst)
        .expect("encode");

    let text = std::str::from_utf8(&dst).expect("utf-8");
    assert_eq!(text.matches('\n').count(), 1);
    assert!(text.contains("line one\\nline two"));
}
