//! Decoding of one event block into a [`Frame`].

use serde::Deserialize;

use crate::errors::DecodeError;
use crate::types::{Frame, FrameKind};

/// Marker that prefixes the payload line.
pub const DATA_PREFIX: &str = "data:";

/// Payload value that ends the stream outside the record format.
pub const END_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(alias = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Extracts the payload of the first `data:` line of a block.
fn payload(raw: &str) -> Option<&str> {
    raw.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.starts_with(':'))
        .find_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
}

/// Decodes one event block, delimiter already stripped.
///
/// The end sentinel is checked before any structured parsing and yields a
/// `complete` frame with no message. Errors are values; the caller drops
/// the block and carries on.
pub fn decode(raw: &str) -> Result<Frame, DecodeError> {
    let data = payload(raw).ok_or(DecodeError::MissingPayload)?;

    if data == END_SENTINEL {
        return Ok(Frame::complete());
    }

    let record: WireRecord = serde_json::from_str(data).map_err(|e| DecodeError::Malformed {
        message: e.to_string(),
    })?;
    let kind: FrameKind = record.kind.parse()?;

    // Only the fields the kind defines survive.
    let frame = match kind {
        FrameKind::Token => Frame {
            kind,
            content: record.content,
            message: None,
            summary: None,
        },
        FrameKind::Status | FrameKind::Error => Frame {
            kind,
            content: None,
            message: record.message,
            summary: None,
        },
        FrameKind::Complete => Frame {
            kind,
            content: None,
            message: record.message,
            summary: record.summary,
        },
    };
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(r#"data: {"kind":"token","content":"A"}"#, Frame::token("A"); "token")]
    #[test_case(r#"data: {"kind":"status","message":"Fetching logs..."}"#, Frame::status("Fetching logs..."); "status")]
    #[test_case(r#"data: {"kind":"error","message":"Error: boom"}"#, Frame::error("Error: boom"); "error")]
    #[test_case(r#"data: {"kind":"complete","summary":"No logs found for this job."}"#, Frame::complete_with_summary("No logs found for this job."); "complete with summary")]
    #[test_case(r#"data: {"type": "token", "content": " world"}"#, Frame::token(" world"); "type alias")]
    #[test_case("data:{\"kind\":\"token\",\"content\":\"x\"}\r", Frame::token("x"); "no space and carriage return")]
    #[test_case("event: message\ndata: {\"kind\":\"token\",\"content\":\"y\"}", Frame::token("y"); "other fields ignored")]
    #[test_case(": keep-alive\ndata: {\"kind\":\"token\",\"content\":\"z\"}", Frame::token("z"); "comment skipped")]
    fn test_decode_valid(raw: &str, expected: Frame) {
        assert_eq!(decode(raw).unwrap(), expected);
    }

    #[test_case(r#"data: {"kind":"token","content":"A","summary":"whole text"}"#, Frame::token("A"); "token drops summary")]
    #[test_case(r#"data: {"kind":"status","message":"Fetching logs...","content":"x"}"#, Frame::status("Fetching logs..."); "status drops content")]
    #[test_case(r#"data: {"kind":"error","message":"Error: boom","summary":"s"}"#, Frame::error("Error: boom"); "error drops summary")]
    #[test_case(r#"data: {"kind":"complete","message":"done","content":"x"}"#, Frame::complete().with_message("done"); "complete drops content")]
    fn test_fields_follow_kind(raw: &str, expected: Frame) {
        assert_eq!(decode(raw).unwrap(), expected);
    }

    #[test_case("data: [DONE]"; "plain sentinel")]
    #[test_case("data:[DONE]  "; "sentinel with padding")]
    fn test_sentinel_yields_bare_complete(raw: &str) {
        let frame = decode(raw).unwrap();
        assert_eq!(frame, Frame::complete());
        assert!(frame.message.is_none());
    }

    #[test]
    fn test_sentinel_takes_priority() {
        let raw = "data: [DONE]\ndata: {\"kind\":\"token\",\"content\":\"late\"}";
        assert_eq!(decode(raw).unwrap(), Frame::complete());
    }

    #[test]
    fn test_unknown_kind_is_distinct() {
        assert_eq!(
            decode(r#"data: {"kind":"progress","message":"50%"}"#),
            Err(DecodeError::UnknownKind {
                kind: "progress".to_string()
            })
        );
    }

    #[test_case(r#"data: {"kind":"token","content":"#; "truncated json")]
    #[test_case("data: not json"; "plain text")]
    #[test_case(r#"data: {"content":"no kind"}"#; "missing kind")]
    fn test_malformed(raw: &str) {
        assert!(matches!(decode(raw), Err(DecodeError::Malformed { .. })));
    }

    #[test_case("event: ping"; "no data line")]
    #[test_case(": comment only"; "comment only")]
    fn test_missing_payload(raw: &str) {
        assert_eq!(decode(raw), Err(DecodeError::MissingPayload));
    }
}
