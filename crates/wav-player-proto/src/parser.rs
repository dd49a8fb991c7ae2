//! Slicing buffered bytes into units.

use std::io;

use serde_json::{Map, Value};

use crate::{CallKind, EVENT_TAG, EventKind, Reply, ServiceStatus, TERMINATOR, Unit, take_tag};

/// Outcome of one parse step over the unconsumed part of a receive buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// A full unit was decoded from the first `consumed` bytes.
    Complete { unit: Unit, consumed: usize },
    /// No terminator yet; keep the bytes and read more.
    Incomplete,
    /// The first `consumed` bytes form a unit that cannot be decoded.
    Invalid { error: String, consumed: usize },
}

/// Parse the leading unit of `buf`.
///
/// Handles a buffer holding exactly one unit, several units back to back
/// (call again after consuming), or a partial tail (`Incomplete`).
pub fn parse_unit(buf: &[u8]) -> ParseResult {
    let Some(pos) = buf.iter().position(|&b| b == TERMINATOR) else {
        return ParseResult::Incomplete;
    };
    let consumed = pos + 1;
    match decode_unit(&buf[..pos]) {
        Ok(unit) => ParseResult::Complete { unit, consumed },
        Err(e) => ParseResult::Invalid {
            error: e.to_string(),
            consumed,
        },
    }
}

/// Decode one unit from message bytes (terminator already stripped).
pub fn decode_unit(message: &[u8]) -> io::Result<Unit> {
    let mut object: Map<String, Value> = serde_json::from_slice(message)?;
    let tag = take_tag(&mut object)?;

    if tag == EVENT_TAG {
        let code = object.get("event").and_then(Value::as_i64).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "event unit without event type")
        })?;
        return Ok(Unit::Event(EventKind::from_code(code)?));
    }

    let kind = CallKind::from_tag(tag).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, format!("unknown tag {tag}"))
    })?;
    let result = object
        .remove("result")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "reply without result"))?;
    let result: ServiceStatus = serde_json::from_value(result)?;
    Ok(Unit::Reply {
        kind,
        reply: Reply {
            result,
            fields: object,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode_event, encode_reply};

    fn start_ok() -> Vec<u8> {
        encode_reply(
            CallKind::Start,
            &Reply::new(ServiceStatus::Ok).with_field("handle", 5),
        )
        .unwrap()
    }

    #[test]
    fn parses_single_reply() {
        let buf = start_ok();
        match parse_unit(&buf) {
            ParseResult::Complete { unit, consumed } => {
                assert_eq!(consumed, buf.len());
                match unit {
                    Unit::Reply { kind, reply } => {
                        assert_eq!(kind, CallKind::Start);
                        assert_eq!(reply.result, ServiceStatus::Ok);
                        assert_eq!(reply.handle(), Some(5));
                        assert!(!reply.fields.contains_key("tag"));
                        assert!(!reply.fields.contains_key("result"));
                    }
                    other => panic!("expected reply, got {other:?}"),
                }
            }
            other => panic!("expected complete unit, got {other:?}"),
        }
    }

    #[test]
    fn parses_back_to_back_units() {
        let mut buf = start_ok();
        let first_len = buf.len();
        buf.extend(encode_event(EventKind::PlaybackCompleted).unwrap());

        let ParseResult::Complete { consumed, .. } = parse_unit(&buf) else {
            panic!("first unit should be complete");
        };
        assert_eq!(consumed, first_len);

        match parse_unit(&buf[consumed..]) {
            ParseResult::Complete { unit, consumed: second } => {
                assert_eq!(unit, Unit::Event(EventKind::PlaybackCompleted));
                assert_eq!(consumed + second, buf.len());
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn partial_tail_is_incomplete() {
        let buf = start_ok();
        let cut = buf.len() / 2;
        assert_eq!(parse_unit(&buf[..cut]), ParseResult::Incomplete);
        assert_eq!(parse_unit(&[]), ParseResult::Incomplete);
    }

    #[test]
    fn unknown_tag_is_skipped_past_terminator() {
        let mut buf = br#"{"tag":40,"result":0}"#.to_vec();
        buf.push(TERMINATOR);
        let bad_len = buf.len();
        buf.extend(start_ok());

        match parse_unit(&buf) {
            ParseResult::Invalid { consumed, .. } => assert_eq!(consumed, bad_len),
            other => panic!("expected invalid unit, got {other:?}"),
        }
        assert!(matches!(
            parse_unit(&buf[bad_len..]),
            ParseResult::Complete { .. }
        ));
    }

    #[test]
    fn garbage_and_empty_units_are_invalid() {
        assert!(matches!(
            parse_unit(b"not json\0"),
            ParseResult::Invalid { consumed: 9, .. }
        ));
        assert!(matches!(
            parse_unit(b"\0"),
            ParseResult::Invalid { consumed: 1, .. }
        ));
    }

    #[test]
    fn reply_without_result_is_invalid() {
        let err = decode_unit(br#"{"tag":2}"#).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn event_needs_known_type() {
        assert!(decode_unit(br#"{"tag":-1}"#).is_err());
        assert!(decode_unit(br#"{"tag":-1,"event":7}"#).is_err());
        assert_eq!(
            decode_unit(br#"{"tag":-1,"event":1}"#).unwrap(),
            Unit::Event(EventKind::PlaybackCompleted)
        );
    }
}
