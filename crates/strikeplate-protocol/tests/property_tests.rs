//! Property-based tests for the transponder frame grammars.
//!
//! These tests generate random well-formed and malformed read buffers and
//! verify that the parser extracts exactly the captured identifiers for every
//! conforming buffer and rejects everything else.

use proptest::prelude::*;
use strikeplate_core::{ReaderId, ReaderVariant};
use strikeplate_protocol::FrameParser;

/// Strategy for identifier characters accepted by the reader firmware.
fn id_chars(len: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[A-Z0-9]{{{len}}}"))
        .expect("Failed to create identifier regex strategy")
}

/// Strategy for arbitrary bytes filling the ignored section of a frame.
fn ignored_section() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..32)
}

fn leser7plus_frame(reader: &str, transponder: &str, ignored: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0x02];
    buffer.extend_from_slice(reader.as_bytes());
    buffer.extend_from_slice(b"EM");
    buffer.extend_from_slice(transponder.as_bytes());
    buffer.extend_from_slice(ignored);
    buffer.push(0x04);
    buffer
}

proptest! {
    /// Property: every conforming Leser 7plus buffer yields both capture groups.
    #[test]
    fn prop_leser7plus_extracts_captures(
        reader in id_chars(2),
        transponder in id_chars(10),
        ignored in ignored_section(),
    ) {
        let parser = FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap();
        let buffer = leser7plus_frame(&reader, &transponder, &ignored);

        let frame = parser.try_parse(&buffer).unwrap();
        prop_assert_eq!(frame.reader_id.as_str(), reader.as_str());
        prop_assert_eq!(frame.transponder_id.as_str(), transponder.as_str());
    }

    /// Property: a Leser 7plus buffer whose last byte is not the terminator
    /// never matches.
    #[test]
    fn prop_leser7plus_requires_terminator(
        reader in id_chars(2),
        transponder in id_chars(10),
        ignored in ignored_section(),
        last in any::<u8>().prop_filter("not a terminator", |b| *b != 0x04),
    ) {
        let parser = FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap();
        let mut buffer = leser7plus_frame(&reader, &transponder, &ignored);
        buffer.push(last);

        prop_assert!(parser.try_parse(&buffer).is_none());
    }

    /// Property: a buffer that does not start with STX never matches.
    #[test]
    fn prop_leading_noise_rejected(
        noise in any::<u8>().prop_filter("not STX", |b| *b != 0x02),
        reader in id_chars(2),
        transponder in id_chars(10),
    ) {
        let parser = FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap();
        let mut buffer = vec![noise];
        buffer.extend(leser7plus_frame(&reader, &transponder, b""));

        prop_assert!(parser.try_parse(&buffer).is_none());
    }

    /// Property: Leser 9 buffers report the session reader whatever trails
    /// the terminator.
    #[test]
    fn prop_leser9_uses_session_reader(
        transponder in id_chars(10),
        trailing in ignored_section(),
    ) {
        let reader = ReaderId::new("D1").unwrap();
        let parser = FrameParser::new(ReaderVariant::Leser9, Some(reader.clone())).unwrap();

        let mut buffer = vec![0x02, b'R'];
        buffer.extend_from_slice(transponder.as_bytes());
        buffer.push(0x04);
        buffer.extend_from_slice(&trailing);

        let frame = parser.try_parse(&buffer).unwrap();
        prop_assert_eq!(frame.reader_id, reader);
        prop_assert_eq!(frame.transponder_id.as_str(), transponder.as_str());
    }

    /// Property: the parser never panics on arbitrary input.
    #[test]
    fn prop_arbitrary_bytes_do_not_panic(buffer in prop::collection::vec(any::<u8>(), 0..64)) {
        let leser7plus = FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap();
        let leser9 = FrameParser::new(ReaderVariant::Leser9, Some(ReaderId::new("D1").unwrap())).unwrap();

        let _ = leser7plus.try_parse(&buffer);
        let _ = leser9.try_parse(&buffer);
    }
}
