use regex::bytes::Regex;
use std::fmt;
use std::sync::LazyLock;
use strikeplate_core::{
    Error, ReaderId, ReaderVariant, Result, TransponderId,
    constants::{END_BYTE, START_BYTE},
};

/// Leser 7plus grammar: `STX RR "EM" TTTTTTTTTT <any> EOT`.
///
/// `(?s-u)` lets the wildcard consume any byte, control bytes included.
static LESER7PLUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)\A\x02([A-Z0-9]{2})EM([A-Z0-9]{10}).*\x04\z")
        .expect("Leser 7plus frame pattern is valid")
});

/// Leser 9 grammar: `STX "R" TTTTTTTTTT EOT <any>`.
static LESER9_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)\A\x02R([A-Z0-9]{10})\x04.*\z").expect("Leser 9 frame pattern is valid")
});

/// A transponder read extracted from the serial byte stream.
///
/// # Wire Format
///
/// **Leser 7plus** carries the reader ID inline:
/// ```text
/// <STX>01EMAB12EF34CD....<EOT>
///      ^^  ^^^^^^^^^^
///      |   transponder
///      reader
/// ```
///
/// **Leser 9** only carries the transponder; the reader ID is the one
/// configured for the session:
/// ```text
/// <STX>RAB12EF34CD<EOT>....
///       ^^^^^^^^^^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Reader the transponder was presented to.
    pub reader_id: ReaderId,

    /// Transponder that was read.
    pub transponder_id: TransponderId,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.transponder_id, self.reader_id)
    }
}

/// Matches accumulated read buffers against the grammar of one reader variant.
///
/// Matching is anchored at both ends of the buffer. A buffer holding a valid
/// frame plus trailing noise still matches because each grammar ends in a
/// wildcard section; a buffer with leading noise or a truncated frame does not.
///
/// # Examples
///
/// ```
/// use strikeplate_core::{ReaderId, ReaderVariant};
/// use strikeplate_protocol::FrameParser;
///
/// let parser = FrameParser::new(ReaderVariant::Leser9, Some(ReaderId::new("D1").unwrap())).unwrap();
/// let frame = parser.try_parse(b"\x02RAB12EF34CD\x04").unwrap();
/// assert_eq!(frame.transponder_id.as_str(), "AB12EF34CD");
/// assert_eq!(frame.reader_id.as_str(), "D1");
///
/// assert!(parser.try_parse(b"\x02R12345\x04").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FrameParser {
    variant: ReaderVariant,
    session_reader_id: Option<ReaderId>,
}

impl FrameParser {
    /// Create a parser for `variant`.
    ///
    /// `session_reader_id` is required for variants that do not carry the
    /// reader ID on the wire and ignored otherwise.
    ///
    /// # Errors
    /// Returns `Error::MissingReaderId` for a Leser 9 parser without a reader ID.
    pub fn new(variant: ReaderVariant, session_reader_id: Option<ReaderId>) -> Result<Self> {
        if !variant.carries_reader_id() && session_reader_id.is_none() {
            return Err(Error::MissingReaderId {
                variant: variant.to_string(),
            });
        }

        Ok(Self {
            variant,
            session_reader_id,
        })
    }

    /// The variant this parser was built for.
    pub fn variant(&self) -> ReaderVariant {
        self.variant
    }

    /// Try to extract a frame from a complete read buffer.
    ///
    /// Returns `None` if the buffer does not conform to the grammar. The
    /// buffer is not retained; a partial frame is lost.
    pub fn try_parse(&self, buffer: &[u8]) -> Option<Frame> {
        match self.variant {
            ReaderVariant::Leser7Plus => {
                let captures = LESER7PLUS_PATTERN.captures(buffer)?;
                Some(Frame {
                    reader_id: ReaderId::new(ascii(captures.get(1)?.as_bytes())?).ok()?,
                    transponder_id: TransponderId::new(ascii(captures.get(2)?.as_bytes())?)
                        .ok()?,
                })
            }
            ReaderVariant::Leser9 => {
                let captures = LESER9_PATTERN.captures(buffer)?;
                Some(Frame {
                    reader_id: self.session_reader_id.clone()?,
                    transponder_id: TransponderId::new(ascii(captures.get(1)?.as_bytes())?)
                        .ok()?,
                })
            }
        }
    }

    /// Split a read burst into the buffers to parse.
    ///
    /// The Leser 7plus grammar ends at the terminator, so its bursts are cut
    /// after every `EOT` and each piece is parsed on its own. A Leser 9 burst
    /// is parsed whole because its grammar absorbs trailing bytes.
    ///
    /// ```
    /// use strikeplate_core::ReaderVariant;
    /// use strikeplate_protocol::FrameParser;
    ///
    /// let parser = FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap();
    /// let segments: Vec<&[u8]> = parser.segments(b"\x0201EMAB12EF34CD\x04\r\n").collect();
    /// assert_eq!(segments, [&b"\x0201EMAB12EF34CD\x04"[..], &b"\r\n"[..]]);
    /// ```
    pub fn segments<'a>(&self, buffer: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        let split_at_end = self.variant == ReaderVariant::Leser7Plus;
        buffer.split_inclusive(move |&b| split_at_end && b == END_BYTE)
    }
}

fn ascii(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

/// Render raw serial bytes for log output.
///
/// Printable ASCII is kept, the framing markers become `<STX>`/`<EOT>` and
/// any other byte is shown as `<xx>` hex.
///
/// ```
/// use strikeplate_protocol::display_bytes;
///
/// assert_eq!(display_bytes(b"\x02R1\x04"), "<STX>R1<EOT>");
/// assert_eq!(display_bytes(&[0x0d]), "<0d>");
/// ```
pub fn display_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 8);
    for &b in bytes {
        match b {
            START_BYTE => out.push_str("<STX>"),
            END_BYTE => out.push_str("<EOT>"),
            0x20..=0x7e => out.push(b as char),
            other => out.push_str(&format!("<{other:02x}>")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn leser7plus() -> FrameParser {
        FrameParser::new(ReaderVariant::Leser7Plus, None).unwrap()
    }

    fn leser9(reader: &str) -> FrameParser {
        FrameParser::new(ReaderVariant::Leser9, Some(ReaderId::new(reader).unwrap())).unwrap()
    }

    #[test]
    fn test_leser9_requires_reader_id() {
        let result = FrameParser::new(ReaderVariant::Leser9, None);
        assert!(matches!(result, Err(Error::MissingReaderId { .. })));
    }

    #[rstest]
    #[case(b"\x0201EMAB12EF34CD\x04".as_slice(), "01", "AB12EF34CD")]
    #[case(b"\x02Z9EM0000000001xyz\x04".as_slice(), "Z9", "0000000001")]
    #[case(b"\x0201EMAB12EF34CD\r\n\x01\x04".as_slice(), "01", "AB12EF34CD")]
    #[case(b"\x0201EMAB12EF34CD\x04\x04".as_slice(), "01", "AB12EF34CD")]
    fn test_leser7plus_valid(#[case] buffer: &[u8], #[case] reader: &str, #[case] transponder: &str) {
        let frame = leser7plus().try_parse(buffer).unwrap();
        assert_eq!(frame.reader_id.as_str(), reader);
        assert_eq!(frame.transponder_id.as_str(), transponder);
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"\x0201EMAB12EF34CD".as_slice())] // missing terminator
    #[case(b"x\x0201EMAB12EF34CD\x04".as_slice())] // leading noise
    #[case(b"\x0201EMAB12EF34CD\x04tail".as_slice())] // noise after terminator
    #[case(b"\x0201XXAB12EF34CD\x04".as_slice())] // wrong marker
    #[case(b"\x0201EMab12ef34cd\x04".as_slice())] // lower case
    #[case(b"\x0201EMAB12EF34C\x04".as_slice())] // short transponder
    #[case(b"\x02RAB12EF34CD\x04".as_slice())] // Leser 9 frame
    fn test_leser7plus_no_match(#[case] buffer: &[u8]) {
        assert!(leser7plus().try_parse(buffer).is_none());
    }

    #[rstest]
    #[case(b"\x02RAB12EF34CD\x04".as_slice())]
    #[case(b"\x02RAB12EF34CD\x04trailing noise".as_slice())]
    #[case(b"\x02RAB12EF34CD\x04\x02RAB12EF34CD\x04".as_slice())]
    fn test_leser9_valid(#[case] buffer: &[u8]) {
        let frame = leser9("D1").try_parse(buffer).unwrap();
        assert_eq!(frame.reader_id.as_str(), "D1");
        assert_eq!(frame.transponder_id.as_str(), "AB12EF34CD");
    }

    #[rstest]
    #[case(b"\x02RAB12EF34CD".as_slice())]
    #[case(b"\x02RAB12EF34CDE\x04".as_slice())]
    #[case(b"\x02AB12EF34CD\x04".as_slice())]
    #[case(b" \x02RAB12EF34CD\x04".as_slice())]
    #[case(b"\x0201EMAB12EF34CD\x04".as_slice())]
    fn test_leser9_no_match(#[case] buffer: &[u8]) {
        assert!(leser9("D1").try_parse(buffer).is_none());
    }

    #[test]
    fn test_leser7plus_ignores_session_reader() {
        let parser =
            FrameParser::new(ReaderVariant::Leser7Plus, Some(ReaderId::new("D1").unwrap())).unwrap();
        let frame = parser.try_parse(b"\x0242EMAB12EF34CD\x04").unwrap();
        assert_eq!(frame.reader_id.as_str(), "42");
    }

    #[rstest]
    #[case(b"\x0201EMAB12EF34CD\x04\r\n".as_slice(), 2)]
    #[case(b"\x0201EMAB12EF34CD\x04\x0202EMAB12EF34CE\x04".as_slice(), 2)]
    #[case(b"\x0201EMAB12EF34CD\x04".as_slice(), 1)]
    #[case(b"".as_slice(), 0)]
    fn test_leser7plus_segments(#[case] buffer: &[u8], #[case] count: usize) {
        let parser = leser7plus();
        assert_eq!(parser.segments(buffer).count(), count);

        let first = parser.segments(buffer).next().and_then(|s| parser.try_parse(s));
        assert_eq!(first.is_some(), count > 0);
    }

    #[test]
    fn test_leser7plus_segments_parse_each_frame() {
        let parser = leser7plus();
        let frames: Vec<Frame> = parser
            .segments(b"\x0201EMAB12EF34CD\x04\x0202EMAB12EF34CE\x04\r\n")
            .filter_map(|s| parser.try_parse(s))
            .collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].to_string(), "AB12EF34CD@01");
        assert_eq!(frames[1].to_string(), "AB12EF34CE@02");
    }

    #[test]
    fn test_leser9_burst_is_one_segment() {
        let parser = leser9("D1");
        let buffer = b"\x02RAB12EF34CD\x04\r\n\x04";
        let segments: Vec<&[u8]> = parser.segments(buffer).collect();
        assert_eq!(segments, [&buffer[..]]);
    }

    #[test]
    fn test_frame_display() {
        let frame = leser9("D1").try_parse(b"\x02RAB12EF34CD\x04").unwrap();
        assert_eq!(frame.to_string(), "AB12EF34CD@D1");
    }
}
