use core::fmt;

use num_traits::FromPrimitive;

/// Record types the loader understands. Anything else is rejected when the
/// record is interpreted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, enum_primitive_derive::Primitive)]
pub enum RecordType {
    Data = 0,
    EndOfFile = 1,
    ExtendedLinearAddress = 4,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Record {
    address: u16,
    record_type: u8,
    payload: Vec<u8>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParseError {
    MalformedRecord,
    InvalidHexDigit(char),
    /// Holds the residual sum of all decoded bytes.
    ChecksumMismatch(u8),
    RecordTooShort(usize),
    LengthMismatch { declared: u8, decoded: usize },
}

/// count + address (2) + type + checksum
const OVERHEAD: usize = 5;

#[inline]
fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0_u8, |acc, b| acc.wrapping_add(*b))
}

impl Record {
    pub const MAX_PAYLOAD: usize = u8::MAX as usize;

    pub fn new(record_type: u8, address: u16, payload: &[u8]) -> Option<Self> {
        match payload.len() {
            0..=Self::MAX_PAYLOAD => Some(Self {
                address,
                record_type,
                payload: payload.to_vec(),
            }),
            _ => None,
        }
    }

    #[inline]
    pub fn byte_count(&self) -> u8 {
        self.payload.len() as u8
    }

    #[inline]
    pub fn address(&self) -> u16 {
        self.address
    }

    #[inline]
    pub fn record_type(&self) -> u8 {
        self.record_type
    }

    #[inline]
    pub fn kind(&self) -> Option<RecordType> {
        RecordType::from_u8(self.record_type)
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decodes one `:`-prefixed line. The line must not contain its
    /// terminator.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let digits = line.strip_prefix(':').ok_or(ParseError::MalformedRecord)?;

        // hex reports single bytes and checks the length first, so look the
        // offending character up in the text itself
        let bytes = hex::decode(digits).map_err(|_| {
            digits
                .chars()
                .find(|c| !c.is_ascii_hexdigit())
                .map_or(ParseError::MalformedRecord, ParseError::InvalidHexDigit)
        })?;

        match checksum(&bytes) {
            0 => {}
            sum => return Err(ParseError::ChecksumMismatch(sum)),
        }

        if bytes.len() < OVERHEAD {
            return Err(ParseError::RecordTooShort(bytes.len()));
        }
        if bytes[0] as usize + OVERHEAD != bytes.len() {
            return Err(ParseError::LengthMismatch {
                declared: bytes[0],
                decoded: bytes.len(),
            });
        }

        Ok(Self {
            address: u16::from_be_bytes([bytes[1], bytes[2]]),
            record_type: bytes[3],
            payload: bytes[4..bytes.len() - 1].to_vec(),
        })
    }

    /// Canonical upper-case line, checksum included.
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(self.payload.len() + OVERHEAD);
        bytes.push(self.byte_count());
        bytes.extend(self.address.to_be_bytes());
        bytes.push(self.record_type);
        bytes.extend(&self.payload);
        bytes.push(checksum(&bytes).wrapping_neg());

        format!(":{}", hex::encode_upper(bytes))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedRecord => write!(f, "missing ':' in record"),
            ParseError::InvalidHexDigit(c) => write!(f, "{:?}: invalid hex character", c),
            ParseError::ChecksumMismatch(sum) => {
                write!(f, "record bad checksum (sum {:#04x})", sum)
            }
            ParseError::RecordTooShort(len) => write!(f, "record too short ({} bytes)", len),
            ParseError::LengthMismatch { declared, decoded } => write!(
                f,
                "bad record length (declared {} data bytes, decoded {} bytes)",
                declared, decoded
            ),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn parse() {
        let r = Record::parse(":02000000AABB99").unwrap();
        assert_eq!(r.byte_count(), 2);
        assert_eq!(r.address(), 0);
        assert_eq!(r.kind(), Some(RecordType::Data));
        assert_eq!(r.payload(), [0xAA, 0xBB]);

        let r = Record::parse(":020000040001F9").unwrap();
        assert_eq!(r.kind(), Some(RecordType::ExtendedLinearAddress));
        assert_eq!(r.payload(), [0x00, 0x01]);

        let r = Record::parse(":00000001FF").unwrap();
        assert_eq!(r.kind(), Some(RecordType::EndOfFile));
        assert!(r.payload().is_empty());

        // lower case digits are accepted
        let r = Record::parse(":04001000fe2f123479").unwrap();
        assert_eq!(r.address(), 0x0010);
        assert_eq!(r.payload(), [0xFE, 0x2F, 0x12, 0x34]);

        // unknown types are left for the translator to reject
        let r = Record::parse(":0400000300003800C1").unwrap();
        assert_eq!(r.record_type(), 3);
        assert_eq!(r.kind(), None);
    }

    #[test]
    fn errors() {
        assert_eq!(Record::parse("02000000AABB99"), Err(ParseError::MalformedRecord));
        assert_eq!(Record::parse(""), Err(ParseError::MalformedRecord));
        assert_eq!(
            Record::parse(":02000000AXBB99"),
            Err(ParseError::InvalidHexDigit('X'))
        );
        assert_eq!(
            Record::parse(":02000000AABB9 "),
            Err(ParseError::InvalidHexDigit(' '))
        );
        assert_eq!(
            Record::parse(":02000000AABB9"),
            Err(ParseError::MalformedRecord)
        );
        assert_eq!(
            Record::parse(":02000000AABB98"),
            Err(ParseError::ChecksumMismatch(0xFF))
        );
        assert_eq!(Record::parse(":"), Err(ParseError::RecordTooShort(0)));
        assert_eq!(Record::parse(":01FF"), Err(ParseError::RecordTooShort(2)));
        assert_eq!(
            Record::parse(":03000000AABB98"),
            Err(ParseError::LengthMismatch {
                declared: 3,
                decoded: 7
            })
        );
    }

    #[test]
    fn multibyte_digit() {
        // 'é' is two bytes, so the text is an even number of bytes here
        assert_eq!(
            Record::parse(":0200é00AABB99"),
            Err(ParseError::InvalidHexDigit('é'))
        );
        assert_eq!(
            Record::parse(":0200é000AABB99"),
            Err(ParseError::InvalidHexDigit('é'))
        );
        assert_eq!(
            Record::parse(":02\u{FFFD}0000AABB99"),
            Err(ParseError::InvalidHexDigit('\u{FFFD}'))
        );
    }

    #[test]
    fn encode() {
        let r = Record::new(0, 0, &[0xAA, 0xBB]).unwrap();
        assert_eq!(r.encode(), ":02000000AABB99");

        let r = Record::new(4, 0, &[0x00, 0x01]).unwrap();
        assert_eq!(r.encode(), ":020000040001F9");

        assert_eq!(Record::new(0, 0, &[0; 256]), None);
        assert!(Record::new(0, 0, &[0; 255]).is_some());
    }

    #[test]
    fn round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(0..=Record::MAX_PAYLOAD);
            let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let r = Record::new(rng.gen(), rng.gen(), &payload).unwrap();

            let line = r.encode();
            let parsed = Record::parse(&line).unwrap();
            assert_eq!(parsed, r, "line {}", line);
            assert_eq!(parsed.encode(), line);
        }
    }

    #[test]
    fn bad_sum_never_parses() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let len = rng.gen_range(0..40);
            let mut bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            if checksum(&bytes) == 0 {
                bytes.push(1);
            }

            let line = format!(":{}", hex::encode(&bytes));
            assert_eq!(
                Record::parse(&line),
                Err(ParseError::ChecksumMismatch(checksum(&bytes))),
                "line {}",
                line
            );
        }
    }
}
