use core::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::script::Script;

/// Where the loader expects the script segment.
pub const LOAD_ADDRESS: u16 = 0x2C00;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageError {
    EmptyTemplate,
    /// Script would run past the end of the 16 bit address space.
    SegmentOverflow(usize),
}

/// One `(start, end, data)` block of the loader's executable format. Both
/// addresses are inclusive.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Segment<'a> {
    pub start: u16,
    pub end: u16,
    pub data: &'a [u8],
}

impl<'a> Segment<'a> {
    const HEADER_LEN: usize = 4;

    pub fn new(start: u16, data: &'a [u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let last = start as usize + data.len() - 1;
        Some(Self {
            start,
            end: u16::try_from(last).ok()?,
            data,
        })
    }

    /// Reads the segment at the start of `bytes`, returning it and what
    /// follows.
    pub fn parse(bytes: &'a [u8]) -> Option<(Self, &'a [u8])> {
        if bytes.len() < Self::HEADER_LEN {
            return None;
        }
        let start = LittleEndian::read_u16(&bytes[..2]);
        let end = LittleEndian::read_u16(&bytes[2..4]);
        let len = (end.checked_sub(start)? as usize) + 1;
        let rest = &bytes[Self::HEADER_LEN..];

        (rest.len() >= len).then(|| {
            (
                Self {
                    start,
                    end,
                    data: &rest[..len],
                },
                &rest[len..],
            )
        })
    }

    pub fn len(&self) -> usize {
        Self::HEADER_LEN + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut header = [0_u8; Self::HEADER_LEN];
        LittleEndian::write_u16(&mut header[..2], self.start);
        LittleEndian::write_u16(&mut header[2..], self.end);
        out.extend_from_slice(&header);
        out.extend_from_slice(self.data);
    }
}

/// Patches the script end into the header and appends the script to the
/// loader as a new segment.
pub fn compose(mut script: Script, template: &[u8]) -> Result<Vec<u8>, ImageError> {
    if template.is_empty() {
        return Err(ImageError::EmptyTemplate);
    }

    // the loader reads the end as the first address past the script
    let end = LOAD_ADDRESS as usize + script.len();
    script.set_end(u16::try_from(end).map_err(|_| ImageError::SegmentOverflow(end))?);

    let segment =
        Segment::new(LOAD_ADDRESS, script.as_bytes()).ok_or(ImageError::SegmentOverflow(end))?;
    log::debug!(
        "script segment {:#06x}..={:#06x}, {} bytes",
        segment.start,
        segment.end,
        segment.data.len()
    );

    let mut image = Vec::with_capacity(template.len() + segment.len());
    image.extend_from_slice(template);
    segment.write_to(&mut image);
    Ok(image)
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::EmptyTemplate => write!(f, "loader template is empty"),
            ImageError::SegmentOverflow(end) => {
                write!(f, "script segment ends past $FFFF ({:#x})", end)
            }
        }
    }
}

impl std::error::Error for ImageError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Instruction;

    const TEMPLATE: [u8; 8] = [0xFF, 0xFF, 0x00, 0x20, 0x01, 0x20, 0xEA, 0x60];

    #[test]
    fn segment() {
        let s = Segment::new(0x2C00, &[1, 2, 3]).unwrap();
        assert_eq!(s.end, 0x2C02);

        let mut out = Vec::new();
        s.write_to(&mut out);
        assert_eq!(out, [0x00, 0x2C, 0x02, 0x2C, 1, 2, 3]);

        assert_eq!(Segment::parse(&out), Some((s, &[][..])));
        assert_eq!(Segment::parse(&out[..6]), None);

        assert_eq!(Segment::new(0x2C00, &[]), None);
        assert_eq!(Segment::new(0xFFFF, &[1, 2]), None);
    }

    #[test]
    fn empty_script() {
        let image = compose(Script::new(0x1400), &TEMPLATE).unwrap();

        assert_eq!(image[..TEMPLATE.len()], TEMPLATE);
        assert_eq!(
            image[TEMPLATE.len()..],
            [0x00, 0x2C, 0x03, 0x2C, 0x00, 0x14, 0x04, 0x2C]
        );
    }

    #[test]
    fn script_end() {
        let mut script = Script::new(0x2360);
        script
            .push(&Instruction::write(&[0xAA, 0xBB]).unwrap())
            .unwrap();

        let image = compose(script, &TEMPLATE).unwrap();
        let (segment, rest) = Segment::parse(&image[TEMPLATE.len()..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(segment.start, LOAD_ADDRESS);
        assert_eq!(segment.end, 0x2C06);
        assert_eq!(segment.data, [0x60, 0x23, 0x07, 0x2C, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn empty_template() {
        assert_eq!(
            compose(Script::new(0), &[]),
            Err(ImageError::EmptyTemplate)
        );
    }
}
