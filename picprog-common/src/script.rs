use core::fmt;
use core::num::NonZeroU8;

use arrayvec::ArrayVec;
use byteorder::{ByteOrder, LittleEndian};

use crate::translator::Decision;

/// Whole script including its header, the loader cannot take more.
pub const CAPACITY: usize = 30_000;

/// device id + script end
pub const HEADER_LEN: usize = 4;

/// One loader operation.
///
/// On the wire a `0x00` byte starts a two byte instruction: `00 00` moves to
/// the config region and `00 n` skips `n` words. Any other leading byte `k`
/// writes the `k` words that follow it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction<'a> {
    RegionTransition,
    Skip(NonZeroU8),
    /// `2 * k` bytes, `1 <= k <= 255`.
    Write(&'a [u8]),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Overflow;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// Stream ends inside the instruction starting at this offset.
    Truncated(usize),
}

impl<'a> Instruction<'a> {
    pub const PREFIX: u8 = 0x00;
    pub const MAX_WORDS: usize = u8::MAX as usize;

    pub fn write(words: &'a [u8]) -> Option<Self> {
        match words.len() {
            n if n % 2 == 0 && (1..=Self::MAX_WORDS).contains(&(n / 2)) => {
                Some(Instruction::Write(words))
            }
            _ => None,
        }
    }

    #[inline]
    pub fn encoded_len(&self) -> usize {
        match self {
            Instruction::RegionTransition | Instruction::Skip(_) => 2,
            Instruction::Write(words) => 1 + words.len(),
        }
    }

    /// Splits the first instruction off `stream`.
    fn decode(stream: &'a [u8]) -> Option<(Self, &'a [u8])> {
        match stream {
            [Self::PREFIX, 0, rest @ ..] => Some((Instruction::RegionTransition, rest)),
            [Self::PREFIX, n, rest @ ..] => Some((Instruction::Skip(NonZeroU8::new(*n)?), rest)),
            [Self::PREFIX] => None,
            [k, rest @ ..] => {
                let len = *k as usize * 2;
                (rest.len() >= len).then(|| (Instruction::Write(&rest[..len]), &rest[len..]))
            }
            [] => None,
        }
    }
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::RegionTransition => write!(f, "config"),
            Instruction::Skip(n) => write!(f, "skip {}", n),
            Instruction::Write(words) => {
                write!(f, "write {} {}", words.len() / 2, hex::encode_upper(words))
            }
        }
    }
}

/// Walks an opcode stream.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    stream: &'a [u8],
    offset: usize,
}

impl<'a> Instructions<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream, offset: 0 }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stream.is_empty() {
            return None;
        }
        match Instruction::decode(self.stream) {
            Some((i, rest)) => {
                self.offset += i.encoded_len();
                self.stream = rest;
                Some(Ok(i))
            }
            None => {
                self.stream = &[];
                Some(Err(DecodeError::Truncated(self.offset)))
            }
        }
    }
}

/// Header and opcode stream for one device.
#[derive(Debug, Clone)]
pub struct Script {
    buff: ArrayVec<u8, CAPACITY>,
}

impl Script {
    pub fn new(device_id: u16) -> Self {
        let mut header = [0_u8; HEADER_LEN];
        LittleEndian::write_u16(&mut header[..2], device_id);

        let mut buff = ArrayVec::new();
        buff.extend(header);
        Self { buff }
    }

    pub fn push(&mut self, instruction: &Instruction) -> Result<(), Overflow> {
        if instruction.encoded_len() > self.buff.remaining_capacity() {
            return Err(Overflow);
        }
        log::trace!("{}", instruction);

        match instruction {
            Instruction::RegionTransition => self.put(&[Instruction::PREFIX, 0]),
            Instruction::Skip(n) => self.put(&[Instruction::PREFIX, n.get()]),
            Instruction::Write(words) => {
                self.put(&[(words.len() / 2) as u8])?;
                self.put(words)
            }
        }
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        self.buff.try_extend_from_slice(bytes).map_err(|_| Overflow)
    }

    /// Appends the shortest instruction sequence for `decision`.
    pub fn emit(&mut self, decision: &Decision) -> Result<(), Overflow> {
        let (enter_config, mut skip, words) = match *decision {
            Decision::None => return Ok(()),
            Decision::Program {
                enter_config,
                skip,
                words,
            } => (enter_config, skip, words),
        };

        if enter_config {
            self.push(&Instruction::RegionTransition)?;
        }
        while let Some(n) = NonZeroU8::new(skip.min(u8::MAX as u32) as u8) {
            self.push(&Instruction::Skip(n))?;
            skip -= n.get() as u32;
        }
        for chunk in words.chunks(Instruction::MAX_WORDS * 2) {
            self.push(&Instruction::Write(chunk))?;
        }
        Ok(())
    }

    pub fn device_id(&self) -> u16 {
        LittleEndian::read_u16(&self.buff[..2])
    }

    /// Value of the script end field, zero until the image is composed.
    pub fn end(&self) -> u16 {
        LittleEndian::read_u16(&self.buff[2..HEADER_LEN])
    }

    pub(crate) fn set_end(&mut self, end: u16) {
        LittleEndian::write_u16(&mut self.buff[2..HEADER_LEN], end);
    }

    /// Header followed by the opcode stream.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buff
    }

    #[inline]
    pub fn opcodes(&self) -> &[u8] {
        &self.buff[HEADER_LEN..]
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(self.opcodes())
    }

    pub fn len(&self) -> usize {
        self.buff.len()
    }

    /// No instruction emitted yet.
    pub fn is_empty(&self) -> bool {
        self.opcodes().is_empty()
    }
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script buffer overflow, more than {} bytes", CAPACITY)
    }
}

impl std::error::Error for Overflow {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated(offset) => {
                write!(f, "truncated instruction at offset {}", offset)
            }
        }
    }
}

impl std::error::Error for DecodeError {}
