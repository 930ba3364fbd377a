use core::fmt;

use crate::device::Profile;
use crate::record::{Record, RecordType};

/// Word address bit set by an extended linear address of 1, i.e. byte
/// address 0x10000.
const HIGH_ADDRESS: u16 = 0x8000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TranslateError {
    MisalignedAddress(u16),
    OutOfRange(u16),
    OutOfProgramMemory(u16),
    NonMonotonicAddress { address: u16, current: u32 },
    EmptyDataRecord,
    UnsupportedExtendedAddress,
    UnsupportedRecordType(u8),
}

/// What the script has to do for one record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision<'a> {
    /// Nothing to emit.
    None,
    Program {
        /// First record at or above the config region start.
        enter_config: bool,
        /// Words to skip before writing.
        skip: u32,
        /// Whole words of payload, two bytes each.
        words: &'a [u8],
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Translator {
    profile: &'static Profile,
    current: u32,
    high: u16,
}

impl Translator {
    pub fn new(profile: &'static Profile) -> Self {
        Self {
            profile,
            current: 0,
            high: 0,
        }
    }

    #[inline]
    pub fn profile(&self) -> &'static Profile {
        self.profile
    }

    /// Word address the next write lands on.
    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn high_address(&self) -> u16 {
        self.high
    }

    pub fn translate<'a>(&mut self, record: &'a Record) -> Result<Decision<'a>, TranslateError> {
        match record.kind() {
            Some(RecordType::Data) => self.data(record),
            Some(RecordType::EndOfFile) => Ok(Decision::None),
            Some(RecordType::ExtendedLinearAddress) => {
                self.linear_address(record)?;
                Ok(Decision::None)
            }
            None => Err(TranslateError::UnsupportedRecordType(record.record_type())),
        }
    }

    fn linear_address(&mut self, record: &Record) -> Result<(), TranslateError> {
        if record.byte_count() != 2 || record.address() != 0 {
            return Err(TranslateError::UnsupportedExtendedAddress);
        }
        // only the first 0x1FFFF bytes are reachable
        self.high = match record.payload() {
            [0, 0] => 0,
            [0, 1] => HIGH_ADDRESS,
            _ => return Err(TranslateError::UnsupportedExtendedAddress),
        };
        log::trace!("extended linear address, high {:#06x}", self.high);
        Ok(())
    }

    fn data<'a>(&mut self, record: &'a Record) -> Result<Decision<'a>, TranslateError> {
        if record.address() & 1 != 0 {
            return Err(TranslateError::MisalignedAddress(record.address()));
        }
        let address = (record.address() >> 1) | self.high;
        let p = self.profile;

        if address >= p.address_space_limit {
            return Err(TranslateError::OutOfRange(address));
        }

        let mut enter_config = false;
        if address >= p.config_region_start {
            if self.current < p.config_region_start as u32 {
                enter_config = true;
                self.current = p.config_region_start as u32;
            }
        } else if address >= p.program_memory_limit {
            return Err(TranslateError::OutOfProgramMemory(address));
        }

        if (address as u32) < self.current {
            return Err(TranslateError::NonMonotonicAddress {
                address,
                current: self.current,
            });
        }

        let count = record.payload().len() / 2;
        if count == 0 {
            return Err(TranslateError::EmptyDataRecord);
        }
        let words = &record.payload()[..count * 2];

        let skip = address as u32 - self.current;
        self.current = address as u32 + count as u32;

        Ok(Decision::Program {
            enter_config,
            skip,
            words,
        })
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::MisalignedAddress(a) => {
                write!(f, "new address can not be odd ({:#06x})", a)
            }
            TranslateError::OutOfRange(a) => write!(f, "address out of range ({:#06x})", a),
            TranslateError::OutOfProgramMemory(a) => {
                write!(f, "address out of program memory ({:#06x})", a)
            }
            TranslateError::NonMonotonicAddress { address, current } => write!(
                f,
                "new address {:#06x} is lower than current {:#06x}",
                address, current
            ),
            TranslateError::EmptyDataRecord => write!(f, "invalid data length"),
            TranslateError::UnsupportedExtendedAddress => {
                write!(f, "extended linear address not supported, addresses > $1FFFF")
            }
            TranslateError::UnsupportedRecordType(t) => {
                write!(f, "unknown record type {:#04x}", t)
            }
        }
    }
}

impl std::error::Error for TranslateError {}
