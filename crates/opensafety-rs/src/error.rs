//! Error taxonomy and packed error codes (C3: error/statistics engine).

use core::fmt;

/// Severity tier of an error, matching the openSAFETY three-tier taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Contract violation; the host is expected to route to a safe state.
    Fatal,
    /// Wire or protocol anomaly; the offending frame/slot is dropped, the core continues.
    Minor,
    /// Reserved-field or soft-reject anomaly; logged and counted, no behavioural change.
    Info,
}

/// The unit that raised an error, used for the packed error-code layout and for
/// routing a code to its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Unit {
    Copy = 0,
    Crc = 1,
    Diag = 2,
    Sdn = 3,
    Sod = 4,
    Frame = 5,
    SnmtFsm = 6,
    SnmtDispatcher = 7,
    Scm = 8,
}

/// 16-bit packed error code: bit 15 type, bits 14..12 class, bits 11..7 unit id,
/// bits 6..0 sub-code. Numeric identity is preserved across `pack`/`unpack` so a
/// host log line recorded today still decodes correctly after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub class: ErrorClass,
    pub unit: Unit,
    pub subcode: u8,
}

impl ErrorCode {
    pub const fn new(class: ErrorClass, unit: Unit, subcode: u8) -> Self {
        ErrorCode {
            class,
            unit,
            subcode: subcode & 0x7F,
        }
    }

    /// Packs into the 16-bit wire-compatible layout.
    pub fn pack(self) -> u16 {
        let type_bit: u16 = match self.class {
            ErrorClass::Fatal => 1,
            _ => 0,
        };
        let class_bits: u16 = match self.class {
            ErrorClass::Fatal => 0b001,
            ErrorClass::Minor => 0b010,
            ErrorClass::Info => 0b100,
        };
        let unit_bits = (self.unit as u16) & 0x1F;
        let sub = self.subcode as u16 & 0x7F;
        (type_bit << 15) | (class_bits << 12) | (unit_bits << 7) | sub
    }

    pub fn unpack(word: u16) -> Self {
        let class_bits = (word >> 12) & 0x7;
        let class = match class_bits {
            0b001 => ErrorClass::Fatal,
            0b100 => ErrorClass::Info,
            _ => ErrorClass::Minor,
        };
        let unit_bits = ((word >> 7) & 0x1F) as u8;
        let unit = match unit_bits {
            0 => Unit::Copy,
            1 => Unit::Crc,
            2 => Unit::Diag,
            3 => Unit::Sdn,
            4 => Unit::Sod,
            5 => Unit::Frame,
            6 => Unit::SnmtFsm,
            7 => Unit::SnmtDispatcher,
            _ => Unit::Scm,
        };
        ErrorCode {
            class,
            unit,
            subcode: (word & 0x7F) as u8,
        }
    }

    /// Short diagnostic string for logs. Not exhaustive of every sub-code, only of
    /// the ones this crate emits.
    pub fn description(self) -> &'static str {
        match (self.unit, self.subcode) {
            (Unit::Copy, 1) => "unsupported value type in copy kernel",
            (Unit::Sdn, 1) => "SDN object accessed with illegal before-read attribute",
            (Unit::Frame, 1) => "frame header field out of range",
            (Unit::Frame, 2) => "sub-frame CRC mismatch",
            (Unit::Frame, 3) => "sub-frame ONE/TWO disagreement",
            (Unit::Frame, 4) => "unknown frame id",
            (Unit::SnmtFsm, 1) => "FSM event invalid for current state",
            (Unit::SnmtFsm, 2) => "no response received before retry budget exhausted",
            (Unit::SnmtDispatcher, 1) => "no FSM slot available",
            (Unit::SnmtDispatcher, 2) => "response not assigned to any waiting slot",
            (Unit::SnmtDispatcher, 3) => "response destination does not match own SADR",
            (Unit::SnmtDispatcher, 4) => "TxSPDO number outside legal range",
            (Unit::SnmtDispatcher, 5) => "reserved field (TR or CT) was non-zero",
            (Unit::Sod, 1) => "SOD access failed",
            _ => "unclassified openSAFETY core error",
        }
    }
}

/// Errors surfaced by the public API of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    BufferTooShort,
    InvalidSadr(u16),
    InvalidSdn(u16),
    InvalidTadr(u16),
    InvalidTr(u8),
    InvalidLe(u8),
    InvalidFrameId(u8),
    Crc1Mismatch,
    Crc2Mismatch,
    SubFrameIdMismatch,
    SubFramePayloadMismatch,
    LengthMismatch,
    UnsupportedValueType,
    SdnAttributeInvalid,
    SodAccessFailed,
    ObjectNotFound,
    PoolExhausted,
    FsmEventInvalid,
    NoResponseReceived,
    ResponseNotAssigned,
    WrongDestination,
    InvalidSpdoNumber(u16),
    /// A received SNMT response carried a non-zero value in a reserved field
    /// (`TR` or `CT`). Counted and logged; the frame is still accepted.
    ReservedFieldNonZero,
}

impl Error {
    pub fn class(self) -> ErrorClass {
        match self {
            Error::InvalidSadr(_)
            | Error::InvalidSdn(_)
            | Error::InvalidTadr(_)
            | Error::InvalidTr(_)
            | Error::InvalidLe(_)
            | Error::InvalidFrameId(_)
            | Error::Crc1Mismatch
            | Error::Crc2Mismatch
            | Error::SubFrameIdMismatch
            | Error::SubFramePayloadMismatch
            | Error::LengthMismatch
            | Error::NoResponseReceived
            | Error::ResponseNotAssigned
            | Error::WrongDestination
            | Error::InvalidSpdoNumber(_) => ErrorClass::Minor,
            Error::BufferTooShort
            | Error::UnsupportedValueType
            | Error::SdnAttributeInvalid
            | Error::SodAccessFailed
            | Error::ObjectNotFound
            | Error::PoolExhausted
            | Error::FsmEventInvalid => ErrorClass::Fatal,
            Error::ReservedFieldNonZero => ErrorClass::Info,
        }
    }

    pub fn code(self) -> ErrorCode {
        let (unit, subcode) = match self {
            Error::UnsupportedValueType => (Unit::Copy, 1),
            Error::SdnAttributeInvalid => (Unit::Sdn, 1),
            Error::InvalidSadr(_)
            | Error::InvalidSdn(_)
            | Error::InvalidTadr(_)
            | Error::InvalidTr(_)
            | Error::InvalidLe(_)
            | Error::BufferTooShort
            | Error::LengthMismatch => (Unit::Frame, 1),
            Error::Crc1Mismatch | Error::Crc2Mismatch => (Unit::Frame, 2),
            Error::SubFrameIdMismatch | Error::SubFramePayloadMismatch => (Unit::Frame, 3),
            Error::InvalidFrameId(_) => (Unit::Frame, 4),
            Error::FsmEventInvalid => (Unit::SnmtFsm, 1),
            Error::NoResponseReceived => (Unit::SnmtFsm, 2),
            Error::PoolExhausted => (Unit::SnmtDispatcher, 1),
            Error::ResponseNotAssigned => (Unit::SnmtDispatcher, 2),
            Error::WrongDestination => (Unit::SnmtDispatcher, 3),
            Error::InvalidSpdoNumber(_) => (Unit::SnmtDispatcher, 4),
            Error::ReservedFieldNonZero => (Unit::SnmtDispatcher, 5),
            Error::SodAccessFailed | Error::ObjectNotFound => (Unit::Sod, 1),
        };
        ErrorCode::new(self.class(), unit, subcode)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooShort => write!(f, "buffer too short"),
            Error::InvalidSadr(v) => write!(f, "invalid SADR: {v}"),
            Error::InvalidSdn(v) => write!(f, "invalid SDN: {v}"),
            Error::InvalidTadr(v) => write!(f, "invalid TADR: {v}"),
            Error::InvalidTr(v) => write!(f, "invalid TR: {v}"),
            Error::InvalidLe(v) => write!(f, "invalid LE: {v}"),
            Error::InvalidFrameId(v) => write!(f, "invalid frame id: {v:#04x}"),
            Error::Crc1Mismatch => write!(f, "sub-frame ONE CRC mismatch"),
            Error::Crc2Mismatch => write!(f, "sub-frame TWO CRC mismatch"),
            Error::SubFrameIdMismatch => write!(f, "sub-frame ONE/TWO id disagreement"),
            Error::SubFramePayloadMismatch => write!(f, "sub-frame ONE/TWO payload disagreement"),
            Error::LengthMismatch => write!(f, "frame length does not match LE field"),
            Error::UnsupportedValueType => write!(f, "unsupported value type"),
            Error::SdnAttributeInvalid => write!(f, "SDN object has illegal before-read attribute"),
            Error::SodAccessFailed => write!(f, "SOD access failed"),
            Error::ObjectNotFound => write!(f, "SOD object not found"),
            Error::PoolExhausted => write!(f, "no FSM slot available"),
            Error::FsmEventInvalid => write!(f, "FSM event invalid for current state"),
            Error::NoResponseReceived => write!(f, "no response received before retry budget exhausted"),
            Error::ResponseNotAssigned => write!(f, "response not assigned to any waiting slot"),
            Error::WrongDestination => write!(f, "response destination does not match own SADR"),
            Error::InvalidSpdoNumber(v) => write!(f, "invalid TxSPDO number: {v}"),
            Error::ReservedFieldNonZero => write!(f, "reserved field (TR or CT) was non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
