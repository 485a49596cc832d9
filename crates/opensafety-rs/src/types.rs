//! Address and primitive wire types shared across the crate.

use crate::error::Error;

pub const MIN_SADR: u16 = 1;
pub const MAX_SADR: u16 = 1023;
pub const MIN_SDN: u16 = 1;
pub const MAX_SDN: u16 = 1023;
pub const MAX_TADR: u16 = 1023;
pub const MAX_TR: u8 = 63;
pub const MAX_LE: u8 = 254;
pub const CT_UNUSED: u16 = 0;
pub const TR_UNUSED: u8 = 0;

/// 10-bit source address, 1..=1023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sadr(pub u16);

impl TryFrom<u16> for Sadr {
    type Error = Error;
    fn try_from(value: u16) -> Result<Self, Error> {
        if (MIN_SADR..=MAX_SADR).contains(&value) {
            Ok(Sadr(value))
        } else {
            Err(Error::InvalidSadr(value))
        }
    }
}

/// 10-bit target address, 1..=1023 (0 is used as "no target").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tadr(pub u16);

impl TryFrom<u16> for Tadr {
    type Error = Error;
    fn try_from(value: u16) -> Result<Self, Error> {
        if value <= MAX_TADR {
            Ok(Tadr(value))
        } else {
            Err(Error::InvalidTadr(value))
        }
    }
}

/// Safety Domain Number, 1..=1023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sdn(pub u16);

impl TryFrom<u16> for Sdn {
    type Error = Error;
    fn try_from(value: u16) -> Result<Self, Error> {
        if (MIN_SDN..=MAX_SDN).contains(&value) {
            Ok(Sdn(value))
        } else {
            Err(Error::InvalidSdn(value))
        }
    }
}

/// 6-bit time-request distinctive number, 0..=63.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tr(pub u8);

impl TryFrom<u8> for Tr {
    type Error = Error;
    fn try_from(value: u8) -> Result<Self, Error> {
        if value <= MAX_TR {
            Ok(Tr(value))
        } else {
            Err(Error::InvalidTr(value))
        }
    }
}

/// 6-byte unique device identifier.
pub type Udid = [u8; 6];

/// Wrap-tolerant tick timestamp, as produced by the host's periodic `poll`.
pub type Tick = u32;

/// `elapsed(now, deadline) == (now - deadline) < 2^31`, tolerant of `now` wrapping
/// past `u32::MAX`. Do not replace with saturating arithmetic: the wrap behaviour
/// is load-bearing for long-running hosts.
pub fn elapsed(now: Tick, deadline: Tick) -> bool {
    now.wrapping_sub(deadline) < (1u32 << 31)
}
