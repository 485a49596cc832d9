//! The openSAFETY frame header (FRM_HDR).

use crate::error::Error;
use crate::frame::ids;
use crate::types::{Sadr, Sdn, Tadr, Tr, MAX_LE};

/// Logical frame header, independent of its dual-sub-frame wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrmHdr {
    pub adr: Sadr,
    pub id: u8,
    pub sdn: Sdn,
    pub ct: u16,
    pub tadr: Tadr,
    pub tr: Tr,
    /// Bits 16..39 of a 40-bit extended consecutive time; only meaningful (and
    /// only ever present) on SPDO "data-only" frames.
    pub ext_ct: Option<u32>,
}

/// Validates every header field against its legal range, per the wire-format
/// contract. Any violation is fatal: the caller has broken the contract, not
/// merely observed a noisy wire.
pub fn validate(header: &FrmHdr, payload_len: usize) -> Result<(), Error> {
    if !ids::is_legal(header.id) {
        return Err(Error::InvalidFrameId(header.id));
    }
    if payload_len > MAX_LE as usize {
        return Err(Error::InvalidLe(payload_len as u8));
    }
    Ok(())
}
