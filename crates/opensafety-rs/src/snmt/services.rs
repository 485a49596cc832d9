//! SNMT service catalogue (C8 helper): the nine request kinds a master FSM
//! can issue, the nine response kinds it can receive, and the payload shape
//! of each request.
//!
//! Extended-service command byte values are the actual wire constants from
//! the openSAFETY SNMT service table; response command byte values are one
//! column index to the left of the request's masked value and are derived
//! from the compatibility table's column order together with the
//! response-command-byte range limit observed alongside it.

use crate::frame::ids;
use crate::snmt::fsm::MAX_REQUEST_PAYLOAD;
use crate::types::{Sadr, Tadr, Udid};
use crate::Error;

/// Index must match [`crate::snmt::compat`]'s row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum RequestKind {
    SnPutToPreOp = 0,
    SnPutToOp = 1,
    ScmPutToStop = 2,
    ScmPutToOp = 3,
    ScmGuardSn = 4,
    AssignAdditionalSadr = 5,
    SnAck = 6,
    AssignUdidScm = 7,
    AssignInitCt = 8,
}

/// Index must match [`crate::snmt::compat`]'s column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ResponseKind {
    SnStatusPreOp = 0,
    SnStatusOp = 1,
    AssignedAdditionalSadr = 2,
    SnFail = 3,
    SnBusy = 4,
    Reserved5 = 5,
    Reserved6 = 6,
    AssignedUdidScm = 7,
    AssignedInitCt = 8,
}

/// Extended-service request command bytes (one-bit request/response flag
/// already cleared).
pub const EXT_REQ_SN_SET_TO_PREOP: u8 = 0x00;
pub const EXT_REQ_SN_SET_TO_OP: u8 = 0x02;
pub const EXT_REQ_SCM_GUARD_SN: u8 = 0x08;
pub const EXT_REQ_ASSGN_ADD_SADR: u8 = 0x0A;
pub const EXT_REQ_SN_ACK: u8 = 0x0C;
pub const EXT_REQ_ASSGN_UDID_SCM: u8 = 0x0E;
pub const EXT_REQ_INITIALIZE_EXT_CT: u8 = 0x10;

/// Extended-service response command bytes.
pub const EXT_RESP_SN_STATUS_PREOP: u8 = 0x00;
pub const EXT_RESP_SN_STATUS_OP: u8 = 0x02;
pub const EXT_RESP_ASSIGNED_ADD_SADR: u8 = 0x04;
pub const EXT_RESP_SN_FAIL: u8 = 0x06;
pub const EXT_RESP_SN_BUSY: u8 = 0x08;
pub const EXT_RESP_ASSIGNED_UDID_SCM: u8 = 0x0E;
pub const EXT_RESP_ASSIGNED_INIT_CT: u8 = 0x10;

impl ResponseKind {
    /// Classifies a received extended-service response command byte into its
    /// [`ResponseKind`].
    pub fn from_ext_cmd(cmd: u8) -> Option<Self> {
        match cmd {
            EXT_RESP_SN_STATUS_PREOP => Some(ResponseKind::SnStatusPreOp),
            EXT_RESP_SN_STATUS_OP => Some(ResponseKind::SnStatusOp),
            EXT_RESP_ASSIGNED_ADD_SADR => Some(ResponseKind::AssignedAdditionalSadr),
            EXT_RESP_SN_FAIL => Some(ResponseKind::SnFail),
            EXT_RESP_SN_BUSY => Some(ResponseKind::SnBusy),
            EXT_RESP_ASSIGNED_UDID_SCM => Some(ResponseKind::AssignedUdidScm),
            EXT_RESP_ASSIGNED_INIT_CT => Some(ResponseKind::AssignedInitCt),
            _ => None,
        }
    }
}

/// A request payload, built and ready to hand to the frame codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPayload {
    buf: [u8; MAX_REQUEST_PAYLOAD],
    len: u8,
}

impl RequestPayload {
    fn empty() -> Self {
        RequestPayload {
            buf: [0u8; MAX_REQUEST_PAYLOAD],
            len: 0,
        }
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let mut p = RequestPayload::empty();
        p.buf[..bytes.len()].copy_from_slice(bytes);
        p.len = bytes.len() as u8;
        p
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

/// `1 ≤ sadr ≤ 1023`, already enforced by [`Sadr::try_from`]; this is the
/// additional range the data model names for the TxSPDO number: `2..=1023`
/// (0 and 1 are reserved).
pub fn validate_spdo_number(spdo_number: u16) -> Result<(), Error> {
    if (2..=1023).contains(&spdo_number) {
        Ok(())
    } else {
        Err(Error::InvalidSpdoNumber(spdo_number))
    }
}

/// Request UDID (frame-type `UDID_REQ`, no extended command, empty payload).
pub fn request_udid() -> (u8, RequestPayload) {
    (ids::SNMT_REQUEST_UDID, RequestPayload::empty())
}

/// Assign SADR (frame-type `ASS_SADR`, no extended command, 6-byte UDID of
/// the target).
pub fn assign_sadr(target_udid: Udid) -> (u8, RequestPayload) {
    (ids::SNMT_ASSIGN_SADR, RequestPayload::from_bytes(&target_udid))
}

/// Assign UDID of SCM (extended service, 6-byte SCM UDID).
pub fn assign_udid_scm(scm_udid: Udid) -> (u8, RequestPayload) {
    let mut bytes = [0u8; 7];
    bytes[0] = EXT_REQ_ASSGN_UDID_SCM;
    bytes[1..7].copy_from_slice(&scm_udid);
    (ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes))
}

/// Initialize the 40-bit extended consecutive time (extended service,
/// 5-byte initial CT: only the low 40 bits of `initial_ct` are meaningful).
pub fn initialize_ct(initial_ct: u64) -> (u8, RequestPayload) {
    let le = initial_ct.to_le_bytes();
    let mut bytes = [0u8; 6];
    bytes[0] = EXT_REQ_INITIALIZE_EXT_CT;
    bytes[1..6].copy_from_slice(&le[..5]);
    (ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes))
}

/// Assign an additional SADR to an already-addressed SN (extended service,
/// 2-byte SADR + 2-byte TxSPDO number). Fails if `spdo_number` is outside
/// `2..=1023`.
pub fn assign_additional_sadr(additional_sadr: Sadr, spdo_number: u16) -> Result<(u8, RequestPayload), Error> {
    validate_spdo_number(spdo_number)?;
    let mut bytes = [0u8; 5];
    bytes[0] = EXT_REQ_ASSGN_ADD_SADR;
    bytes[1..3].copy_from_slice(&additional_sadr.0.to_le_bytes());
    bytes[3..5].copy_from_slice(&spdo_number.to_le_bytes());
    Ok((ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes)))
}

/// Node guarding (extended service, empty payload).
pub fn guard_sn() -> (u8, RequestPayload) {
    let bytes = [EXT_REQ_SCM_GUARD_SN];
    (ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes))
}

/// Transition to OP (extended service, 4-byte parameter timestamp).
pub fn transition_to_op(parameter_timestamp: u32) -> (u8, RequestPayload) {
    let mut bytes = [0u8; 5];
    bytes[0] = EXT_REQ_SN_SET_TO_OP;
    bytes[1..5].copy_from_slice(&parameter_timestamp.to_le_bytes());
    (ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes))
}

/// Transition to pre-OP (extended service, empty payload).
pub fn transition_to_preop() -> (u8, RequestPayload) {
    let bytes = [EXT_REQ_SN_SET_TO_PREOP];
    (ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes))
}

/// SN error acknowledge (extended service, 1-byte error group + 1-byte error
/// code).
pub fn sn_error_ack(error_group: u8, error_code: u8) -> (u8, RequestPayload) {
    let bytes = [EXT_REQ_SN_ACK, error_group, error_code];
    (ids::SNMT_SERVICE_REQUEST, RequestPayload::from_bytes(&bytes))
}

/// Wire target address for a request (`tadr`). SNMT requests unicast to the
/// SN's own SADR; the reply's `tadr` is expected to echo the SCM's main SADR.
pub fn request_tadr(target: Sadr) -> Tadr {
    Tadr(target.0)
}
