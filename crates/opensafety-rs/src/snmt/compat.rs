//! Request/response service compatibility matrix (C8 helper).
//!
//! A 9x9 table of which response service is a legal answer to which request
//! service. Indices follow the wire order of the SNMT service commands, each
//! already shifted right one bit (the command byte's low bit only flags
//! request-vs-response, so the lookup collapses request/response pairs onto
//! the same row/column).

use crate::snmt::services::{RequestKind, ResponseKind};

const NUM_REQ: usize = 9;
const NUM_RESP: usize = 9;

#[rustfmt::skip]
static TABLE: [[bool; NUM_RESP]; NUM_REQ] = [
    /* SnPutToPreOp    */ [true,  false, false, true,  false, false, false, false, false],
    /* SnPutToOp       */ [false, true,  false, true,  true,  false, false, false, false],
    /* ScmPutToStop    */ [false, false, false, true,  false, false, false, false, false],
    /* ScmPutToOp      */ [false, false, false, true,  false, false, false, false, false],
    /* ScmGuardSn      */ [true,  true,  false, true,  false, false, false, false, false],
    /* AssignAddSadr   */ [false, false, true,  true,  false, false, false, false, false],
    /* SnAck           */ [false, false, false, true,  false, false, false, false, false],
    /* AssignUdidScm   */ [false, false, false, true,  false, false, false, true,  false],
    /* AssignInitCt    */ [false, false, false, true,  false, false, false, false, true ],
];

/// Is `response` a legal answer to an outstanding `request`?
pub fn is_compatible(request: RequestKind, response: ResponseKind) -> bool {
    TABLE[request as usize][response as usize]
}
