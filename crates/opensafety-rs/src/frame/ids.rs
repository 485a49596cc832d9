//! The 6-bit openSAFETY frame identifier space: the legal-id lookup table, the
//! "slim SSDO" predicate, and the "SPDO data-only" predicate used by the codec.

/// SNMT: UDID discovery, SADR assignment, generic service request/response,
/// reset-guarding broadcast.
pub const SNMT_REQUEST_UDID: u8 = 0x28;
pub const SNMT_RESPONSE_UDID: u8 = 0x29;
pub const SNMT_ASSIGN_SADR: u8 = 0x2A;
pub const SNMT_SADR_ASSIGNED: u8 = 0x2B;
pub const SNMT_SERVICE_REQUEST: u8 = 0x2C;
pub const SNMT_SERVICE_RESPONSE: u8 = 0x2D;
pub const SNMT_SN_RESET_GUARDING_SCM: u8 = 0x2F;

/// SPDO data-only frame, base id; the low 3 bits carry the connection-valid
/// variant (0x30..=0x35).
pub const SPDO_DATA_ONLY: u8 = 0x30;
const SPDO_CONN_VALID_MASK: u8 = 0x07;
/// Only 6 of the 8 values the 3-bit connection-valid field can hold are
/// legal frame ids (`0x30..=0x35`); `0x36`/`0x37` are reserved.
const SPDO_CONN_VALID_MAX_LEGAL: u8 = 0x05;

/// SSDO acyclic service channel, normal and "fast"/slim variants.
pub const SSDO_SERVICE_REQUEST: u8 = 0x38;
pub const SSDO_SERVICE_RESPONSE: u8 = 0x39;
pub const SSDO_SERVICE_REQUEST_FAST: u8 = 0x3A;
pub const SSDO_SERVICE_RESPONSE_FAST: u8 = 0x3B;

const fn build_lookup() -> [bool; 64] {
    let mut table = [false; 64];
    table[SNMT_REQUEST_UDID as usize] = true;
    table[SNMT_RESPONSE_UDID as usize] = true;
    table[SNMT_ASSIGN_SADR as usize] = true;
    table[SNMT_SADR_ASSIGNED as usize] = true;
    table[SNMT_SERVICE_REQUEST as usize] = true;
    table[SNMT_SERVICE_RESPONSE as usize] = true;
    table[SNMT_SN_RESET_GUARDING_SCM as usize] = true;
    let mut variant = 0u8;
    while variant <= SPDO_CONN_VALID_MAX_LEGAL {
        table[(SPDO_DATA_ONLY | variant) as usize] = true;
        variant += 1;
    }
    table[SSDO_SERVICE_REQUEST as usize] = true;
    table[SSDO_SERVICE_RESPONSE as usize] = true;
    table[SSDO_SERVICE_REQUEST_FAST as usize] = true;
    table[SSDO_SERVICE_RESPONSE_FAST as usize] = true;
    table
}

static LOOKUP: [bool; 64] = build_lookup();

/// Whether `id` (a 6-bit value; caller guarantees `id < 64`) is one of the
/// enumerated legal frame identifiers.
pub fn is_legal(id: u8) -> bool {
    (id as usize) < LOOKUP.len() && LOOKUP[id as usize]
}

/// Frame-type group test: is `id` part of the SNMT group (`id & 0x38 == 0x28`)?
pub fn is_snmt(id: u8) -> bool {
    (id & 0x38) == 0x28
}

/// "Slim SSDO": payload carried in sub-frame ONE only, per `id & 0x3A == 0x3A`.
pub fn is_slim_ssdo(id: u8) -> bool {
    (id & 0x3A) == 0x3A
}

/// SPDO "data-only" frame family, the only one eligible for the optional
/// 40-bit extended consecutive time. Tests the full 3-bit connection-valid
/// mask, including the two reserved variants `is_legal` already rejects, so
/// callers must check `is_legal` first.
pub fn is_spdo_data_only(id: u8) -> bool {
    (id & !SPDO_CONN_VALID_MASK) == SPDO_DATA_ONLY
}
