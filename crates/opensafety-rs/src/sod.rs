//! Safety Object Dictionary access contract (C5) — consumed only. No storage
//! backend is implemented in this crate; hosts provide one by implementing
//! [`SafetyObjectDictionary`].

use crate::error::ErrorCode;

/// Identifies a single SOD entry, optionally a sub-range of a segmented entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef {
    pub index: u16,
    pub sub_index: u8,
    pub segment_offset: u32,
    pub segment_size: u32,
}

impl ObjectRef {
    pub const fn whole(index: u16, sub_index: u8) -> Self {
        ObjectRef {
            index,
            sub_index,
            segment_offset: 0,
            segment_size: 0,
        }
    }
}

/// Own Safety Domain Number (0x1200/0x01).
pub const OBJ_OWN_SDN: ObjectRef = ObjectRef::whole(0x1200, 0x01);
/// Main SADR of the SCM that owns this domain (0x1200/0x02).
pub const OBJ_SCM_MAIN_SADR: ObjectRef = ObjectRef::whole(0x1200, 0x02);
/// UDID of the SCM, 6 octets; must not carry the before-read attribute (0x1200/0x04).
pub const OBJ_SCM_UDID: ObjectRef = ObjectRef::whole(0x1200, 0x04);
/// SNMT master response timeout, ticks (0x1202/0x01).
pub const OBJ_SNMT_TIMEOUT: ObjectRef = ObjectRef::whole(0x1202, 0x01);
/// SNMT master retry budget (0x1202/0x02).
pub const OBJ_SNMT_RETRIES: ObjectRef = ObjectRef::whole(0x1202, 0x02);

/// Access attributes consulted by the components in this crate before they
/// trust a value read from the SOD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attributes {
    pub before_read: bool,
    pub before_write: bool,
    pub range_check: bool,
    pub length_check: bool,
    pub overridable: bool,
}

/// SDO-style abort code returned alongside an error when a write is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortCode(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SodErrorResult {
    pub error: ErrorCode,
    pub abort: AbortCode,
}

/// Uniform read/write interface the core consumes. Implementations own the
/// actual storage (RAM-backed, flash-backed, whatever the host needs); this
/// crate never persists or allocates SOD-backing memory itself.
pub trait SafetyObjectDictionary {
    fn attr_get(&self, obj: ObjectRef) -> Result<Attributes, SodErrorResult>;
    fn read_u8(&self, obj: ObjectRef) -> Result<u8, SodErrorResult>;
    fn read_u16(&self, obj: ObjectRef) -> Result<u16, SodErrorResult>;
    fn read_u32(&self, obj: ObjectRef) -> Result<u32, SodErrorResult>;
    fn read_bytes(&self, obj: ObjectRef, out: &mut [u8]) -> Result<(), SodErrorResult>;
    fn write(&mut self, obj: ObjectRef, value: &[u8], overwrite: bool) -> Result<(), SodErrorResult>;
}
