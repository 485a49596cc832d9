//! Safety Domain Number gate (C4): a cached, validated view of SOD 0x1200/0x01.

use crate::error::Error;
use crate::sod::{SafetyObjectDictionary, OBJ_OWN_SDN};
use crate::types::Sdn;

/// Caches the own-instance SDN so every other component reads it in O(1)
/// instead of round-tripping through the SOD on every frame.
pub struct SdnGate {
    sdn: Sdn,
}

impl SdnGate {
    /// Resolves SOD 0x1200/0x01. Fails if the before-read attribute is set on
    /// that object — it is reserved and illegal here — or if the SOD access or
    /// the value itself is invalid.
    pub fn init<O: SafetyObjectDictionary>(sod: &O) -> Result<Self, Error> {
        let attrs = sod.attr_get(OBJ_OWN_SDN).map_err(|_| Error::SodAccessFailed)?;
        if attrs.before_read {
            return Err(Error::SdnAttributeInvalid);
        }
        let raw = sod.read_u16(OBJ_OWN_SDN).map_err(|_| Error::SodAccessFailed)?;
        let sdn = Sdn::try_from(raw)?;
        Ok(SdnGate { sdn })
    }

    pub fn get(&self) -> Sdn {
        self.sdn
    }

    /// Writes through to the SOD with override semantics, then updates the
    /// cache only after the write succeeds.
    pub fn set<O: SafetyObjectDictionary>(&mut self, sod: &mut O, value: Sdn) -> Result<(), Error> {
        sod.write(OBJ_OWN_SDN, &value.0.to_le_bytes(), true)
            .map_err(|_| Error::SodAccessFailed)?;
        self.sdn = value;
        Ok(())
    }
}
