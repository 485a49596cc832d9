//! Multi-tick integration scenarios against the public [`ScmCore`] API,
//! mirroring the six concrete scenarios in spec.md §8.

use opensafety_rs::frame::{ids, FrmHdr};
use opensafety_rs::sod::{Attributes, ObjectRef, SafetyObjectDictionary, SodErrorResult, OBJ_SCM_MAIN_SADR, OBJ_OWN_SDN};
use opensafety_rs::snmt::Completion;
use opensafety_rs::transport::{SafetyTransport, TxHandle};
use opensafety_rs::{Error, ScmCallbacks, ScmCore, Sadr, Tadr, Tr};

struct FakeTransport {
    buf: Vec<u8>,
    sent: Vec<Vec<u8>>,
}

impl FakeTransport {
    fn new() -> Self {
        FakeTransport {
            buf: vec![0u8; 256],
            sent: Vec::new(),
        }
    }
}

impl SafetyTransport for FakeTransport {
    fn acquire_tx_buffer(&mut self, len: usize) -> Result<(TxHandle, &mut [u8]), Error> {
        if self.buf.len() < len {
            return Err(Error::BufferTooShort);
        }
        Ok((TxHandle(0), &mut self.buf[..len]))
    }
    fn mark_ready(&mut self, _handle: TxHandle, len: usize) -> Result<(), Error> {
        self.sent.push(self.buf[..len].to_vec());
        Ok(())
    }
}

struct FakeSod {
    own_sdn: u16,
    scm_main_sadr: u16,
    timeout: u32,
    retries: u8,
}

impl SafetyObjectDictionary for FakeSod {
    fn attr_get(&self, _obj: ObjectRef) -> Result<Attributes, SodErrorResult> {
        Ok(Attributes::default())
    }
    fn read_u8(&self, _obj: ObjectRef) -> Result<u8, SodErrorResult> {
        Ok(self.retries)
    }
    fn read_u16(&self, obj: ObjectRef) -> Result<u16, SodErrorResult> {
        if obj == OBJ_SCM_MAIN_SADR {
            Ok(self.scm_main_sadr)
        } else if obj == OBJ_OWN_SDN {
            Ok(self.own_sdn)
        } else {
            unimplemented!()
        }
    }
    fn read_u32(&self, _obj: ObjectRef) -> Result<u32, SodErrorResult> {
        Ok(self.timeout)
    }
    fn read_bytes(&self, _obj: ObjectRef, _out: &mut [u8]) -> Result<(), SodErrorResult> {
        unimplemented!()
    }
    fn write(&mut self, _obj: ObjectRef, _value: &[u8], _overwrite: bool) -> Result<(), SodErrorResult> {
        unimplemented!()
    }
}

#[derive(Default)]
struct RecordingSignal;

impl opensafety_rs::diag::ErrorSignal for RecordingSignal {
    fn on_error(&mut self, _code: opensafety_rs::ErrorCode, _additional_info: u32) {}
}

#[derive(Default)]
struct RecordingCallbacks {
    completions: Vec<Completion>,
    reset_guards: u32,
}

impl ScmCallbacks for RecordingCallbacks {
    fn on_completion(&mut self, completion: Completion) {
        self.completions.push(completion);
    }
    fn on_reset_guard(&mut self) {
        self.reset_guards += 1;
    }
}

fn make_core<const N: usize>(
    own_sdn: u16,
    scm_main_sadr: u16,
    timeout: u32,
    retries: u8,
) -> ScmCore<N, FakeTransport, FakeSod, RecordingCallbacks, RecordingSignal> {
    let sod = FakeSod {
        own_sdn,
        scm_main_sadr,
        timeout,
        retries,
    };
    ScmCore::new(FakeTransport::new(), sod, RecordingCallbacks::default(), RecordingSignal).unwrap()
}

/// Scenario 1: successful UDID request, N=1, regnum correlates the callback.
#[test]
fn scenario_successful_udid_request() {
    let mut core = make_core::<1>(1, 1, 100, 2);
    let reg = core.request_udid(Sadr(5), 0).unwrap();

    let response_header = FrmHdr {
        adr: Sadr(5),
        id: ids::SNMT_RESPONSE_UDID,
        sdn: opensafety_rs::DomainNumber(1),
        ct: 0,
        tadr: Tadr(1),
        tr: Tr(0),
        ext_ct: None,
    };
    core.on_frame_received(&response_header, &[0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6]);

    assert_eq!(core.callbacks().completions.len(), 1);
    let completion = &core.callbacks().completions[0];
    assert_eq!(completion.regnum, reg.0);
    assert_eq!(completion.tadr, Tadr(5));
    assert_eq!(completion.payload.as_deref(), Some([0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6].as_slice()));
    assert!(!completion.timeout);
}

/// Scenario 2: two concurrent Assign-SADR requests to the same target SADR,
/// reclaimed by UDID content rather than by address.
#[test]
fn scenario_assign_sadr_identity_match() {
    let mut core = make_core::<2>(1, 1, 100, 2);
    core.assign_sadr(Sadr(10), [0x01, 0x02, 0x03, 0x04, 0x05, 0x06], 0).unwrap();
    let reg2 = core.assign_sadr(Sadr(10), [0x11, 0x12, 0x13, 0x14, 0x15, 0x16], 0).unwrap();

    let response_header = FrmHdr {
        adr: Sadr(10),
        id: ids::SNMT_SADR_ASSIGNED,
        sdn: opensafety_rs::DomainNumber(1),
        ct: 0,
        tadr: Tadr(1),
        tr: Tr(0),
        ext_ct: None,
    };
    core.on_frame_received(&response_header, &[0x11, 0x12, 0x13, 0x14, 0x15, 0x16]);

    assert_eq!(core.callbacks().completions.len(), 1);
    assert_eq!(core.callbacks().completions[0].regnum, reg2.0);
    // The first slot (UDID [01..06]) is still waiting.
    assert!(core.pool().find_free() == opensafety_rs::snmt::fsm::INVALID_SLOT);
}

/// Scenario 3: two retries then a success; retry count observed is 2.
#[test]
fn scenario_retry_then_success() {
    let mut core = make_core::<1>(1, 1, 100, 2);
    core.request_udid(Sadr(5), 0).unwrap();

    let mut free = 10u8;
    for t in [100u32, 200] {
        core.poll(t, &mut free).unwrap();
    }
    assert_eq!(core.pool().slot(0).retry_count(), 2);
    assert_eq!(core.callbacks().completions.len(), 0);

    let response_header = FrmHdr {
        adr: Sadr(5),
        id: ids::SNMT_RESPONSE_UDID,
        sdn: opensafety_rs::DomainNumber(1),
        ct: 0,
        tadr: Tadr(1),
        tr: Tr(0),
        ext_ct: None,
    };
    core.on_frame_received(&response_header, &[0u8; 6]);
    assert_eq!(core.callbacks().completions.len(), 1);
    assert!(!core.callbacks().completions[0].timeout);
}

/// Scenario 4: no reply ever arrives; timeout fires once after three
/// transmissions (original + two retries), counters read 2 and 1.
#[test]
fn scenario_timeout_after_exhaustion() {
    let mut core = make_core::<1>(1, 1, 100, 2);
    core.request_udid(Sadr(5), 0).unwrap();

    let mut free = 10u8;
    for t in [100u32, 200, 300] {
        core.poll(t, &mut free).unwrap();
    }
    core.poll(400, &mut free).unwrap();

    assert_eq!(core.callbacks().completions.len(), 1);
    assert!(core.callbacks().completions[0].timeout);
    assert_eq!(core.diag().acyclic_counters(Sadr(5)).retry, 2);
    assert_eq!(core.diag().acyclic_counters(Sadr(5)).timeout, 1);
    assert!(core.pool().find_free() != opensafety_rs::snmt::fsm::INVALID_SLOT);
}

/// Scenario 5: a corrupted CRC-ONE bit on a long frame is rejected; no slot
/// state changes.
#[test]
fn scenario_crc_mismatch_is_rejected() {
    use opensafety_rs::frame::{deserialize, serialize};
    use opensafety_rs::DomainNumber;

    let header = FrmHdr {
        adr: Sadr(42),
        id: ids::SSDO_SERVICE_REQUEST,
        sdn: DomainNumber::try_from(7).unwrap(),
        ct: 0,
        tadr: Tadr(99),
        tr: Tr(3),
        ext_ct: None,
    };
    let payload: Vec<u8> = (0..9u8).collect();
    let mut buf = [0u8; 64];
    let udid = [0u8; 6];
    let n = serialize(&header, &payload, udid, &mut buf).unwrap();
    buf[n - 1] ^= 0x01;

    let result = deserialize(&buf[..n], false, udid, DomainNumber::try_from(7).unwrap());
    assert_eq!(result, Err(Error::Crc1Mismatch));
}

/// Scenario 6: slim SSDO round-trip, single payload copy only.
#[test]
fn scenario_slim_ssdo_roundtrip() {
    use opensafety_rs::frame::{deserialize, serialize, wire_len};
    use opensafety_rs::DomainNumber;

    let header = FrmHdr {
        adr: Sadr(10),
        id: ids::SSDO_SERVICE_REQUEST_FAST,
        sdn: DomainNumber::try_from(3).unwrap(),
        ct: 0,
        tadr: Tadr(0),
        tr: Tr(0),
        ext_ct: None,
    };
    let payload: Vec<u8> = (0..32u8).collect();
    let mut buf = [0u8; 64];
    let udid = [0x11; 6];
    let n = serialize(&header, &payload, udid, &mut buf).unwrap();

    assert_eq!(n, 9 + 32 + 2 * 2);
    assert_eq!(n, wire_len(payload.len(), true));

    let decoded = deserialize(&buf[..n], true, udid, DomainNumber::try_from(3).unwrap()).unwrap();
    assert_eq!(decoded.header, header);
    assert_eq!(decoded.payload, payload);
}
