//! SNMT master dispatcher (C8): per-service request builders, response
//! routing, and the periodic sweep.

use alloc::vec::Vec;

use crate::diag::{DiagManager, ErrorSignal};
use crate::error::Error;
use crate::frame::{ids, FrmHdr};
use crate::sdn::SdnGate;
use crate::snmt::compat::is_compatible;
use crate::snmt::fsm::{Completion, FsmPool, TimeoutOutcome, INVALID_SLOT};
use crate::snmt::services::{self, RequestKind, RequestPayload, ResponseKind};
use crate::sod::{SafetyObjectDictionary, OBJ_SCM_MAIN_SADR};
use crate::transport::SafetyTransport;
use crate::types::{Sadr, Tadr, Tick, Tr, Udid};

/// Monotonically increasing registration number handed back to callers so
/// they can correlate a completion callback with the request that started
/// it. Owned by the dispatcher rather than the pool, since a slot's own
/// identity is reused across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegNum(pub u32);

/// Reads the header fields every request shares (own SDN via the gate, SCM
/// main SADR from the SOD) and assembles the `FrmHdr` for `target` with
/// `id`/`le` filled in by the caller.
fn build_header<O: SafetyObjectDictionary>(
    target: Sadr,
    frame_id: u8,
    payload_len: usize,
    sdn_gate: &SdnGate,
    sod: &O,
) -> Result<FrmHdr, Error> {
    let _ = payload_len;
    let scm_main_sadr = sod
        .read_u16(OBJ_SCM_MAIN_SADR)
        .map_err(|_| Error::SodAccessFailed)?;
    Ok(FrmHdr {
        adr: target,
        id: frame_id,
        sdn: sdn_gate.get(),
        ct: 0,
        tadr: Tadr(scm_main_sadr),
        tr: Tr(0),
        ext_ct: None,
    })
}

/// SNMT master dispatcher: owns no state of its own beyond a registration
/// counter; the FSM pool, SOD, and SDN gate are borrowed from the caller
/// (normally [`crate::scm::ScmCore`]).
pub struct Dispatcher {
    next_regnum: u32,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher { next_regnum: 0 }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_reg(&mut self) -> u32 {
        let r = self.next_regnum;
        self.next_regnum = self.next_regnum.wrapping_add(1);
        r
    }

    /// Shared tail of every builder: find a free slot (fatal if none), build
    /// the header, hand the request to the pool.
    #[allow(clippy::too_many_arguments)]
    fn issue<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        frame_id: u8,
        payload: &RequestPayload,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let slot = pool.find_free();
        if slot == INVALID_SLOT {
            let err = Error::PoolExhausted;
            diag.set_error(err.code(), u32::from(target.0));
            return Err(err);
        }
        let header = build_header(target, frame_id, payload.as_slice().len(), sdn_gate, sod)?;
        let regnum = self.next_reg();
        pool.send_request(slot, header, payload.as_slice(), regnum, now, transport, sod, diag)?;
        Ok(RegNum(regnum))
    }

    pub fn request_udid<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::request_udid();
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    pub fn assign_sadr<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        target_udid: Udid,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::assign_sadr(target_udid);
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    pub fn assign_udid_scm<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        scm_udid: Udid,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::assign_udid_scm(scm_udid);
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    pub fn initialize_ct<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        initial_ct: u64,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::initialize_ct(initial_ct);
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn assign_additional_sadr<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        additional_sadr: Sadr,
        spdo_number: u16,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::assign_additional_sadr(additional_sadr, spdo_number)?;
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    pub fn guard_sn<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::guard_sn();
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    pub fn transition_to_op<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        parameter_timestamp: u32,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::transition_to_op(parameter_timestamp);
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    pub fn transition_to_preop<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::transition_to_preop();
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn sn_error_ack<const N: usize, T, O, H>(
        &mut self,
        pool: &mut FsmPool<N>,
        target: Sadr,
        error_group: u8,
        error_code: u8,
        now: Tick,
        sdn_gate: &SdnGate,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<RegNum, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let (id, payload) = services::sn_error_ack(error_group, error_code);
        self.issue(pool, target, id, &payload, now, sdn_gate, transport, sod, diag)
    }

    /// Outcome of routing one received frame.
    pub fn route_response<const N: usize, H: ErrorSignal>(
        pool: &mut FsmPool<N>,
        header: &FrmHdr,
        payload: &[u8],
        own_main_sadr: Sadr,
        diag: &mut DiagManager<H>,
    ) -> RouteOutcome {
        if header.tr.0 != 0 {
            diag.set_error(Error::ReservedFieldNonZero.code(), u32::from(header.tr.0));
            return RouteOutcome::AcceptedNoEffect;
        }
        if header.ct != 0 {
            diag.set_error(Error::ReservedFieldNonZero.code(), u32::from(header.ct));
            return RouteOutcome::AcceptedNoEffect;
        }

        if header.id == ids::SNMT_SN_RESET_GUARDING_SCM {
            return RouteOutcome::ResetGuard;
        }

        if header.adr != own_main_sadr {
            let err = Error::WrongDestination;
            diag.set_error(err.code(), u32::from(header.adr.0));
            return RouteOutcome::Rejected;
        }

        let response_id = header.id & !0x01;

        for slot in 0..N {
            let s = pool.slot(slot);
            if s.is_free() {
                continue;
            }
            let req_header = s.request_header();
            if (req_header.id & !0x01) != response_id {
                continue;
            }

            let matches = match req_header.id {
                id if id == ids::SNMT_REQUEST_UDID => req_header.adr == header.adr,
                id if id == ids::SNMT_ASSIGN_SADR => {
                    payload.len() >= 6 && payload[..6] == *s.request_payload().get(0..6).unwrap_or(&[])
                }
                id if id == ids::SNMT_SERVICE_REQUEST => {
                    let req_cmd = s.request_payload().first().copied().unwrap_or(0);
                    let resp_cmd = payload.first().copied().unwrap_or(0);
                    let req_kind = request_kind_for_cmd(req_cmd);
                    let resp_kind = ResponseKind::from_ext_cmd(resp_cmd);
                    match (req_kind, resp_kind) {
                        (Some(rq), Some(rs)) => {
                            is_compatible(rq, rs) && req_header.tadr == header.tadr && req_header.sdn == header.sdn
                        }
                        _ => false,
                    }
                }
                _ => false,
            };

            if matches {
                match pool.response_received(slot, payload) {
                    Ok(completion) => return RouteOutcome::Completed(completion),
                    Err(_) => continue,
                }
            }
        }

        let err = Error::ResponseNotAssigned;
        diag.set_error(err.code(), u32::from(header.adr.0));
        RouteOutcome::NotAssigned
    }

    /// Periodic sweep: applies `CheckTimeout` to every slot in index order,
    /// stopping once the free-frame budget is exhausted. Returns the
    /// completions (timeouts) raised during the sweep.
    pub fn build_request<const N: usize, T, O, H>(
        pool: &mut FsmPool<N>,
        now: Tick,
        free_frames: &mut u8,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<Vec<Completion>, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        let mut completions = Vec::new();
        for slot in 0..N {
            if *free_frames == 0 {
                break;
            }
            let outcome = pool.check_timeout(slot, now, free_frames, transport, sod, diag)?;
            if outcome == TimeoutOutcome::TimedOut {
                if let Some(completion) = pool.take_timeout_completion() {
                    completions.push(completion);
                }
            }
        }
        Ok(completions)
    }
}

/// Maps an extended-service request command byte (already `>>1`) back to its
/// [`RequestKind`], for response-routing lookups against the compatibility
/// table.
fn request_kind_for_cmd(cmd: u8) -> Option<RequestKind> {
    match cmd {
        services::EXT_REQ_SN_SET_TO_PREOP => Some(RequestKind::SnPutToPreOp),
        services::EXT_REQ_SN_SET_TO_OP => Some(RequestKind::SnPutToOp),
        services::EXT_REQ_SCM_GUARD_SN => Some(RequestKind::ScmGuardSn),
        services::EXT_REQ_ASSGN_ADD_SADR => Some(RequestKind::AssignAdditionalSadr),
        services::EXT_REQ_SN_ACK => Some(RequestKind::SnAck),
        services::EXT_REQ_ASSGN_UDID_SCM => Some(RequestKind::AssignUdidScm),
        services::EXT_REQ_INITIALIZE_EXT_CT => Some(RequestKind::AssignInitCt),
        _ => None,
    }
}

/// Result of [`Dispatcher::route_response`].
#[derive(Debug)]
pub enum RouteOutcome {
    /// A reserved field (TR or CT) was non-zero; counted as info, no slot
    /// touched.
    AcceptedNoEffect,
    /// The broadcast reset-guard service; no slot consumed.
    ResetGuard,
    /// Destination address did not match the SCM's own main SADR.
    Rejected,
    /// No waiting slot matched; dropped.
    NotAssigned,
    /// A slot was matched and completed.
    Completed(Completion),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NoOpErrorSignal;
    use crate::sod::{Attributes, ObjectRef, SodErrorResult};
    use crate::types::Sdn;

    struct FakeTransport {
        buf: Vec<u8>,
    }

    impl FakeTransport {
        fn new() -> Self {
            FakeTransport { buf: alloc::vec![0u8; 256] }
        }
    }

    impl SafetyTransport for FakeTransport {
        fn acquire_tx_buffer(&mut self, len: usize) -> Result<(crate::transport::TxHandle, &mut [u8]), Error> {
            Ok((crate::transport::TxHandle(0), &mut self.buf[..len]))
        }
        fn mark_ready(&mut self, _handle: crate::transport::TxHandle, _len: usize) -> Result<(), Error> {
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
            } else {
                Ok(self.own_sdn)
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

    fn sdn_gate(own_sdn: u16) -> SdnGate {
        let sod = FakeSod {
            own_sdn,
            scm_main_sadr: 1,
            timeout: 100,
            retries: 2,
        };
        SdnGate::init(&sod).unwrap()
    }

    #[test]
    fn successful_udid_request_completes_matching_slot() {
        let mut pool = FsmPool::<1>::new();
        let mut dispatcher = Dispatcher::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod {
            own_sdn: 1,
            scm_main_sadr: 1,
            timeout: 100,
            retries: 2,
        };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let gate = sdn_gate(1);

        let reg = dispatcher
            .request_udid(&mut pool, Sadr(5), 0, &gate, &mut transport, &sod, &mut diag)
            .unwrap();

        let response_header = FrmHdr {
            adr: Sadr(5),
            id: ids::SNMT_RESPONSE_UDID,
            sdn: Sdn(1),
            ct: 0,
            tadr: Tadr(1),
            tr: Tr(0),
            ext_ct: None,
        };
        let outcome =
            Dispatcher::route_response(&mut pool, &response_header, &[0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6], Sadr(1), &mut diag);
        match outcome {
            RouteOutcome::Completed(completion) => {
                assert_eq!(completion.regnum, reg.0);
                assert!(!completion.timeout);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn assign_sadr_matches_by_udid_content_not_address() {
        let mut pool = FsmPool::<2>::new();
        let mut dispatcher = Dispatcher::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod {
            own_sdn: 1,
            scm_main_sadr: 1,
            timeout: 100,
            retries: 2,
        };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let gate = sdn_gate(1);

        dispatcher
            .assign_sadr(&mut pool, Sadr(10), [1, 2, 3, 4, 5, 6], 0, &gate, &mut transport, &sod, &mut diag)
            .unwrap();
        let reg2 = dispatcher
            .assign_sadr(&mut pool, Sadr(10), [11, 12, 13, 14, 15, 16], 0, &gate, &mut transport, &sod, &mut diag)
            .unwrap();

        let response_header = FrmHdr {
            adr: Sadr(10),
            id: ids::SNMT_SADR_ASSIGNED,
            sdn: Sdn(1),
            ct: 0,
            tadr: Tadr(1),
            tr: Tr(0),
            ext_ct: None,
        };
        let outcome = Dispatcher::route_response(&mut pool, &response_header, &[11, 12, 13, 14, 15, 16], Sadr(1), &mut diag);
        match outcome {
            RouteOutcome::Completed(completion) => assert_eq!(completion.regnum, reg2.0),
            other => panic!("expected Completed, got {other:?}"),
        }
        assert!(!pool.slot(0).is_free());
    }

    #[test]
    fn wrong_destination_is_rejected_without_touching_slots() {
        let mut pool = FsmPool::<1>::new();
        let mut dispatcher = Dispatcher::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod {
            own_sdn: 1,
            scm_main_sadr: 1,
            timeout: 100,
            retries: 2,
        };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let gate = sdn_gate(1);

        dispatcher
            .request_udid(&mut pool, Sadr(5), 0, &gate, &mut transport, &sod, &mut diag)
            .unwrap();

        let response_header = FrmHdr {
            adr: Sadr(9),
            id: ids::SNMT_RESPONSE_UDID,
            sdn: Sdn(1),
            ct: 0,
            tadr: Tadr(1),
            tr: Tr(0),
            ext_ct: None,
        };
        let outcome = Dispatcher::route_response(&mut pool, &response_header, &[0u8; 6], Sadr(1), &mut diag);
        assert!(matches!(outcome, RouteOutcome::Rejected));
        assert!(!pool.slot(0).is_free());
    }

    #[test]
    fn reserved_fields_are_accepted_with_no_effect() {
        let mut pool = FsmPool::<1>::new();
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let header = FrmHdr {
            adr: Sadr(1),
            id: ids::SNMT_RESPONSE_UDID,
            sdn: Sdn(1),
            ct: 0,
            tadr: Tadr(1),
            tr: Tr(3),
            ext_ct: None,
        };
        let outcome = Dispatcher::route_response(&mut pool, &header, &[], Sadr(1), &mut diag);
        assert!(matches!(outcome, RouteOutcome::AcceptedNoEffect));
    }

    #[test]
    fn pool_saturation_rejects_new_requests() {
        let mut pool = FsmPool::<1>::new();
        let mut dispatcher = Dispatcher::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod {
            own_sdn: 1,
            scm_main_sadr: 1,
            timeout: 100,
            retries: 2,
        };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let gate = sdn_gate(1);

        dispatcher
            .request_udid(&mut pool, Sadr(5), 0, &gate, &mut transport, &sod, &mut diag)
            .unwrap();
        let err = dispatcher
            .request_udid(&mut pool, Sadr(6), 0, &gate, &mut transport, &sod, &mut diag)
            .unwrap_err();
        assert_eq!(err, Error::PoolExhausted);
    }
}
