//! SNMT master FSM pool (C7): a fixed-capacity array of per-slot state
//! machines, one per outstanding SNMT service call, with retransmission and
//! per-slot timeout.
//!
//! Mirrors the teacher's `SdoClientManager`/`SdoTransferState` split (a pool
//! owning many single-transfer state machines, each carrying its own deadline
//! and retry counter) but over a *fixed-size array* rather than a `BTreeMap`,
//! since the data model requires a static pool sized to the maximum number of
//! concurrent SNs rather than a dynamically-growing connection table.

use alloc::vec::Vec;

use crate::diag::{DiagManager, ErrorSignal};
use crate::error::Error;
use crate::frame::{self, FrmHdr};
use crate::sod::{SafetyObjectDictionary, OBJ_SNMT_RETRIES, OBJ_SNMT_TIMEOUT};
use crate::transport::SafetyTransport;
use crate::types::{elapsed, Sadr, Sdn, Tadr, Tick};

/// Registration number marking a slot as not currently tied to any caller
/// request.
pub const INVALID_REG_NUM: u32 = u32::MAX;

/// No free-FSM-slot sentinel returned by [`FsmPool::find_free`].
pub const INVALID_SLOT: usize = usize::MAX;

/// Longest payload any SNMT master request carries: "assign UDID of SCM"
/// (1 command byte + 6-byte UDID).
pub const MAX_REQUEST_PAYLOAD: usize = 7;

/// A slot's two-state machine, per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    WaitForRequest,
    WaitForResponse,
}

/// One outstanding (or idle) SNMT master service call.
#[derive(Debug, Clone)]
pub struct Slot {
    state: State,
    req_header: FrmHdr,
    req_payload: [u8; MAX_REQUEST_PAYLOAD],
    req_payload_len: u8,
    regnum: u32,
    retry_count: u8,
    retry_budget: u8,
    deadline: Tick,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            state: State::WaitForRequest,
            req_header: FrmHdr {
                adr: Sadr(1),
                id: 0,
                sdn: Sdn(1),
                ct: 0,
                tadr: Tadr(0),
                tr: crate::types::Tr(0),
                ext_ct: None,
            },
            req_payload: [0u8; MAX_REQUEST_PAYLOAD],
            req_payload_len: 0,
            regnum: INVALID_REG_NUM,
            retry_count: 0,
            retry_budget: 0,
            deadline: 0,
        }
    }
}

impl Slot {
    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, State::WaitForRequest)
    }

    pub fn request_header(&self) -> &FrmHdr {
        &self.req_header
    }

    pub fn request_payload(&self) -> &[u8] {
        &self.req_payload[..self.req_payload_len as usize]
    }

    pub fn registration_number(&self) -> u32 {
        self.regnum
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    fn reset(&mut self) {
        *self = Slot::default();
    }
}

/// Outcome of [`FsmPool::send_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame transmitted, slot now waiting for a response.
    Sent,
}

/// Outcome of [`FsmPool::check_timeout`] for a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// Slot is free, or still within its deadline: nothing happened.
    NoOp,
    /// Deadline reached but the free-frame budget was already exhausted;
    /// deferred to the next tick.
    Deferred,
    /// Deadline reached, retry budget not exhausted: the request was
    /// re-transmitted.
    Retried,
    /// Deadline reached, retry budget exhausted: the slot timed out.
    TimedOut,
}

/// Data handed to the caller's completion callback: a successful response or
/// a retry-budget-exhausted timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub regnum: u32,
    pub tadr: Tadr,
    pub sdn: Sdn,
    /// `None` on timeout; `Some(payload)` on a successfully matched response.
    pub payload: Option<Vec<u8>>,
    pub timeout: bool,
}

/// Fixed-capacity pool of `N` SNMT master FSM slots (`N` = maximum concurrent
/// SNs this instance manages).
pub struct FsmPool<const N: usize> {
    slots: [Slot; N],
    /// Completion data for the most recent `TimeoutOutcome::TimedOut`, held
    /// here because `check_timeout` only reports the outcome kind; callers
    /// collect the completion with `take_timeout_completion`.
    pending_timeout: Option<Completion>,
}

impl<const N: usize> Default for FsmPool<N> {
    fn default() -> Self {
        FsmPool {
            slots: core::array::from_fn(|_| Slot::default()),
            pending_timeout: None,
        }
    }
}

impl<const N: usize> FsmPool<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: usize) -> &Slot {
        &self.slots[slot]
    }

    /// Linear scan for the first slot in `WaitForRequest`; `INVALID_SLOT` if
    /// none is free.
    pub fn find_free(&self) -> usize {
        self.slots
            .iter()
            .position(Slot::is_free)
            .unwrap_or(INVALID_SLOT)
    }

    pub fn check_available(&self) -> bool {
        self.find_free() != INVALID_SLOT
    }

    /// Takes the completion recorded by the most recent timed-out slot, if
    /// any. Callers drain this immediately after a `TimedOut` outcome.
    pub fn take_timeout_completion(&mut self) -> Option<Completion> {
        self.pending_timeout.take()
    }

    /// `(WaitForRequest, SendRequest)`: stores the request, reads the SOD
    /// timeout/retry-budget objects, serializes and transmits the frame, and
    /// arms the slot's deadline. Fails fatally only on an internal contract
    /// violation (slot not free, SOD access refused).
    pub fn send_request<T, O, H>(
        &mut self,
        slot: usize,
        header: FrmHdr,
        payload: &[u8],
        regnum: u32,
        now: Tick,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<SendOutcome, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        if !self.slots[slot].is_free() {
            let err = Error::FsmEventInvalid;
            diag.set_error(err.code(), u32::from(header.adr.0));
            return Err(err);
        }
        if payload.len() > MAX_REQUEST_PAYLOAD {
            return Err(Error::BufferTooShort);
        }

        let timeout = sod
            .read_u32(OBJ_SNMT_TIMEOUT)
            .map_err(|_| Error::SodAccessFailed)?;
        let retries = sod
            .read_u8(OBJ_SNMT_RETRIES)
            .map_err(|_| Error::SodAccessFailed)?;

        transmit(&header, payload, transport)?;

        let s = &mut self.slots[slot];
        s.req_header = header;
        s.req_payload[..payload.len()].copy_from_slice(payload);
        s.req_payload_len = payload.len() as u8;
        s.regnum = regnum;
        s.retry_count = 0;
        s.retry_budget = retries;
        s.deadline = now.wrapping_add(timeout);
        s.state = State::WaitForResponse;
        Ok(SendOutcome::Sent)
    }

    /// `(WaitForResponse, ResponseReceived)`: matches the completion, resets
    /// the slot to `WaitForRequest`. Callers must already have established
    /// that `slot` is the one the response was assigned to (see
    /// `dispatcher::route_response`); calling this on a free slot is a
    /// contract violation.
    pub fn response_received(&mut self, slot: usize, payload: &[u8]) -> Result<Completion, Error> {
        let s = &mut self.slots[slot];
        if s.is_free() {
            return Err(Error::FsmEventInvalid);
        }
        let completion = Completion {
            regnum: s.regnum,
            tadr: s.req_header.tadr,
            sdn: s.req_header.sdn,
            payload: Some(payload.to_vec()),
            timeout: false,
        };
        s.reset();
        Ok(completion)
    }

    /// `(_, CheckTimeout)`: a no-op for a free slot; for a busy slot, checks
    /// the wrap-tolerant deadline and either waits, retransmits, or times the
    /// slot out. `free_frames` is decremented by one per retransmission and
    /// the sweep must stop calling this once it reaches zero (callers iterate
    /// via `dispatcher::build_request`, not directly).
    pub fn check_timeout<T, O, H>(
        &mut self,
        slot: usize,
        now: Tick,
        free_frames: &mut u8,
        transport: &mut T,
        sod: &O,
        diag: &mut DiagManager<H>,
    ) -> Result<TimeoutOutcome, Error>
    where
        T: SafetyTransport,
        O: SafetyObjectDictionary,
        H: ErrorSignal,
    {
        if self.slots[slot].is_free() {
            return Ok(TimeoutOutcome::NoOp);
        }
        if *free_frames == 0 {
            return Ok(TimeoutOutcome::Deferred);
        }
        if !elapsed(now, self.slots[slot].deadline) {
            return Ok(TimeoutOutcome::NoOp);
        }

        let retry_count = self.slots[slot].retry_count;
        let retry_budget = self.slots[slot].retry_budget;
        let sadr = self.slots[slot].req_header.adr;

        if retry_count >= retry_budget {
            diag.record_snmt_timeout(sadr);
            let err = Error::NoResponseReceived;
            diag.set_error(err.code(), u32::from(sadr.0));
            let s = &mut self.slots[slot];
            let completion = Completion {
                regnum: s.regnum,
                tadr: s.req_header.tadr,
                sdn: s.req_header.sdn,
                payload: None,
                timeout: true,
            };
            s.reset();
            self.pending_timeout = Some(completion);
            return Ok(TimeoutOutcome::TimedOut);
        }

        let timeout = sod
            .read_u32(OBJ_SNMT_TIMEOUT)
            .map_err(|_| Error::SodAccessFailed)?;
        let retries = sod
            .read_u8(OBJ_SNMT_RETRIES)
            .map_err(|_| Error::SodAccessFailed)?;

        let header = self.slots[slot].req_header;
        let payload_len = self.slots[slot].req_payload_len as usize;
        let payload = self.slots[slot].req_payload;
        transmit(&header, &payload[..payload_len], transport)?;

        let s = &mut self.slots[slot];
        s.retry_budget = retries;
        s.retry_count += 1;
        s.deadline = now.wrapping_add(timeout);
        *free_frames -= 1;
        diag.record_snmt_retry(sadr);
        Ok(TimeoutOutcome::Retried)
    }
}

fn transmit<T: SafetyTransport>(header: &FrmHdr, payload: &[u8], transport: &mut T) -> Result<(), Error> {
    // SNMT requests are never slim SSDO frames.
    let len = frame::wire_len(payload.len(), false);
    let (handle, buf) = transport.acquire_tx_buffer(len)?;
    let n = frame::serialize(header, payload, [0u8; 6], buf)?;
    transport.mark_ready(handle, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::NoOpErrorSignal;
    use crate::frame::ids;
    use crate::sod::{Attributes, ObjectRef, SodErrorResult};
    use crate::types::{Sdn, Tr};

    struct FakeTransport {
        buf: Vec<u8>,
        sent: Vec<Vec<u8>>,
    }

    impl FakeTransport {
        fn new() -> Self {
            FakeTransport {
                buf: alloc::vec![0u8; 256],
                sent: Vec::new(),
            }
        }
    }

    impl SafetyTransport for FakeTransport {
        fn acquire_tx_buffer(&mut self, len: usize) -> Result<(crate::transport::TxHandle, &mut [u8]), Error> {
            if self.buf.len() < len {
                return Err(Error::BufferTooShort);
            }
            Ok((crate::transport::TxHandle(0), &mut self.buf[..len]))
        }
        fn mark_ready(&mut self, _handle: crate::transport::TxHandle, len: usize) -> Result<(), Error> {
            self.sent.push(self.buf[..len].to_vec());
            Ok(())
        }
    }

    struct FakeSod {
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
        fn read_u16(&self, _obj: ObjectRef) -> Result<u16, SodErrorResult> {
            unimplemented!()
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

    fn header(adr: u16) -> FrmHdr {
        FrmHdr {
            adr: Sadr::try_from(adr).unwrap(),
            id: ids::SNMT_REQUEST_UDID,
            sdn: Sdn(1),
            ct: 0,
            tadr: Tadr(1),
            tr: Tr(0),
            ext_ct: None,
        }
    }

    #[test]
    fn find_free_then_pool_saturates() {
        let pool = FsmPool::<2>::new();
        assert_eq!(pool.find_free(), 0);
        assert!(pool.check_available());
    }

    #[test]
    fn send_request_arms_deadline_and_transmits() {
        let mut pool = FsmPool::<1>::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod { timeout: 100, retries: 2 };
        let mut diag = DiagManager::new(NoOpErrorSignal);

        pool.send_request(0, header(5), &[], 0x1234, 0, &mut transport, &sod, &mut diag)
            .unwrap();
        assert_eq!(pool.slot(0).state(), State::WaitForResponse);
        assert_eq!(transport.sent.len(), 1);
    }

    #[test]
    fn retry_then_success_tracks_retry_count() {
        let mut pool = FsmPool::<1>::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod { timeout: 100, retries: 2 };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let mut free = 10u8;

        pool.send_request(0, header(5), &[], 1, 0, &mut transport, &sod, &mut diag)
            .unwrap();

        for t in [100u32, 200, 300] {
            let outcome = pool
                .check_timeout(0, t, &mut free, &mut transport, &sod, &mut diag)
                .unwrap();
            assert_eq!(outcome, TimeoutOutcome::Retried);
        }
        assert_eq!(pool.slot(0).retry_count(), 2);

        let completion = pool.response_received(0, &[0xAA]).unwrap();
        assert_eq!(completion.regnum, 1);
        assert!(!completion.timeout);
        assert!(pool.slot(0).is_free());
    }

    #[test]
    fn timeout_after_exhaustion_fires_once() {
        let mut pool = FsmPool::<1>::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod { timeout: 100, retries: 2 };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let mut free = 10u8;

        pool.send_request(0, header(5), &[], 1, 0, &mut transport, &sod, &mut diag)
            .unwrap();
        for t in [100u32, 200, 300] {
            pool.check_timeout(0, t, &mut free, &mut transport, &sod, &mut diag)
                .unwrap();
        }
        let outcome = pool
            .check_timeout(0, 400, &mut free, &mut transport, &sod, &mut diag)
            .unwrap();
        assert_eq!(outcome, TimeoutOutcome::TimedOut);
        let completion = pool.take_timeout_completion().unwrap();
        assert!(completion.timeout);
        assert!(pool.slot(0).is_free());
    }

    #[test]
    fn check_timeout_on_free_slot_is_noop() {
        let mut pool = FsmPool::<1>::new();
        let mut transport = FakeTransport::new();
        let sod = FakeSod { timeout: 100, retries: 2 };
        let mut diag = DiagManager::new(NoOpErrorSignal);
        let mut free = 10u8;
        let outcome = pool
            .check_timeout(0, 0, &mut free, &mut transport, &sod, &mut diag)
            .unwrap();
        assert_eq!(outcome, TimeoutOutcome::NoOp);
    }
}
