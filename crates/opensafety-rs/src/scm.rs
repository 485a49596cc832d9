//! SCM control surface (C9): the thin owning aggregate that ties together the
//! FSM pool, the dispatcher, the SDN gate, the diagnostics engine, and a
//! host-supplied transport/SOD/callback set.
//!
//! Mirrors the teacher's single-threaded, no-internal-locking design: there is
//! no mutex anywhere in this struct, and it is made `!Send + !Sync` in the
//! type system via a `PhantomData<*const ()>` marker, the same way the
//! absence of any `Arc`/`Mutex` in `powerlink-rs`'s HAL-consuming types keeps
//! everything on one logical thread by construction.

use core::marker::PhantomData;

use crate::diag::{DiagManager, ErrorSignal};
use crate::error::Error;
use crate::frame::FrmHdr;
use crate::sdn::SdnGate;
use crate::snmt::dispatcher::{Dispatcher, RegNum, RouteOutcome};
use crate::snmt::fsm::{Completion, FsmPool};
use crate::sod::{SafetyObjectDictionary, OBJ_SCM_MAIN_SADR};
use crate::transport::SafetyTransport;
use crate::types::{Sadr, Tick, Udid};

/// Host notifications this crate cannot resolve on its own: a slot's eventual
/// outcome (success or timeout) and the broadcast reset-guard service, which
/// consumes no slot and so has no other delivery path.
pub trait ScmCallbacks {
    fn on_completion(&mut self, completion: Completion);
    fn on_reset_guard(&mut self);
}

/// Fixed-capacity SCM aggregate: `N` = maximum concurrent SNs. `T` is the host
/// transport, `O` the SOD backend, `C` the completion/reset-guard callback
/// sink, `H` the error-signal sink (defaults are the caller's choice; no
/// defaults are assumed here since a safety host should wire its own).
pub struct ScmCore<const N: usize, T, O, C, H>
where
    T: SafetyTransport,
    O: SafetyObjectDictionary,
    C: ScmCallbacks,
    H: ErrorSignal,
{
    pool: FsmPool<N>,
    dispatcher: Dispatcher,
    sdn_gate: SdnGate,
    diag: DiagManager<H>,
    transport: T,
    sod: O,
    callbacks: C,
    own_main_sadr: Sadr,
    _not_send_sync: PhantomData<*const ()>,
}

impl<const N: usize, T, O, C, H> ScmCore<N, T, O, C, H>
where
    T: SafetyTransport,
    O: SafetyObjectDictionary,
    C: ScmCallbacks,
    H: ErrorSignal,
{
    /// Resolves the SDN gate and the SCM's own main SADR from the SOD;
    /// fatal on failure, per the data model's "fails fatally if SOD handles
    /// cannot be resolved at init" rule.
    pub fn new(transport: T, sod: O, callbacks: C, error_signal: H) -> Result<Self, Error> {
        let sdn_gate = SdnGate::init(&sod)?;
        let own_main_sadr_raw = sod
            .read_u16(OBJ_SCM_MAIN_SADR)
            .map_err(|_| Error::SodAccessFailed)?;
        let own_main_sadr = Sadr::try_from(own_main_sadr_raw)?;
        Ok(ScmCore {
            pool: FsmPool::new(),
            dispatcher: Dispatcher::new(),
            sdn_gate,
            diag: DiagManager::new(error_signal),
            transport,
            sod,
            callbacks,
            own_main_sadr,
            _not_send_sync: PhantomData,
        })
    }

    /// Drives the periodic sweep (`CheckTimeout` over every slot) and
    /// forwards any resulting timeout completions to the callback sink.
    pub fn poll(&mut self, now: Tick, free_frames: &mut u8) -> Result<(), Error> {
        let completions = Dispatcher::build_request(
            &mut self.pool,
            now,
            free_frames,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )?;
        for completion in completions {
            self.callbacks.on_completion(completion);
        }
        Ok(())
    }

    /// Routes one received, already-deserialized frame. Dispatches to the
    /// callback sink on a match or a reset-guard broadcast; silently drops
    /// reserved-field, wrong-destination, and unassigned responses (already
    /// counted as errors by `route_response`).
    pub fn on_frame_received(&mut self, header: &FrmHdr, payload: &[u8]) {
        match Dispatcher::route_response(&mut self.pool, header, payload, self.own_main_sadr, &mut self.diag) {
            RouteOutcome::Completed(completion) => self.callbacks.on_completion(completion),
            RouteOutcome::ResetGuard => self.callbacks.on_reset_guard(),
            RouteOutcome::AcceptedNoEffect | RouteOutcome::Rejected | RouteOutcome::NotAssigned => {}
        }
    }

    pub fn request_udid(&mut self, target: Sadr, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.request_udid(
            &mut self.pool,
            target,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn assign_sadr(&mut self, target: Sadr, target_udid: Udid, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.assign_sadr(
            &mut self.pool,
            target,
            target_udid,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn assign_udid_scm(&mut self, target: Sadr, scm_udid: Udid, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.assign_udid_scm(
            &mut self.pool,
            target,
            scm_udid,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn initialize_ct(&mut self, target: Sadr, initial_ct: u64, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.initialize_ct(
            &mut self.pool,
            target,
            initial_ct,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn assign_additional_sadr(
        &mut self,
        target: Sadr,
        additional_sadr: Sadr,
        spdo_number: u16,
        now: Tick,
    ) -> Result<RegNum, Error> {
        self.dispatcher.assign_additional_sadr(
            &mut self.pool,
            target,
            additional_sadr,
            spdo_number,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn guard_sn(&mut self, target: Sadr, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.guard_sn(
            &mut self.pool,
            target,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn transition_to_op(&mut self, target: Sadr, parameter_timestamp: u32, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.transition_to_op(
            &mut self.pool,
            target,
            parameter_timestamp,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn transition_to_preop(&mut self, target: Sadr, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.transition_to_preop(
            &mut self.pool,
            target,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn sn_error_ack(&mut self, target: Sadr, error_group: u8, error_code: u8, now: Tick) -> Result<RegNum, Error> {
        self.dispatcher.sn_error_ack(
            &mut self.pool,
            target,
            error_group,
            error_code,
            now,
            &self.sdn_gate,
            &mut self.transport,
            &self.sod,
            &mut self.diag,
        )
    }

    pub fn diag(&self) -> &DiagManager<H> {
        &self.diag
    }

    pub fn pool(&self) -> &FsmPool<N> {
        &self.pool
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }
}
