//! Diagnostics aggregate: packed error codes, counters, and the last-additional-
//! info register (C3).

use alloc::collections::BTreeMap;
use log::{debug, error, warn};

use crate::diag::counters::{AcyclicCounters, CommonCounter, COMMON_COUNTER_COUNT};
use crate::error::{ErrorClass, ErrorCode};
use crate::types::Sadr;

/// Host callback invoked on every `set_error`. Hosts typically forward fatal
/// errors to a safe-state transition and merely log the rest.
pub trait ErrorSignal {
    fn on_error(&mut self, code: ErrorCode, additional_info: u32);
}

/// A handler that only logs; useful for tests and for hosts with no additional
/// escalation path beyond the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpErrorSignal;

impl ErrorSignal for NoOpErrorSignal {
    fn on_error(&mut self, _code: ErrorCode, _additional_info: u32) {}
}

/// Owns the packed-error last-additional-info register and the three counter
/// cohorts described in the data model (common, per-SN acyclic; the per-SPDO
/// cohort is not populated here since no SPDO engine is part of this crate).
pub struct DiagManager<H: ErrorSignal> {
    common: [u32; COMMON_COUNTER_COUNT],
    per_sn: BTreeMap<Sadr, AcyclicCounters>,
    last_additional_info: Option<u32>,
    handler: H,
}

impl<H: ErrorSignal> DiagManager<H> {
    pub fn new(handler: H) -> Self {
        DiagManager {
            common: [0; COMMON_COUNTER_COUNT],
            per_sn: BTreeMap::new(),
            last_additional_info: None,
            handler,
        }
    }

    /// Records `additional_info`, logs at a level matching the error's class,
    /// and forwards the event to the host callback. Does not touch counters —
    /// callers that want a counter bumped call the dedicated `record_*` method,
    /// since not every error maps onto exactly one counter.
    pub fn set_error(&mut self, code: ErrorCode, additional_info: u32) {
        self.last_additional_info = Some(additional_info);
        match code.class {
            ErrorClass::Fatal => error!("{} (code={:#06x})", code.description(), code.pack()),
            ErrorClass::Minor => warn!("{} (code={:#06x})", code.description(), code.pack()),
            ErrorClass::Info => debug!("{} (code={:#06x})", code.description(), code.pack()),
        }
        self.handler.on_error(code, additional_info);
    }

    pub fn last_additional_info(&self) -> Option<u32> {
        self.last_additional_info
    }

    pub fn common_counter(&self, which: CommonCounter) -> u32 {
        self.common[which as usize]
    }

    pub fn acyclic_counters(&self, sadr: Sadr) -> AcyclicCounters {
        self.per_sn.get(&sadr).copied().unwrap_or_default()
    }

    pub fn record_snmt_retry(&mut self, sadr: Sadr) {
        self.common[CommonCounter::SnmtRetry as usize] += 1;
        self.per_sn.entry(sadr).or_default().retry += 1;
    }

    pub fn record_snmt_timeout(&mut self, sadr: Sadr) {
        self.common[CommonCounter::SnmtTimeout as usize] += 1;
        self.per_sn.entry(sadr).or_default().timeout += 1;
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}
