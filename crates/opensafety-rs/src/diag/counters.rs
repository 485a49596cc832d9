//! Counter cohorts kept by the diagnostics engine.

/// Dense, per-instance counters that are not tied to a specific SN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CommonCounter {
    CyclicError = 0,
    AcyclicRetry = 1,
    SnmtRetry = 2,
    SnmtTimeout = 3,
}

pub const COMMON_COUNTER_COUNT: usize = 4;

/// Per-SN acyclic counters (SNMT request retries and timeouts observed for that
/// SN specifically, in addition to the common cohort above).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcyclicCounters {
    pub retry: u32,
    pub timeout: u32,
}
