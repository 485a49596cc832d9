//! Error/statistics engine (C3).

pub mod counters;
pub mod manager;

pub use counters::{AcyclicCounters, CommonCounter};
pub use manager::{DiagManager, ErrorSignal, NoOpErrorSignal};
