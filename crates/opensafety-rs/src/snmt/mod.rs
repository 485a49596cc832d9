//! SNMT master (C7 + C8): the FSM pool, the service catalogue, the
//! compatibility matrix, and the dispatcher that ties them together.

pub mod compat;
pub mod dispatcher;
pub mod fsm;
pub mod services;

pub use compat::is_compatible;
pub use dispatcher::{Dispatcher, RegNum, RouteOutcome};
pub use fsm::{Completion, FsmPool, Slot, State as FsmState};
pub use services::{RequestKind, ResponseKind};
