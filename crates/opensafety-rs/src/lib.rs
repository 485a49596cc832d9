#![cfg_attr(not(feature = "std"), no_std)]

//! `opensafety-rs`: a deterministic black-channel openSAFETY stack core.
//!
//! This crate implements the SNMT master finite-state machine pool, the
//! openSAFETY frame serializer/deserializer, and the supporting primitives
//! (byte-order copy kernel, CRC kernel, SDN gate, error/statistics engine)
//! described in the openSAFETY specification. It is transport- and
//! storage-agnostic: hosts supply the frame transport via [`SafetyTransport`]
//! and the configuration backend via [`sod::SafetyObjectDictionary`].

// 'alloc' is used for dynamic allocation (Vec<u8> payloads, BTreeMap counters).
extern crate alloc;

pub mod copy;
pub mod crc;
pub mod diag;
pub mod error;
pub mod frame;
pub mod scm;
pub mod sdn;
pub mod snmt;
pub mod sod;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorClass, ErrorCode, Unit};
pub use scm::{ScmCallbacks, ScmCore};
pub use sod::SafetyObjectDictionary;
pub use transport::{SafetyTransport, TxHandle};
pub use types::{Sadr, Sdn as DomainNumber, Tadr, Tick, Tr, Udid};
