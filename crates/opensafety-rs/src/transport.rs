//! Host/Network Frame transport boundary (HNF) — consumed, not implemented.
//!
//! No implementation of this trait ships in this crate, the same way
//! `powerlink-rs::hal::NetworkInterface` is a named boundary whose concrete
//! drivers live in separate crates (`powerlink-rs-linux`, `-windows`, ...).

use crate::error::Error;

/// An opaque handle to a buffer obtained from [`SafetyTransport::acquire_tx_buffer`].
/// The core never inspects this value; it only threads it back to
/// [`SafetyTransport::mark_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle(pub u32);

/// The transport/allocator boundary the frame codec and the FSM pool consume.
///
/// A host implementation owns the actual frame buffers and the physical send
/// path; this crate only ever borrows a buffer long enough to serialize into
/// it, then hands ownership back via `mark_ready`.
pub trait SafetyTransport {
    /// Obtains a buffer of at least `len` bytes, ready to serialize a frame
    /// into, and a handle to pass back to [`mark_ready`](Self::mark_ready).
    fn acquire_tx_buffer(&mut self, len: usize) -> Result<(TxHandle, &mut [u8]), Error>;

    /// Marks a previously-acquired buffer as ready for transmission. Ownership
    /// of the buffer passes back to the transport; the core never touches it
    /// again.
    fn mark_ready(&mut self, handle: TxHandle, len: usize) -> Result<(), Error>;
}
