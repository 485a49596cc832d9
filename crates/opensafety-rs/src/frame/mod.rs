//! The openSAFETY frame: header, identifier space, and dual-sub-frame codec.

pub mod codec;
pub mod header;
pub mod ids;

pub use codec::{deserialize, serialize, wire_len, DecodedFrame};
pub use header::FrmHdr;
