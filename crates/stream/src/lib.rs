//! Client side of the invocation stream: line framing, event decoding and
//! the per-invocation [`ClientState`] projection.

pub mod decode;
pub mod frame;
pub mod state;

pub use decode::EventStream;
pub use frame::{parse_frame, FrameDecoder};
pub use state::ClientState;
