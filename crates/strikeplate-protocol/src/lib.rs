//! Wire protocol of the Leser transponder readers.
//!
//! Two concerns live here: recognizing transponder frames in an accumulated
//! read buffer ([`FrameParser`]) and the relay command vocabulary used to
//! pulse the door strike ([`RelayPulseSpec`]).

pub mod commands;
pub mod frame;

pub use commands::{RelayPulseSpec, RelayStep};
pub use frame::{Frame, FrameParser, display_bytes};
