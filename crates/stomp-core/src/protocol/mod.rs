//! Protocol module containing the frame model, the incremental framer and the
//! outbound verb builders.

pub mod frame;
pub mod framer;
pub mod verbs;

pub use frame::{Frame, FRAME_TERMINATOR};
pub use framer::{parse_frame, Framer};
