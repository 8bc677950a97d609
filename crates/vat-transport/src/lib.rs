//! Message session for the Video Annotation Tool.
//!
//! Frames session payloads into datagrams, defines the wire messages, and
//! runs a multicast pub/sub session implementing the core message bus.

pub mod framing;
pub mod messages;
pub mod session;

pub use framing::*;
pub use messages::*;
pub use session::*;
