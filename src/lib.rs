//! Two hand-rolled wire protocols and the state machines that drive them:
//! a TCP chat router ([`chat`]) and a sliding-window reliable file
//! transfer over UDP ([`rudp`]).

pub mod chat;
pub mod rudp;
pub mod wire;

/// Error returned by most top-level functions.
///
/// Each subsystem defines its own error enum for the failures specific to
/// its protocol ([`chat::frame::Error`], [`rudp::RudpError`]); this boxed
/// type is only used where a function needs to return an error from
/// either subsystem's codec, as in [`wire::FixedBytesError`] conversions.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
