//! The CHAT message router: a directory of named TCP clients multiplexed
//! over a single-threaded readiness loop.

pub mod directory;
pub mod dispatcher;
pub mod frame;
pub mod server;

pub use dispatcher::{dispatch, Directive, Reply};
pub use directory::{ConnectionId, Directory, DirectoryError};
pub use frame::{Frame, FrameType};
pub use server::ChatRouter;
