//! buggywhip Driver Library
//!
//! Drives a shell as a debuggee:
//! - Named pipe that carries the script into the shell
//! - Shell subprocess lifecycle and exit watching
//! - Output relays from the shell's stdout/stderr to caller sinks
//! - Single-writer input feeder and the session driver that composes them

pub mod error;
pub mod pipe;
pub mod session;
pub mod subprocess;

pub use error::DriverError;
pub use pipe::ScriptPipe;
pub use session::{DriverConfig, OutputSinks, SessionDriver, SessionState};
pub use subprocess::{ChildExit, ChildHandle, OutputSink};
