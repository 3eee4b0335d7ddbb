//! Debuggee session: the input feeder and the driver that owns one live
//! shell at a time.

mod driver;
pub mod feeder;
mod types;

pub use driver::SessionDriver;
pub use types::{DriverConfig, OutputSinks, SessionState};
