//! Shell subprocess management and output relaying.

pub mod child;
pub mod relay;

pub use child::{ChildExit, ChildHandle};
pub use relay::OutputSink;
