//! buggywhip CLI Library
//!
//! Interactive front end over the session driver: command parsing and
//! dispatch, the readline loop and the printers for relayed shell output.

pub mod app;
pub mod commands;
pub mod output;
pub mod repl;
