#![allow(clippy::new_without_default, clippy::type_complexity)]

#[macro_use]
mod macros;
pub mod agent;
pub mod cli;
pub mod dbus;
pub mod logger;
pub mod mainloop;
pub mod ot_error;
pub mod thread;
pub mod utils;
