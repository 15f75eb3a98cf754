// edep-aio/src/lib.rs
//! Filesystem, JSON and process I/O for edep.

pub mod env;
pub mod fs;
pub mod json_io;
pub mod process;

pub use env::expand_env;
pub use json_io::{read_json, write_json};
pub use process::run_command_async;
