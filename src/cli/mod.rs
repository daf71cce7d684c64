pub mod commands;

pub use commands::{Cli, CloseArgs, Commands};
