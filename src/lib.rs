pub mod tracker;
pub mod closure;
pub mod report;
pub mod config;
pub mod error;
pub mod utils;

pub use error::{Result, ClosureError};
pub use config::Config;
