pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod providers;

pub use error::{ChorusError, Result};
