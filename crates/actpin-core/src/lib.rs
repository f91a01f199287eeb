pub mod cache;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod io;
pub mod paths;
pub mod progress;
pub mod rewrite;
pub mod run;

#[cfg(test)]
mod testing;

pub use error::{PinError, Result};
