//! Command-line interface module
//!
//! The application context, the built-in commands and usage output.

pub mod app;
pub mod commands;
pub mod usage;

pub use app::{App, Invocation};
