//! GitLab time-accounting CLI library.
//!
//! This crate provides the command-line interface over the engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
