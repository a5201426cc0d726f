//! CLI module for duet.
//!
//! - Argument parsing into a [`CliCommand`]
//! - Version display
//! - The interactive loop ([`repl::Repl`])
//!
//! # Usage
//!
//! ```ignore
//! use duet::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Run(options) => { /* build the engine and start the loop */ }
//!     other => { /* version, help, health, bad arguments */ }
//! }
//! ```

pub mod args;
pub mod repl;
pub mod version;

pub use args::{parse_args, CliCommand, CliOptions, USAGE};
pub use repl::{parse_repl_line, Flow, Repl, ReplCommand, ReplInput, REPL_HELP};
pub use version::{version_line, VERSION};
