//! Command-line argument parsing for duet.

use std::path::PathBuf;

use crate::config::ClientConfig;
use crate::models::ChatMode;

/// Overrides given on the command line. They win over environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub mode: Option<ChatMode>,
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl CliOptions {
    /// Layer these options on top of `config`.
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(mode) = self.mode {
            config = config.with_mode(mode);
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir.clone());
        }
        config
    }
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Probe the backend and exit
    Health(CliOptions),
    /// Start the interactive session (default)
    Run(CliOptions),
    /// Arguments could not be understood
    Invalid(String),
}

/// Usage text printed by `--help` and on bad arguments.
pub const USAGE: &str = "\
Usage: duet [OPTIONS]

Options:
  --mode <live|batch>   Backend used for messages (default: batch)
  --base-url <URL>      Server root (default: http://localhost:8088)
  --data-dir <DIR>      Where sessions are stored
  --health              Check that the server answers, then exit
  -V, --version         Print version
  -h, --help            Print this help

Environment: DUET_BASE_URL, DUET_LIVE_MODEL, DUET_BATCH_MODEL, DUET_MODE,
DUET_DATA_DIR, DUET_LOG (or RUST_LOG)";

/// Parse command-line arguments and return the appropriate command.
///
/// Options accept both `--flag value` and `--flag=value`.
///
/// # Examples
///
/// ```
/// use duet::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["duet".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut health = false;
    // Skip the program name
    let mut args = args.skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };

        match flag.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--health" => health = true,
            "--mode" | "--base-url" | "--data-dir" => {
                let Some(value) = inline.or_else(|| args.next()) else {
                    return CliCommand::Invalid(format!("{} needs a value", flag));
                };
                match flag.as_str() {
                    "--mode" => match value.parse() {
                        Ok(mode) => options.mode = Some(mode),
                        Err(e) => return CliCommand::Invalid(e),
                    },
                    "--base-url" => options.base_url = Some(value),
                    _ => options.data_dir = Some(PathBuf::from(value)),
                }
            }
            other => return CliCommand::Invalid(format!("unknown argument '{}'", other)),
        }
    }

    if health {
        CliCommand::Health(options)
    } else {
        CliCommand::Run(options)
    }
}
