//! Command-line argument parsing.
//!
//! ```text
//! darkman run [--debug] [--config <dir>]
//! darkman get
//! darkman set <light|dark>
//! darkman toggle
//! ```
//!
//! Flags may appear before or after the command. `--version` wins over
//! `--help`, which wins over everything else. Anything unrecognised turns into
//! [`CliAction::ShowHelpDueToError`].

use crate::core::Mode;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Start the daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Print the running daemon's mode
    Get,
    /// Switch the running daemon to a mode
    Set { mode: Mode },
    /// Switch the running daemon to the opposite mode
    Toggle,
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown or malformed arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse `args`, whose first item is the program name.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();

        let mut iter = args.into_iter().skip(1).map(|s| s.as_ref().to_string());
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--config" | "-c" => match iter.next() {
                    Some(dir) if !dir.starts_with('-') => config_dir = Some(dir),
                    _ => unknown_arg_found = true,
                },
                flag if flag.starts_with('-') => unknown_arg_found = true,
                _ => positional.push(arg),
            }
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if display_help {
            CliAction::ShowHelp
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else {
            Self::command(&positional, debug_enabled, config_dir)
        };

        ParsedArgs { action }
    }

    fn command(positional: &[String], debug_enabled: bool, config_dir: Option<String>) -> CliAction {
        let words: Vec<&str> = positional.iter().map(String::as_str).collect();
        match words.as_slice() {
            [] => CliAction::ShowHelp,
            ["run"] => CliAction::Run {
                debug_enabled,
                config_dir,
            },
            ["get"] => CliAction::Get,
            ["toggle"] => CliAction::Toggle,
            ["set", mode] => match mode.parse() {
                Ok(mode) => CliAction::Set { mode },
                Err(_) => CliAction::ShowHelpDueToError,
            },
            _ => CliAction::ShowHelpDueToError,
        }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_end!();
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("darkman [OPTIONS] <COMMAND>");
    log_block_start!("Commands:");
    log_indented!("run                    Start the daemon");
    log_indented!("get                    Print the current mode");
    log_indented!("set <light|dark>       Switch to the given mode");
    log_indented!("toggle                 Switch to the opposite mode");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliAction {
        ParsedArgs::parse(std::iter::once("darkman").chain(args.iter().copied())).action
    }

    #[test]
    fn test_parse_no_args() {
        assert_eq!(parse(&[]), CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_run() {
        assert_eq!(
            parse(&["run"]),
            CliAction::Run {
                debug_enabled: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_run_with_flags() {
        let expected = CliAction::Run {
            debug_enabled: true,
            config_dir: Some("/tmp/darkman".to_string()),
        };
        assert_eq!(parse(&["run", "--debug", "--config", "/tmp/darkman"]), expected);
        assert_eq!(parse(&["-d", "-c", "/tmp/darkman", "run"]), expected);
    }

    #[test]
    fn test_parse_config_requires_value() {
        assert_eq!(parse(&["run", "--config"]), CliAction::ShowHelpDueToError);
        assert_eq!(
            parse(&["run", "--config", "--debug"]),
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_parse_client_commands() {
        assert_eq!(parse(&["get"]), CliAction::Get);
        assert_eq!(parse(&["toggle"]), CliAction::Toggle);
        assert_eq!(parse(&["set", "dark"]), CliAction::Set { mode: Mode::Dark });
        assert_eq!(parse(&["set", "light"]), CliAction::Set { mode: Mode::Light });
    }

    #[test]
    fn test_parse_set_rejects_bad_modes() {
        assert_eq!(parse(&["set"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["set", "null"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["set", "dim"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["set", "dark", "light"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(parse(&["--help"]), CliAction::ShowHelp);
        assert_eq!(parse(&["-h"]), CliAction::ShowHelp);
        assert_eq!(parse(&["--version"]), CliAction::ShowVersion);
        assert_eq!(parse(&["-V"]), CliAction::ShowVersion);
        assert_eq!(parse(&["-v"]), CliAction::ShowVersion);
    }

    #[test]
    fn test_version_takes_precedence() {
        assert_eq!(parse(&["--version", "--help", "run"]), CliAction::ShowVersion);
        assert_eq!(parse(&["run", "--help"]), CliAction::ShowHelp);
        assert_eq!(parse(&["--bogus", "--help"]), CliAction::ShowHelp);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse(&["--unknown"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["run", "--invalid"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["start"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["get", "mode"]), CliAction::ShowHelpDueToError);
    }
}
