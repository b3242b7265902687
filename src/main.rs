//! Binary entry point: parse arguments and hand off to a command.
//!
//! - `run`: the daemon, see [`darkman::commands::run`]
//! - `get`, `set`, `toggle`: one-shot D-Bus clients of a running daemon
//! - `--help`, `--version`
//!
//! Errors from any command end the process with a non-zero exit code after
//! being printed through the logger.

use darkman::args::{self, CliAction, ParsedArgs};
use darkman::commands;
use darkman::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use darkman::logger::Log;
use darkman::log_error_exit;

fn main() {
    let parsed_args = ParsedArgs::from_env();

    let result = match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
        } => darkman::config::set_config_dir(config_dir)
            .and_then(|()| commands::run::handle_run_command(debug_enabled)),
        CliAction::Get => commands::get::handle_get_command(),
        CliAction::Set { mode } => commands::set::handle_set_command(mode),
        CliAction::Toggle => commands::set::handle_toggle_command(),
    };

    if let Err(e) = result {
        // Client commands silence the logger; errors must still be seen
        Log::set_enabled(true);
        log_error_exit!("{e:#}");
        std::process::exit(EXIT_FAILURE);
    }
    std::process::exit(EXIT_SUCCESS);
}
