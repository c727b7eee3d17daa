//! Built-in command implementations

use crate::{
    cli::{Invocation, usage},
    core::Command,
    error::CliError,
    utils::process::ProcessRunner,
};
use tracing::instrument;

/// `help` and `version`, registered into every application
pub fn builtin_commands() -> Vec<Command> {
    vec![
        Command::new("help", help)
            .short_help("Show help for the application or a command")
            .long_help("Usage: help [<command> [<subcommand>]]\n\nWithout arguments, list all commands and global flags."),
        Command::new("version", version).short_help("Show the version"),
    ]
}

/// Print application usage, or usage for the named command
pub fn help(invocation: &Invocation<'_>) -> anyhow::Result<()> {
    let app = invocation.app();
    let text = match invocation.args() {
        [] => usage::app_usage(app),
        [name, rest @ ..] => {
            let cmd = app
                .commands()
                .lookup(name)
                .ok_or_else(|| CliError::UnknownCommand { name: name.clone() })?;
            let cmd = match rest.first() {
                Some(sub) => cmd.child(sub).ok_or_else(|| CliError::UnknownCommand {
                    name: format!("{name} {sub}"),
                })?,
                None => cmd,
            };
            usage::command_usage(app, cmd)
        }
    };
    eprintln!("{text}");
    Ok(())
}

/// Print `<app> version <version>`
pub fn version(invocation: &Invocation<'_>) -> anyhow::Result<()> {
    let app = invocation.app();
    eprintln!("{} version {}", app.name(), app.version_string());
    Ok(())
}

/// Run `<app>-<command>` with the residual arguments
#[instrument(skip(invocation), fields(command = %invocation.command().display_name()))]
pub fn run_external(invocation: &Invocation<'_>) -> anyhow::Result<()> {
    let cmd = invocation.command();
    let program = ProcessRunner::program_path(
        cmd.exec_path(),
        invocation.app().name(),
        &cmd.display_name().replace(' ', "-"),
    );
    ProcessRunner::new().run(&program, invocation.args())?;
    Ok(())
}
