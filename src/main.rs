#![allow(clippy::cargo_common_metadata)]
use cmdstart::{
    App, CliError, Invocation,
    cli::usage,
    core::{Command, Flag},
    setup_logging,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<CliError>() {
            // Already reported by the dispatcher together with usage.
            Some(e) if e.is_recoverable() => ExitCode::from(2),
            _ => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run() -> anyhow::Result<()> {
    let mut app = App::from_executable()
        .description("A sample application: multiplies a number by a configurable factor.")
        .version(env!("CARGO_PKG_VERSION"));

    app.flag(Flag::switch("debug", "Enable debug logging"))?;
    app.flag(Flag::integer("factor", 2, "The factor to multiply with.").short('f'))?;
    app.add(
        Command::new("mult", multiply)
            .flags(["factor"])
            .short_help("Multiply an input parameter by a factor.")
            .long_help(
                "Usage: mult <parameter> [(--factor|-f) <factor>]\n\n\
                 Multiply an input parameter by the given factor. If no factor is \
                 given, the input is multiplied by 2.\n\
                 Example: multiply mult 3 -f 7",
            ),
    )?;

    app.parse_args(std::env::args_os())?;
    setup_logging(app.flags().is_set("debug")?)?;
    app.load_config()?;
    app.dispatch()
}

fn multiply(inv: &Invocation<'_>) -> anyhow::Result<()> {
    let Some(arg) = inv.args().first() else {
        eprintln!("{}", usage::command_usage(inv.app(), inv.command()));
        return Ok(());
    };
    let i: i64 = arg.parse()?;
    let f: i64 = inv.flags().get_as("factor")?;
    let product = i
        .checked_mul(f)
        .ok_or_else(|| anyhow::anyhow!("{i} * {f} overflows"))?;
    println!("{i} * {f} = {product}");
    Ok(())
}
