//! Usage text for the application and for single commands

use crate::{
    cli::App,
    core::{Command, Flag, FlagKind, FlagSet},
};

/// Overview: description, commands, global flags
pub fn app_usage(app: &App) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n\n", app.name()));
    if !app.about().is_empty() {
        out.push_str(&format!("{}\n\n", app.about()));
    }

    let commands = app.commands();
    if !commands.is_empty() {
        let width = commands.iter().map(|c| c.name().len()).max().unwrap_or(0);
        out.push_str("Available commands:\n\n");
        for cmd in commands.iter() {
            out.push_str(&format!("{:<width$}  {}\n", cmd.name(), cmd.short_text()));
        }
        out.push('\n');
    }

    let owned = commands.owned_flags();
    let globals: Vec<&Flag> = app
        .flags()
        .iter()
        .filter(|f| !owned.contains(f.name()))
        .collect();
    if !globals.is_empty() {
        out.push_str("Available global flags:\n\n");
        out.push_str(&flag_table(&globals));
        out.push('\n');
    }

    out.push_str("Type help <command> to get help for a specific command.\n");
    out
}

/// Long help, subcommands and command-specific flags
pub fn command_usage(app: &App, cmd: &Command) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n\n", cmd.display_name()));
    if !cmd.long_text().is_empty() {
        out.push_str(&format!("{}\n", cmd.long_text()));
    } else if !cmd.short_text().is_empty() {
        out.push_str(&format!("{}\n", cmd.short_text()));
    }

    if cmd.has_children() {
        let width = cmd.children().map(|c| c.name().len()).max().unwrap_or(0);
        out.push_str("\nSubcommands:\n\n");
        for child in cmd.children() {
            out.push_str(&format!("{:<width$}  {}\n", child.name(), child.short_text()));
        }
    }

    let owned: Vec<&Flag> = cmd
        .owned_flags()
        .iter()
        .filter_map(|name| app.flags().lookup(name))
        .collect();
    if !owned.is_empty() {
        out.push_str("\nCommand-specific flags:\n\n");
        out.push_str(&flag_table(&owned));
    }
    out
}

/// `-s, --size=23  help`, left column padded to the widest entry
fn flag_table(flags: &[&Flag]) -> String {
    let rows: Vec<(String, &str)> = flags
        .iter()
        .map(|flag| {
            let short = flag
                .short_name()
                .map_or_else(|| "    ".to_string(), |s| format!("-{s}, "));
            let left = match flag.kind() {
                FlagKind::Switch => format!("{short}--{}", flag.name()),
                _ => format!("{short}--{}={}", flag.name(), flag.default_value()),
            };
            (left, flag.help())
        })
        .collect();

    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (left, help) in rows {
        out.push_str(&format!("{left:<width$}  {help}\n"));
    }
    out
}
