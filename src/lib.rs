//! # cmdstart
//!
//! A scaffold for command-line applications with commands, one level of
//! subcommands and flags whose values are layered from defaults, a TOML
//! config file, environment variables and the command line.
//!
//! ## Features
//!
//! - Commands and subcommands with per-command flag ownership
//! - Config file discovery (`$<APP>_CFGPATH`, user config dir, working dir)
//! - `<APP>_<FLAG>` environment overrides
//! - Built-in `help` and `version` commands
//! - External commands run as `<app>-<command>` executables
//!
//! ## Example
//!
//! ```no_run
//! use cmdstart::{
//!     cli::App,
//!     core::{Command, Flag},
//! };
//!
//! let mut app = App::new("greet").description("Says hello.");
//! app.flag(Flag::text("name", "world", "Who to greet").short('n'))?;
//! app.add(
//!     Command::new("hello", |inv| {
//!         println!("hello, {}", inv.flags().get("name")?);
//!         Ok(())
//!     })
//!     .flags(["name"]),
//! )?;
//! app.run(std::env::args_os())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use cli::{App, Invocation};
pub use error::{CliError, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging with appropriate verbosity
pub fn setup_logging(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
