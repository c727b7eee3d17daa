//! Error types for the application scaffold
//!
//! Registration errors are fatal to startup. Resolution errors are
//! recoverable: the resolver always hands back a usable fallback invocation
//! next to them.

use crate::core::flags::Source;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the scaffold
#[derive(Error, Debug)]
pub enum CliError {
    /// A top-level command with this name is already registered
    #[error("command {name} already exists")]
    DuplicateCommand { name: String },

    /// The parent already owns a subcommand with this name
    #[error("subcommand {name} already exists for command {parent}")]
    DuplicateSubcommand { parent: String, name: String },

    /// The named parent is not a registered top-level command
    #[error("parent command {parent} not found for subcommand {name}")]
    UnknownParent { parent: String, name: String },

    /// The command can never execute anything
    #[error("command {name} has neither an action nor subcommands")]
    MissingAction { name: String },

    /// A command claims a flag the flag registry does not define
    #[error("command {command} owns flag --{flag}, which is not defined")]
    UndeclaredFlag { command: String, flag: String },

    /// A flag with this name is already defined
    #[error("flag --{name} is defined twice")]
    DuplicateFlag { name: String },

    /// The command needs a subcommand and none (or an unknown one) was given
    #[error("command {command} requires one of these subcommands: {}", available.join(", "))]
    MissingSubcommand {
        command: String,
        available: Vec<String>,
    },

    /// Flags owned by other commands were passed to this one
    #[error("unknown flag{}: {}", if flags.len() > 1 { "s" } else { "" }, flags.iter().map(|f| format!("--{f}")).collect::<Vec<_>>().join(", "))]
    UnknownFlags { flags: Vec<String> },

    /// The flag-parsing collaborator rejected the argument vector
    #[error("failed to parse command line: {source}")]
    FlagParse {
        #[source]
        source: clap::Error,
    },

    /// No flag with this name is registered
    #[error("flag --{name} does not exist")]
    UnknownFlag { name: String },

    /// A value from some source does not fit the flag's kind
    #[error("invalid value '{value}' for flag --{flag} (from {origin}): {reason}")]
    InvalidFlagValue {
        flag: String,
        value: String,
        origin: Source,
        reason: String,
    },

    /// The config file exists but could not be read
    #[error("failed to read config file {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML
    #[error("failed to parse config file {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// `help` was asked about a command that does not exist
    #[error("unknown command: {name}")]
    UnknownCommand { name: String },

    /// An external command could not be started or failed
    #[error("process error: {command} failed")]
    Process {
        command: String,
        exit_code: Option<i32>,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl CliError {
    /// Create a duplicate command error
    pub fn duplicate_command(name: impl Into<String>) -> Self {
        Self::DuplicateCommand { name: name.into() }
    }

    /// Create a duplicate subcommand error
    pub fn duplicate_subcommand(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateSubcommand {
            parent: parent.into(),
            name: name.into(),
        }
    }

    /// Create an unknown parent error
    pub fn unknown_parent(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownParent {
            parent: parent.into(),
            name: name.into(),
        }
    }

    /// Create a missing action error
    pub fn missing_action(name: impl Into<String>) -> Self {
        Self::MissingAction { name: name.into() }
    }

    /// Create a missing subcommand error
    pub fn missing_subcommand(command: impl Into<String>, available: Vec<String>) -> Self {
        Self::MissingSubcommand {
            command: command.into(),
            available,
        }
    }

    /// Create an unknown flag error
    pub fn unknown_flag(name: impl Into<String>) -> Self {
        Self::UnknownFlag { name: name.into() }
    }

    /// Create an invalid flag value error
    pub fn invalid_flag_value(
        flag: impl Into<String>,
        value: impl Into<String>,
        origin: Source,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFlagValue {
            flag: flag.into(),
            value: value.into(),
            origin,
            reason: reason.into(),
        }
    }

    /// Create a config read error
    pub fn config_read<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    /// Create a process error
    pub fn process(
        command: impl Into<String>,
        exit_code: Option<i32>,
        source: Option<std::io::Error>,
    ) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
            source,
        }
    }

    /// Resolution errors come with a fallback invocation the caller can
    /// still execute.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingSubcommand { .. } | Self::UnknownFlags { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CliError>;
