//! Core functionality for command resolution
//!
//! Contains the command tree, the flag registry and the resolver that maps
//! argument vectors onto commands.

pub mod command;
pub mod flags;
pub mod resolver;

pub use command::{Action, Command, CommandTree};
pub use flags::{Flag, FlagKind, FlagRegistry, FlagSet, Source};
pub use resolver::{CommandResolver, ResolvedInvocation, Target};
