//! Command resolution
//!
//! Walks the positional arguments against the command tree and checks that
//! every supplied flag is either global or owned by the selected command.
//! Resolution never fails outright: when something is wrong the caller gets
//! the error together with a usage invocation it can still execute.

use crate::{
    core::{
        command::{Command, CommandTree},
        flags::{Flag, FlagSet},
    },
    error::CliError,
};
use std::collections::BTreeSet;
use tracing::debug;

/// What a resolved invocation executes
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A registered command
    Command(&'a Command),
    /// Usage for the whole application
    AppUsage,
    /// Usage for a single command
    CommandUsage(&'a Command),
}

/// A concrete target plus its residual positional arguments
#[derive(Debug, Clone)]
pub struct ResolvedInvocation<'a> {
    pub target: Target<'a>,
    pub args: Vec<String>,
    pub rejected: BTreeSet<String>,
}

impl<'a> ResolvedInvocation<'a> {
    fn new(target: Target<'a>, args: Vec<String>) -> Self {
        Self {
            target,
            args,
            rejected: BTreeSet::new(),
        }
    }

    fn app_usage() -> Self {
        Self::new(Target::AppUsage, Vec::new())
    }

    /// The selected command, if the target is one
    pub fn command(&self) -> Option<&'a Command> {
        match self.target {
            Target::Command(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Maps argv onto the command tree
#[derive(Debug, Clone, Copy)]
pub struct CommandResolver<'a> {
    tree: &'a CommandTree,
}

impl<'a> CommandResolver<'a> {
    pub fn new(tree: &'a CommandTree) -> Self {
        Self { tree }
    }

    /// Resolve positional arguments (flags already stripped) into an
    /// invocation. The invocation is always executable, the error says why
    /// it is a usage fallback.
    pub fn resolve(
        &self,
        argv: &[String],
        flags: &dyn FlagSet,
    ) -> (ResolvedInvocation<'a>, Option<CliError>) {
        let Some((name, rest)) = argv.split_first() else {
            debug!("No command given");
            return (ResolvedInvocation::app_usage(), None);
        };
        let Some(mut cmd) = self.tree.lookup(name) else {
            debug!("Unknown command {}, falling back to usage", name);
            return (ResolvedInvocation::app_usage(), None);
        };
        let mut rest = rest;

        if cmd.has_children() {
            match rest.first().and_then(|sub| cmd.child(sub)) {
                Some(child) => {
                    cmd = child;
                    rest = &rest[1..];
                }
                None if !cmd.has_action() => {
                    let available = cmd.children().map(|c| c.name().to_string()).collect();
                    return (
                        ResolvedInvocation::new(Target::CommandUsage(cmd), rest.to_vec()),
                        Some(CliError::missing_subcommand(cmd.name(), available)),
                    );
                }
                None => {}
            }
        }
        debug!("Resolved command {} with args {:?}", cmd.display_name(), rest);

        let rejected = self.rejected_flags(cmd, flags);
        if rejected.is_empty() {
            return (ResolvedInvocation::new(Target::Command(cmd), rest.to_vec()), None);
        }

        let error = CliError::UnknownFlags {
            flags: rejected.iter().cloned().collect(),
        };
        let mut invocation = ResolvedInvocation::new(Target::CommandUsage(cmd), rest.to_vec());
        invocation.rejected = rejected;
        (invocation, Some(error))
    }

    /// True if `flag` was passed in, is not owned by `command`, and is owned
    /// by some other command
    pub fn is_rejected(&self, flag: &Flag, command: &Command) -> bool {
        flag.was_supplied()
            && !command.owns(flag.name())
            && self.tree.owned_flags().contains(flag.name())
    }

    fn rejected_flags(&self, command: &Command, flags: &dyn FlagSet) -> BTreeSet<String> {
        let owned = self.tree.owned_flags();
        let mut rejected = BTreeSet::new();
        flags.visit_supplied(&mut |flag: &Flag| {
            if !command.owns(flag.name()) && owned.contains(flag.name()) {
                debug!("Flag --{} belongs to another command", flag.name());
                rejected.insert(flag.name().to_string());
            }
        });
        rejected
    }
}
