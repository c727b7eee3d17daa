//! Commands and the two-level command tree

use crate::{
    cli::{Invocation, commands::run_external},
    error::{CliError, Result},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
};
use tracing::debug;

/// What a command does when it is invoked
pub type Action = Box<dyn Fn(&Invocation<'_>) -> anyhow::Result<()>>;

/// A command or a subcommand
///
/// Leaf commands carry an action. Groups exist to hold subcommands and may
/// additionally carry an action, which runs when no subcommand is named.
pub struct Command {
    name: String,
    parent: Option<String>,
    flags: BTreeSet<String>,
    short_help: String,
    long_help: String,
    path: Option<PathBuf>,
    action: Option<Action>,
    group: bool,
    children: BTreeMap<String, Command>,
}

impl Command {
    fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            flags: BTreeSet::new(),
            short_help: String::new(),
            long_help: String::new(),
            path: None,
            action: None,
            group: false,
            children: BTreeMap::new(),
        }
    }

    /// A command that runs `action`
    pub fn new<F>(name: &str, action: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        let mut cmd = Self::bare(name);
        cmd.action = Some(Box::new(action));
        cmd
    }

    /// A command that exists to hold subcommands
    pub fn group(name: &str) -> Self {
        let mut cmd = Self::bare(name);
        cmd.group = true;
        cmd
    }

    /// A command that runs the executable `<app>-<name>` with its arguments
    pub fn external(name: &str) -> Self {
        Self::new(name, run_external)
    }

    /// Register this command as a subcommand of `parent`
    #[must_use]
    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = (!parent.is_empty()).then(|| parent.to_string());
        self
    }

    /// Declare the flags this command owns
    #[must_use]
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// One-line description for the command list
    #[must_use]
    pub fn short_help(mut self, text: &str) -> Self {
        self.short_help = text.to_string();
        self
    }

    /// Full description for `help <command>`
    #[must_use]
    pub fn long_help(mut self, text: &str) -> Self {
        self.long_help = text.to_string();
        self
    }

    /// Directory holding the executable of an external command
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach an action to a group
    #[must_use]
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<()> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Name as registered, without the parent
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent command name for subcommands
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Names of the flags this command owns
    pub fn owned_flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    /// Check whether `flag` belongs to this command
    pub fn owns(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// One-line description
    pub fn short_text(&self) -> &str {
        &self.short_help
    }

    /// Full description, may be empty
    pub fn long_text(&self) -> &str {
        &self.long_help
    }

    /// Directory of an external command's executable
    pub fn exec_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check whether the command can run on its own
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Run the action. A group without one never gets here through a
    /// validated tree, so reaching it is reported as `MissingAction`.
    pub(crate) fn run(&self, invocation: &Invocation<'_>) -> anyhow::Result<()> {
        match &self.action {
            Some(action) => action(invocation),
            None => Err(CliError::missing_action(self.display_name()).into()),
        }
    }

    /// Check whether subcommands are registered
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Subcommand by name
    pub fn child(&self, name: &str) -> Option<&Command> {
        self.children.get(name)
    }

    /// Subcommands in name order
    pub fn children(&self) -> impl Iterator<Item = &Command> {
        self.children.values()
    }

    /// Full name as typed on the command line, e.g. `do something`
    pub fn display_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("flags", &self.flags)
            .field("group", &self.group)
            .field("has_action", &self.action.is_some())
            .field("children", &self.children)
            .finish()
    }
}

/// Top-level commands by name, each with at most one level of children
#[derive(Debug, Default)]
pub struct CommandTree {
    commands: BTreeMap<String, Command>,
}

impl CommandTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level command, or a subcommand if `cmd` names a parent
    pub fn register(&mut self, cmd: Command) -> Result<()> {
        let Some(parent_name) = cmd.parent.clone() else {
            if self.commands.contains_key(&cmd.name) {
                return Err(CliError::duplicate_command(&cmd.name));
            }
            if !cmd.group && cmd.action.is_none() {
                return Err(CliError::missing_action(&cmd.name));
            }
            debug!("Registered command {}", cmd.name);
            self.commands.insert(cmd.name.clone(), cmd);
            return Ok(());
        };

        let parent = self
            .commands
            .get_mut(&parent_name)
            .ok_or_else(|| CliError::unknown_parent(&parent_name, &cmd.name))?;
        if parent.children.contains_key(&cmd.name) {
            return Err(CliError::duplicate_subcommand(&parent_name, &cmd.name));
        }
        if cmd.group || cmd.action.is_none() {
            return Err(CliError::missing_action(cmd.display_name()));
        }
        debug!("Registered subcommand {} {}", parent_name, cmd.name);
        parent.children.insert(cmd.name.clone(), cmd);
        Ok(())
    }

    /// Top-level lookup
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Subcommand lookup
    pub fn lookup_child(&self, parent: &str, name: &str) -> Option<&Command> {
        self.lookup(parent)?.child(name)
    }

    /// Top-level commands in name order
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    /// Every command, subcommands right after their parent
    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .values()
            .flat_map(|cmd| std::iter::once(cmd).chain(cmd.children()))
    }

    /// Union of all owned flags. Anything outside it is global.
    pub fn owned_flags(&self) -> BTreeSet<&str> {
        self.all()
            .flat_map(|cmd| cmd.flags.iter().map(String::as_str))
            .collect()
    }

    /// Reject groups that ended up with neither children nor an action
    pub fn validate(&self) -> Result<()> {
        match self
            .iter()
            .find(|cmd| !cmd.has_children() && !cmd.has_action())
        {
            Some(cmd) => Err(CliError::missing_action(&cmd.name)),
            None => Ok(()),
        }
    }

    /// Number of top-level commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
