//! The application context and dispatcher
//!
//! [`App`] owns everything a run needs: flag definitions, the command tree
//! and the configuration state. A run goes through three steps:
//! 1. [`App::parse`] parses argv and merges the configuration layers
//! 2. [`App::resolve`] picks the command to execute
//! 3. [`App::execute`] runs it
//!
//! [`App::run`] does all three.

use crate::{
    cli::{commands, usage},
    config::{ConfigFile, ConfigLocator, ConfigReport, ConfigResolver},
    core::{
        Command, CommandResolver, CommandTree, Flag, FlagRegistry, FlagSet, ResolvedInvocation,
        Target,
    },
    error::{CliError, Result},
    utils::env::{self, Environment, ProcessEnv},
};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

const DEFAULT_VERSION: &str = "1.0";

type InitHook = Box<dyn Fn(&App) -> anyhow::Result<()>>;

/// What a command action receives
pub struct Invocation<'a> {
    app: &'a App,
    command: &'a Command,
    args: &'a [String],
}

impl<'a> Invocation<'a> {
    /// The application being run
    pub fn app(&self) -> &'a App {
        self.app
    }

    /// The command that was selected
    pub fn command(&self) -> &'a Command {
        self.command
    }

    /// Positional arguments after the command and subcommand names
    pub fn args(&self) -> &'a [String] {
        self.args
    }

    /// Shortcut for the application's flags
    pub fn flags(&self) -> &'a FlagRegistry {
        self.app.flags()
    }
}

/// A command-line application
pub struct App {
    name: String,
    about: String,
    version: String,
    config_hint: Option<PathBuf>,
    env: Box<dyn Environment>,
    flags: FlagRegistry,
    commands: CommandTree,
    config_resolver: ConfigResolver,
    config: ConfigFile,
    positionals: Vec<String>,
    init: Option<InitHook>,
}

impl App {
    /// Create an application. The name is sanitized for use in
    /// environment variable names.
    pub fn new(name: &str) -> Self {
        let name = env::sanitize(name);
        let mut commands = CommandTree::new();
        for builtin in commands::builtin_commands() {
            if let Err(e) = commands.register(builtin) {
                warn!("Failed to register built-in command: {}", e);
            }
        }
        Self {
            config_resolver: ConfigResolver::new(&name),
            name,
            about: String::new(),
            version: DEFAULT_VERSION.to_string(),
            config_hint: None,
            env: Box::new(ProcessEnv),
            flags: FlagRegistry::new(),
            commands,
            config: ConfigFile::empty(),
            positionals: Vec::new(),
            init: None,
        }
    }

    /// Create an application named after the running executable
    pub fn from_executable() -> Self {
        Self::new(&env::current_app_name())
    }

    /// Description shown at the top of the application usage
    #[must_use]
    pub fn description(mut self, text: &str) -> Self {
        self.about = text.to_string();
        self
    }

    /// Version printed by the `version` command
    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Name or path of the config file to look for
    #[must_use]
    pub fn config_file(mut self, hint: impl Into<PathBuf>) -> Self {
        self.config_hint = Some(hint.into());
        self
    }

    /// Replace the process environment, mainly for tests
    #[must_use]
    pub fn environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Hook that runs after configuration is resolved and before the
    /// command executes
    pub fn on_init<F>(&mut self, hook: F)
    where
        F: Fn(&App) -> anyhow::Result<()> + 'static,
    {
        self.init = Some(Box::new(hook));
    }

    /// Define a flag
    pub fn flag(&mut self, flag: Flag) -> Result<()> {
        self.flags.define(flag)
    }

    /// Register a command or subcommand
    pub fn add(&mut self, cmd: Command) -> Result<()> {
        self.commands.register(cmd)
    }

    /// Sanitized application name, also the environment variable prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Application description
    pub fn about(&self) -> &str {
        &self.about
    }

    /// Version printed by `version`
    pub fn version_string(&self) -> &str {
        &self.version
    }

    /// All defined flags
    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    /// The registered commands, built-ins included
    pub fn commands(&self) -> &CommandTree {
        &self.commands
    }

    /// Positional arguments from the last [`App::parse`]
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    /// The configuration document in use (empty if none was found)
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Path of the config file that was read, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config.path()
    }

    /// Effective value and source of every flag
    pub fn config_report(&self) -> ConfigReport {
        ConfigReport::new(&self.flags, &self.config)
    }

    /// Check the registrations, parse argv (program name first) and merge
    /// the configuration layers. Same as [`App::parse_args`] followed by
    /// [`App::load_config`].
    pub fn parse<I, T>(&mut self, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.parse_args(argv)?;
        self.load_config()
    }

    /// Check the registrations and parse argv. Afterwards flags hold
    /// their defaults and command-line values only.
    #[instrument(skip(self, argv), fields(app = %self.name))]
    pub fn parse_args<I, T>(&mut self, argv: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.validate()?;
        self.positionals = self.flags.parse(&self.name, argv)?;
        Ok(())
    }

    /// Find the config file and merge config-file and environment values.
    /// The file is searched for only once per application.
    #[instrument(skip(self), fields(app = %self.name))]
    pub fn load_config(&mut self) -> Result<()> {
        if !self.config_resolver.is_resolved() {
            self.config = self.discover_config()?;
        }
        self.config_resolver
            .resolve(&mut self.flags, &self.config, self.env.as_ref())
    }

    /// Search for the config file again and redo the merge, for callers
    /// that changed the environment or the file since [`App::parse`]
    pub fn reload_config(&mut self) -> Result<()> {
        self.config = self.discover_config()?;
        self.config_resolver
            .force_resolve(&mut self.flags, &self.config, self.env.as_ref())
    }

    fn discover_config(&self) -> Result<ConfigFile> {
        let locator = ConfigLocator::new(&self.name, self.config_hint.as_deref(), self.env.as_ref());
        let config = ConfigFile::discover(&locator)?;
        match config.path() {
            Some(path) => debug!("Configuration read from {}", path.display()),
            None => debug!("No configuration file found"),
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.commands.validate()?;
        for cmd in self.commands.all() {
            if let Some(flag) = cmd.owned_flags().iter().find(|f| self.flags.lookup(f.as_str()).is_none()) {
                return Err(CliError::UndeclaredFlag {
                    command: cmd.display_name(),
                    flag: flag.clone(),
                });
            }
        }
        Ok(())
    }

    /// Map the parsed positionals onto a command. See
    /// [`CommandResolver::resolve`].
    pub fn resolve(&self) -> (ResolvedInvocation<'_>, Option<CliError>) {
        CommandResolver::new(&self.commands).resolve(&self.positionals, &self.flags)
    }

    /// Execute a resolved invocation
    pub fn execute(&self, invocation: &ResolvedInvocation<'_>) -> anyhow::Result<()> {
        match invocation.target {
            Target::Command(command) => command.run(&Invocation {
                app: self,
                command,
                args: &invocation.args,
            }),
            Target::AppUsage => {
                eprintln!("{}", usage::app_usage(self));
                Ok(())
            }
            Target::CommandUsage(command) => {
                eprintln!("{}", usage::command_usage(self, command));
                Ok(())
            }
        }
    }

    /// Parse, resolve and execute. See [`App::dispatch`].
    pub fn run<I, T>(&mut self, argv: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.parse(argv)?;
        self.dispatch()
    }

    /// Run the init hook, then resolve and execute the parsed arguments.
    /// A resolution error is printed to stderr, the usage fallback runs,
    /// and the error is returned.
    pub fn dispatch(&self) -> anyhow::Result<()> {
        if let Some(init) = &self.init {
            init(self)?;
        }

        let (invocation, error) = self.resolve();
        if let Some(error) = error {
            eprintln!("{error}");
            self.execute(&invocation)?;
            return Err(error.into());
        }
        self.execute(&invocation)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("config_hint", &self.config_hint)
            .field("flags", &self.flags)
            .field("commands", &self.commands)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
