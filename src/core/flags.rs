//! Flag definitions and the clap-backed flag registry
//!
//! Every flag keeps one value per source. The effective value is the one
//! from the highest-precedence source that supplied anything, falling back
//! to the built-in default.

use crate::error::{CliError, Result};
use clap::{Arg, ArgAction, parser::ValueSource};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, str::FromStr};
use tracing::{debug, instrument};

/// Clap id for the positional arguments. Not a valid long flag name.
const POSITIONALS: &str = "<positionals>";

/// Where a flag value came from, in ascending precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Default,
    ConfigFile,
    Environment,
    CommandLine,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::ConfigFile => "config file",
            Self::Environment => "environment",
            Self::CommandLine => "command line",
        };
        f.write_str(name)
    }
}

/// Value type a flag accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Text,
    Integer,
    Float,
    Switch,
}

impl FlagKind {
    /// Check that `value` can be read as this kind
    fn check(self, value: &str) -> std::result::Result<(), String> {
        match self {
            Self::Text => Ok(()),
            Self::Integer => value.parse::<i64>().map(drop).map_err(|e| e.to_string()),
            Self::Float => value.parse::<f64>().map(drop).map_err(|e| e.to_string()),
            Self::Switch => parse_switch(value)
                .map(drop)
                .ok_or_else(|| "expected a boolean".to_string()),
        }
    }
}

/// Accepts the usual spellings of a boolean
fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Resolved flag value together with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValue {
    pub value: String,
    pub source: Source,
}

/// A single flag definition and its per-source values
#[derive(Debug, Clone)]
pub struct Flag {
    name: String,
    short: Option<char>,
    help: String,
    kind: FlagKind,
    default: String,
    layers: BTreeMap<Source, String>,
}

impl Flag {
    fn with_kind(name: &str, kind: FlagKind, default: String, help: &str) -> Self {
        Self {
            name: name.to_string(),
            short: None,
            help: help.to_string(),
            kind,
            default,
            layers: BTreeMap::new(),
        }
    }

    /// A free-form string flag
    pub fn text(name: &str, default: &str, help: &str) -> Self {
        Self::with_kind(name, FlagKind::Text, default.to_string(), help)
    }

    /// An integer flag
    pub fn integer(name: &str, default: i64, help: &str) -> Self {
        Self::with_kind(name, FlagKind::Integer, default.to_string(), help)
    }

    /// A floating point flag
    pub fn float(name: &str, default: f64, help: &str) -> Self {
        Self::with_kind(name, FlagKind::Float, default.to_string(), help)
    }

    /// A boolean switch, `false` unless given
    pub fn switch(name: &str, help: &str) -> Self {
        Self::with_kind(name, FlagKind::Switch, "false".to_string(), help)
    }

    /// Add a single-character alias
    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Long name, used as `--name`, config key and environment suffix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Single-character alias, if any
    pub fn short_name(&self) -> Option<char> {
        self.short
    }

    /// Help text for usage output
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Value type the flag accepts
    pub fn kind(&self) -> FlagKind {
        self.kind
    }

    /// Built-in default as text
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// The effective value
    pub fn value(&self) -> &str {
        self.layers
            .values()
            .next_back()
            .map_or(self.default.as_str(), String::as_str)
    }

    /// The source of the effective value
    pub fn source(&self) -> Source {
        self.layers
            .keys()
            .next_back()
            .copied()
            .unwrap_or(Source::Default)
    }

    /// Effective value and provenance
    pub fn resolved(&self) -> ConfigValue {
        ConfigValue {
            value: self.value().to_string(),
            source: self.source(),
        }
    }

    /// True if the flag was present in argv
    pub fn was_supplied(&self) -> bool {
        self.layers.contains_key(&Source::CommandLine)
    }

    fn set_layer(&mut self, source: Source, value: &str) -> Result<()> {
        self.kind
            .check(value)
            .map_err(|reason| CliError::invalid_flag_value(&self.name, value, source, reason))?;
        if source == Source::Default {
            self.default = value.to_string();
        } else {
            self.layers.insert(source, value.to_string());
        }
        Ok(())
    }

    fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone()).long(self.name.clone());
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        match self.kind {
            FlagKind::Switch => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_name("BOOL"),
            _ => arg
                .action(ArgAction::Set)
                .value_name("VALUE")
                .allow_negative_numbers(true),
        }
    }
}

/// Capability set the configuration and command layers need from a flag
/// parser. Any flag library can sit behind it.
pub trait FlagSet {
    /// Look up a flag by its long name
    fn lookup(&self, name: &str) -> Option<&Flag>;

    /// Visit every registered flag
    fn visit_all(&self, visit: &mut dyn FnMut(&Flag));

    /// Visit the flags that were present in argv
    fn visit_supplied(&self, visit: &mut dyn FnMut(&Flag)) {
        self.visit_all(&mut |flag: &Flag| {
            if flag.was_supplied() {
                visit(flag);
            }
        });
    }

    /// Store a value for one source
    fn set_layer(&mut self, name: &str, source: Source, value: &str) -> Result<()>;

    /// Forget every value that came from `source`
    fn clear_layer(&mut self, source: Source);
}

/// Flag registry backed by clap's builder API
#[derive(Debug, Default)]
pub struct FlagRegistry {
    flags: BTreeMap<String, Flag>,
}

impl FlagRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new flag
    pub fn define(&mut self, flag: Flag) -> Result<()> {
        let short_taken = flag
            .short
            .is_some_and(|s| self.flags.values().any(|f| f.short == Some(s)));
        if self.flags.contains_key(&flag.name) || short_taken {
            return Err(CliError::DuplicateFlag {
                name: flag.name.clone(),
            });
        }
        self.flags.insert(flag.name.clone(), flag);
        Ok(())
    }

    /// Parse argv (program name first) and record every supplied flag in
    /// the command-line layer. Returns the positional arguments.
    #[instrument(skip(self, argv))]
    pub fn parse<I, T>(&mut self, app_name: &str, argv: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = self
            .clap_command(app_name)
            .try_get_matches_from(argv)
            .map_err(|source| CliError::FlagParse { source })?;

        self.clear_layer(Source::CommandLine);
        for flag in self.flags.values_mut() {
            if matches.value_source(&flag.name) != Some(ValueSource::CommandLine) {
                continue;
            }
            let value = matches
                .get_one::<String>(&flag.name)
                .cloned()
                .unwrap_or_default();
            debug!("--{} supplied on the command line: {}", flag.name, value);
            flag.set_layer(Source::CommandLine, &value)?;
        }

        let positionals: Vec<String> = matches
            .get_many::<String>(POSITIONALS)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        debug!("Positional arguments: {:?}", positionals);
        Ok(positionals)
    }

    fn clap_command(&self, app_name: &str) -> clap::Command {
        let positionals = Arg::new(POSITIONALS)
            .num_args(0..)
            .action(ArgAction::Append)
            .allow_negative_numbers(true);
        clap::Command::new(app_name.to_string())
            .disable_help_flag(true)
            .disable_version_flag(true)
            .args_override_self(true)
            .args(self.flags.values().map(Flag::to_arg))
            .arg(positionals)
    }

    /// Effective value of a flag
    pub fn get(&self, name: &str) -> Result<&str> {
        self.lookup(name)
            .map(Flag::value)
            .ok_or_else(|| CliError::unknown_flag(name))
    }

    /// Effective value of a flag, parsed into `T`
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let flag = self.lookup(name).ok_or_else(|| CliError::unknown_flag(name))?;
        flag.value().parse::<T>().map_err(|e| {
            CliError::invalid_flag_value(name, flag.value(), flag.source(), e.to_string())
        })
    }

    /// Effective value of a switch
    pub fn is_set(&self, name: &str) -> Result<bool> {
        let flag = self.lookup(name).ok_or_else(|| CliError::unknown_flag(name))?;
        parse_switch(flag.value()).ok_or_else(|| {
            CliError::invalid_flag_value(name, flag.value(), flag.source(), "expected a boolean")
        })
    }

    /// Flags in name order
    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    /// Number of defined flags
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl FlagSet for FlagRegistry {
    fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    fn visit_all(&self, visit: &mut dyn FnMut(&Flag)) {
        for flag in self.flags.values() {
            visit(flag);
        }
    }

    fn set_layer(&mut self, name: &str, source: Source, value: &str) -> Result<()> {
        self.flags
            .get_mut(name)
            .ok_or_else(|| CliError::unknown_flag(name))?
            .set_layer(source, value)
    }

    fn clear_layer(&mut self, source: Source) {
        for flag in self.flags.values_mut() {
            flag.layers.remove(&source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FlagRegistry {
        let mut flags = FlagRegistry::new();
        flags.define(Flag::switch("yes", "A boolean flag").short('y')).unwrap();
        flags.define(Flag::integer("size", 23, "An int flag").short('s')).unwrap();
        flags
            .define(Flag::text("global", "global flag", "A global string flag").short('g'))
            .unwrap();
        flags
    }

    #[test]
    fn test_defaults_without_arguments() {
        let mut flags = registry();
        let positionals = flags.parse("test", ["test"]).unwrap();

        assert!(positionals.is_empty());
        assert!(!flags.is_set("yes").unwrap());
        assert_eq!(flags.get_as::<i64>("size").unwrap(), 23);
        assert_eq!(flags.get("global").unwrap(), "global flag");
        assert_eq!(flags.lookup("size").unwrap().source(), Source::Default);
    }

    #[test]
    fn test_parse_interleaved_flags_and_positionals() {
        let mut flags = registry();
        let positionals = flags
            .parse("test", ["test", "flags", "--size=42", "arg1", "-y", "arg2"])
            .unwrap();

        assert_eq!(positionals, vec!["flags", "arg1", "arg2"]);
        assert_eq!(flags.get_as::<i64>("size").unwrap(), 42);
        assert!(flags.is_set("yes").unwrap());

        let mut supplied = Vec::new();
        flags.visit_supplied(&mut |f: &Flag| supplied.push(f.name().to_string()));
        assert_eq!(supplied, vec!["size", "yes"]);
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let mut flags = registry();
        let positionals = flags.parse("test", ["test", "mult", "-3", "--size=-7"]).unwrap();

        assert_eq!(positionals, vec!["mult", "-3"]);
        assert_eq!(flags.get_as::<i64>("size").unwrap(), -7);
    }

    #[test]
    fn test_repeated_flag_keeps_last_value() {
        let mut flags = registry();
        flags.parse("test", ["test", "-s", "1", "--size", "2"]).unwrap();
        assert_eq!(flags.get("size").unwrap(), "2");
    }

    #[test]
    fn test_undefined_flag_is_a_parse_error() {
        let mut flags = registry();
        let result = flags.parse("test", ["test", "--nope"]);
        assert!(matches!(result, Err(CliError::FlagParse { .. })));
    }

    #[test]
    fn test_invalid_command_line_value() {
        let mut flags = registry();
        let result = flags.parse("test", ["test", "--size=many"]);
        match result {
            Err(CliError::InvalidFlagValue { flag, origin, .. }) => {
                assert_eq!(flag, "size");
                assert_eq!(origin, Source::CommandLine);
            }
            other => panic!("Expected InvalidFlagValue, got {other:?}"),
        }
    }

    #[test]
    fn test_layer_precedence() {
        let mut flags = registry();
        flags.set_layer("global", Source::ConfigFile, "from config").unwrap();
        assert_eq!(flags.get("global").unwrap(), "from config");

        flags.set_layer("global", Source::Environment, "from env").unwrap();
        assert_eq!(flags.get("global").unwrap(), "from env");

        // The config file arriving late does not beat the environment.
        flags.set_layer("global", Source::ConfigFile, "config again").unwrap();
        assert_eq!(flags.get("global").unwrap(), "from env");
        assert_eq!(flags.lookup("global").unwrap().source(), Source::Environment);

        flags.clear_layer(Source::Environment);
        assert_eq!(flags.get("global").unwrap(), "config again");
    }

    #[test]
    fn test_command_line_is_reapplied_after_parse() {
        let mut flags = registry();
        flags.parse("test", ["test", "-g", "from cli"]).unwrap();
        flags.set_layer("global", Source::Environment, "from env").unwrap();

        let resolved = flags.lookup("global").unwrap().resolved();
        assert_eq!(resolved.value, "from cli");
        assert_eq!(resolved.source, Source::CommandLine);
    }

    #[test]
    fn test_switch_spellings() {
        let mut flags = registry();
        flags.set_layer("yes", Source::Environment, "1").unwrap();
        assert!(flags.is_set("yes").unwrap());
        flags.set_layer("yes", Source::Environment, "False").unwrap();
        assert!(!flags.is_set("yes").unwrap());
        assert!(flags.set_layer("yes", Source::Environment, "maybe").is_err());
    }

    #[test]
    fn test_switch_with_explicit_value() {
        let mut flags = registry();
        let positionals = flags
            .parse("test", ["test", "--yes=false", "arg"])
            .unwrap();
        assert_eq!(positionals, vec!["arg"]);
        assert!(!flags.is_set("yes").unwrap());
        assert_eq!(flags.lookup("yes").unwrap().source(), Source::CommandLine);

        flags.parse("test", ["test", "-y=1"]).unwrap();
        assert!(flags.is_set("yes").unwrap());

        assert!(matches!(
            flags.parse("test", ["test", "--yes=maybe"]),
            Err(CliError::InvalidFlagValue { origin: Source::CommandLine, .. })
        ));
    }

    #[test]
    fn test_duplicate_definitions() {
        let mut flags = registry();
        assert!(matches!(
            flags.define(Flag::switch("yes", "again")),
            Err(CliError::DuplicateFlag { .. })
        ));
        assert!(matches!(
            flags.define(Flag::switch("yolo", "same short").short('y')),
            Err(CliError::DuplicateFlag { .. })
        ));
    }

    #[test]
    fn test_unknown_flag_lookup() {
        let mut flags = registry();
        assert!(matches!(flags.get("nope"), Err(CliError::UnknownFlag { .. })));
        assert!(matches!(
            flags.set_layer("nope", Source::ConfigFile, "x"),
            Err(CliError::UnknownFlag { .. })
        ));
    }
}
