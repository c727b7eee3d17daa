//! Layered configuration
//!
//! Every flag value is resolved from four sources. Later sources win:
//! 1. the flag's built-in default
//! 2. a top-level key of the config file with the flag's name
//! 3. the environment variable `<APPNAME>_<FLAGNAME>`
//! 4. the command line
//!
//! The command-line layer is filled by the flag parser and always wins.
//! This module fills layers 2 and 3.

pub mod source;

pub use crate::core::flags::ConfigValue;
pub use source::{ConfigFile, ConfigLocator};

use crate::{
    core::flags::{Flag, FlagSet, Source},
    error::Result,
    utils::env::{Environment, env_key},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Merges config-file and environment values into a flag set
///
/// The merge runs once; later calls to [`ConfigResolver::resolve`] are
/// no-ops until [`ConfigResolver::force_resolve`] is used.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    app_name: String,
    resolved: bool,
}

impl ConfigResolver {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            resolved: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Apply config-file and environment values unless already done
    pub fn resolve(
        &mut self,
        flags: &mut dyn FlagSet,
        source: &ConfigFile,
        env: &dyn Environment,
    ) -> Result<()> {
        if self.resolved {
            debug!("Configuration already resolved");
            return Ok(());
        }
        self.merge(flags, source, env)?;
        self.resolved = true;
        Ok(())
    }

    /// Drop previously merged values and merge again
    pub fn force_resolve(
        &mut self,
        flags: &mut dyn FlagSet,
        source: &ConfigFile,
        env: &dyn Environment,
    ) -> Result<()> {
        flags.clear_layer(Source::ConfigFile);
        flags.clear_layer(Source::Environment);
        self.resolved = false;
        self.resolve(flags, source, env)
    }

    #[instrument(skip_all, fields(app = %self.app_name))]
    fn merge(
        &self,
        flags: &mut dyn FlagSet,
        source: &ConfigFile,
        env: &dyn Environment,
    ) -> Result<()> {
        let mut names = Vec::new();
        flags.visit_all(&mut |flag: &Flag| names.push(flag.name().to_string()));

        for name in names {
            if let Some(value) = source.string(&name).filter(|v| !v.is_empty()) {
                debug!("--{} from config file: {}", name, value);
                flags.set_layer(&name, Source::ConfigFile, &value)?;
            }

            let key = env_key(&self.app_name, &name);
            if let Some(value) = env.var(&key).filter(|v| !v.is_empty()) {
                debug!("--{} from ${}: {}", name, key, value);
                flags.set_layer(&name, Source::Environment, &value)?;
            }
        }
        Ok(())
    }
}

/// Effective configuration, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<String>,
    pub flags: BTreeMap<String, ConfigValue>,
}

impl ConfigReport {
    pub fn new(flags: &dyn FlagSet, source: &ConfigFile) -> Self {
        let mut values = BTreeMap::new();
        flags.visit_all(&mut |flag: &Flag| {
            values.insert(flag.name().to_string(), flag.resolved());
        });
        Self {
            config_file: source.path().map(|p| p.display().to_string()),
            flags: values,
        }
    }

    /// Render as a TOML document
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
