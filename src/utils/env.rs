//! Environment lookup and application naming
//!
//! Environment access goes through the [`Environment`] trait so the
//! configuration layer can be exercised without touching the real process
//! environment.

use regex::Regex;
use std::{collections::HashMap, env, path::Path, sync::LazyLock};

static NOT_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^A-Za-z0-9_]").expect("identifier pattern compiles"));

/// Read access to environment variables
pub trait Environment {
    /// The variable's value, `None` if unset or not valid unicode
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize(name: &str) -> String {
    NOT_IDENT.replace_all(name, "_").into_owned()
}

/// Application name from an executable path: base name, extension
/// stripped, sanitized
pub fn app_name_from(executable: &Path) -> String {
    let stem = executable
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize(&stem)
}

/// Application name of the running executable
pub fn current_app_name() -> String {
    env::args_os()
        .next()
        .map(|arg0| app_name_from(Path::new(&arg0)))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "app".to_string())
}

/// `<APPNAME>_<SUFFIX>`, uppercased
pub fn env_key(app_name: &str, suffix: &str) -> String {
    format!("{}_{}", sanitize(app_name), sanitize(suffix)).to_uppercase()
}
