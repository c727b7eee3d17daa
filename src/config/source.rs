//! Config file discovery and lookup
//!
//! # Search order
//!
//! The first existing file wins:
//! 1. an absolute hint: the file itself, or `<appname>.toml` inside it when
//!    it is a directory
//! 2. `$<APPNAME>_CFGPATH`, joined with the hint if there is one
//! 3. `<user config dir>/<appname>/<hint or config.toml>`
//! 4. `<cwd>/<hint or <appname>.toml>`
//!
//! Finding nothing is not an error. [`ConfigFile::path`] tells whether a file
//! was read.

use crate::{
    error::{CliError, Result},
    utils::{
        env::{Environment, env_key},
        fs::FileSystemUtils,
    },
};
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, instrument};

/// Computes the config file search path for one application
pub struct ConfigLocator<'a> {
    app_name: &'a str,
    hint: Option<&'a Path>,
    env: &'a dyn Environment,
    user_config_dir: Option<PathBuf>,
    cwd: Option<PathBuf>,
    fs: FileSystemUtils,
}

impl<'a> ConfigLocator<'a> {
    /// Locator using the OS user config dir and the current directory
    pub fn new(app_name: &'a str, hint: Option<&'a Path>, env: &'a dyn Environment) -> Self {
        let fs = FileSystemUtils::new();
        Self {
            app_name,
            hint: hint.filter(|h| !h.as_os_str().is_empty()),
            env,
            user_config_dir: dirs::config_dir().map(|dir| dir.join(app_name)),
            cwd: fs.current_dir().ok(),
            fs,
        }
    }

    /// Override the per-user config directory (`None` skips that step)
    #[must_use]
    pub fn with_user_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.user_config_dir = dir;
        self
    }

    /// Override the working directory (`None` skips that step)
    #[must_use]
    pub fn with_cwd(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    fn default_file_name(&self) -> String {
        format!("{}.toml", self.app_name)
    }

    /// Every path the search will try, in order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(hint) = self.hint.filter(|h| h.is_absolute()) {
            if self.fs.is_dir(hint) {
                candidates.push(hint.join(self.default_file_name()));
            } else {
                candidates.push(hint.to_path_buf());
            }
        }

        let cfg_path_key = env_key(self.app_name, "CFGPATH");
        if let Some(dir) = self.env.var(&cfg_path_key).filter(|v| !v.is_empty()) {
            let dir = PathBuf::from(dir);
            candidates.push(match self.hint {
                Some(hint) => dir.join(hint),
                None => dir,
            });
        }

        if let Some(dir) = &self.user_config_dir {
            candidates.push(dir.join(self.hint.unwrap_or(Path::new("config.toml"))));
        }

        if let Some(cwd) = &self.cwd {
            candidates.push(match self.hint {
                Some(hint) => cwd.join(hint),
                None => cwd.join(self.default_file_name()),
            });
        }

        candidates.dedup();
        candidates
    }

    /// The first candidate that exists as a file
    #[instrument(skip(self), fields(app = self.app_name))]
    pub fn locate(&self) -> Option<PathBuf> {
        for candidate in self.candidates() {
            if self.fs.is_file(&candidate) {
                debug!("Using config file {}", candidate.display());
                return Some(candidate);
            }
            debug!("No config file at {}", candidate.display());
        }
        None
    }
}

/// A parsed configuration document. Empty when no file was found.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    doc: Table,
}

impl ConfigFile {
    /// No file, no values
    pub fn empty() -> Self {
        Self::default()
    }

    /// Search for a config file and read it if one exists
    pub fn discover(locator: &ConfigLocator<'_>) -> Result<Self> {
        match locator.locate() {
            Some(path) => Self::read(path),
            None => Ok(Self::empty()),
        }
    }

    /// Read and parse the file at `path`
    pub fn read<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let text = FileSystemUtils::new()
            .read_file_to_string(&path)
            .map_err(|e| CliError::config_read(&path, e))?;
        Self::parse(path, &text)
    }

    /// Parse `text` as if it had been read from `path`
    pub fn parse<P: Into<PathBuf>>(path: P, text: &str) -> Result<Self> {
        let path = path.into();
        let doc = text
            .parse::<Table>()
            .map_err(|source| CliError::ConfigParse {
                path: path.clone(),
                source,
            })?;
        debug!("Loaded {} keys from {}", doc.len(), path.display());
        Ok(Self {
            path: Some(path),
            doc,
        })
    }

    /// Path of the file that was read, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The whole document
    pub fn document(&self) -> &Table {
        &self.doc
    }

    /// Value of a top-level key as a string. Sections are not visible;
    /// other values are coerced to their textual form.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.doc.get(key)? {
            Value::Table(_) => None,
            value => Some(value_text(value)),
        }
    }
}

/// Strings and datetimes as written, arrays as `[a, b]`, other scalars in
/// TOML form
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Datetime(dt) => dt.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(value_text).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, fs};
    use tempfile::TempDir;

    const TEST_TOML: &str = r#"
astring = "From Config File"
abool = true
anint = 42
afloat = 2.5
adate = 2014-08-17T09:25:00Z
alist = [1, 2]
adates = [1979-05-27, "x"]

[section]
hidden = "not a flag"
"#;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_string_coercion() {
        let cfg = ConfigFile::parse("test.toml", TEST_TOML).unwrap();
        assert_eq!(cfg.string("astring").as_deref(), Some("From Config File"));
        assert_eq!(cfg.string("abool").as_deref(), Some("true"));
        assert_eq!(cfg.string("anint").as_deref(), Some("42"));
        assert_eq!(cfg.string("afloat").as_deref(), Some("2.5"));
        assert_eq!(cfg.string("adate").as_deref(), Some("2014-08-17T09:25:00Z"));
        assert_eq!(cfg.string("alist").as_deref(), Some("[1, 2]"));
        assert_eq!(cfg.string("adates").as_deref(), Some("[1979-05-27, x]"));
        assert_eq!(cfg.string("section"), None);
        assert_eq!(cfg.string("hidden"), None);
        assert_eq!(cfg.string("missing"), None);
    }

    #[test]
    fn test_parse_error() {
        let result = ConfigFile::parse("broken.toml", "this is = = not toml");
        assert!(matches!(result, Err(CliError::ConfigParse { .. })));
    }

    #[test]
    fn test_empty_file_has_no_path() {
        let cfg = ConfigFile::empty();
        assert!(cfg.path().is_none());
        assert!(cfg.document().is_empty());
    }

    #[test]
    fn test_absolute_file_hint() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("custom.toml");
        fs::write(&file, "anint = 1").unwrap();

        let env = no_env();
        let locator = ConfigLocator::new("start", Some(file.as_path()), &env)
            .with_user_config_dir(None)
            .with_cwd(None);
        assert_eq!(locator.locate(), Some(file.clone()));

        let cfg = ConfigFile::discover(&locator).unwrap();
        assert_eq!(cfg.path(), Some(file.as_path()));
        assert_eq!(cfg.string("anint").as_deref(), Some("1"));
    }

    #[test]
    fn test_absolute_directory_hint() {
        let temp = TempDir::new().unwrap();
        let env = no_env();
        let locator = ConfigLocator::new("start", Some(temp.path()), &env)
            .with_user_config_dir(None)
            .with_cwd(None);

        assert_eq!(locator.candidates(), vec![temp.path().join("start.toml")]);
        assert_eq!(locator.locate(), None);

        fs::write(temp.path().join("start.toml"), "").unwrap();
        assert_eq!(locator.locate(), Some(temp.path().join("start.toml")));
    }

    #[test]
    fn test_cfgpath_environment_variable() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("test.toml"), "anint = 7").unwrap();

        let mut env = no_env();
        env.insert(
            "START_CFGPATH".to_string(),
            temp.path().to_string_lossy().into_owned(),
        );
        let hint = Path::new("test.toml");
        let locator = ConfigLocator::new("start", Some(hint), &env)
            .with_user_config_dir(None)
            .with_cwd(None);

        assert_eq!(locator.locate(), Some(temp.path().join("test.toml")));
    }

    #[test]
    fn test_cfgpath_pointing_at_a_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("elsewhere.toml");
        fs::write(&file, "").unwrap();

        let mut env = no_env();
        env.insert("START_CFGPATH".to_string(), file.to_string_lossy().into_owned());
        let locator = ConfigLocator::new("start", None, &env)
            .with_user_config_dir(None)
            .with_cwd(None);

        assert_eq!(locator.locate(), Some(file));
    }

    #[test]
    fn test_user_config_dir_uses_config_toml() {
        let user_dir = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(user_dir.path().join("config.toml"), "").unwrap();
        fs::write(cwd.path().join("start.toml"), "").unwrap();

        let env = no_env();
        let locator = ConfigLocator::new("start", None, &env)
            .with_user_config_dir(Some(user_dir.path().to_path_buf()))
            .with_cwd(Some(cwd.path().to_path_buf()));

        assert_eq!(locator.locate(), Some(user_dir.path().join("config.toml")));
    }

    #[test]
    fn test_falls_back_to_working_directory() {
        let user_dir = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();

        let env = no_env();
        let locator = ConfigLocator::new("start", None, &env)
            .with_user_config_dir(Some(user_dir.path().to_path_buf()))
            .with_cwd(Some(cwd.path().to_path_buf()));

        let candidates = locator.candidates();
        assert_eq!(
            candidates,
            vec![
                user_dir.path().join("config.toml"),
                cwd.path().join("start.toml"),
            ]
        );

        // Nothing exists: no error, no path.
        let cfg = ConfigFile::discover(&locator).unwrap();
        assert!(cfg.path().is_none());

        fs::write(cwd.path().join("start.toml"), "anint = 3").unwrap();
        let cfg = ConfigFile::discover(&locator).unwrap();
        assert_eq!(cfg.path(), Some(cwd.path().join("start.toml").as_path()));
    }

    #[test]
    fn test_relative_hint_in_working_directory() {
        let cwd = TempDir::new().unwrap();
        fs::create_dir(cwd.path().join("test")).unwrap();
        fs::write(cwd.path().join("test/test.toml"), TEST_TOML).unwrap();

        let env = no_env();
        let hint = Path::new("test/test.toml");
        let locator = ConfigLocator::new("start", Some(hint), &env)
            .with_user_config_dir(None)
            .with_cwd(Some(cwd.path().to_path_buf()));

        let cfg = ConfigFile::discover(&locator).unwrap();
        assert_eq!(cfg.string("anint").as_deref(), Some("42"));
    }
}
