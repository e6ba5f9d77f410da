//! Layered configuration for paperboy.
//!
//! Sources are merged in order, later sources winning:
//!
//! 1. Compiled defaults ([`Config::default`]).
//! 2. The user configuration file, `config.toml` in the platform config
//!    directory (e.g. `~/.config/paperboy/config.toml`), if it exists.
//! 3. An explicit configuration file (`.toml`, `.yaml`/`.yml` or `.json`).
//! 4. Environment variables prefixed with `PAPERBOY_`. Nested keys use a
//!    double underscore: `PAPERBOY_OPTIONS__MEDIA_TYPE=print`.
//!
//! ```toml
//! executable = "/usr/local/bin/weasyprint"
//! root_url = "https://cdn.example.com/"
//! caching = false
//! only = ["/invoices", "regex:^/reports/\\d+"]
//!
//! [options]
//! presentational_hints = true
//! media_type = "print"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use paperboy_render::{DEFAULT_EXECUTABLE, OptionValue, Options};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PAPERBOY_";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// WeasyPrint executable: an absolute path, or a name looked up on `PATH`.
    pub executable: PathBuf,
    /// Root URL prepended to root-relative `href`/`src` attributes before
    /// rendering. Derived from each request's scheme and host when unset.
    pub root_url: Option<String>,
    /// Keep `ETag` and `Cache-Control` headers on rendered PDFs.
    pub caching: bool,
    /// Default WeasyPrint options, applied to every render.
    pub options: BTreeMap<String, OptionValue>,
    /// Only render paths matching one of these rules. Plain strings are path
    /// prefixes; strings starting with `regex:` are patterns.
    pub only: Vec<String>,
    /// Render every path except those matching one of these rules. Ignored
    /// when `only` is non-empty.
    pub except: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            root_url: None,
            caching: false,
            options: BTreeMap::new(),
            only: Vec::new(),
            except: Vec::new(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(explicit)?)
    }

    /// Assembles the layered [`Figment`] without extracting it, so callers can
    /// merge in their own providers (command-line flags, tests).
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        if let Some(user) = user_config_path()
            && user.is_file()
        {
            tracing::debug!(path = %user.display(), "Loading user configuration");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::Load(format!("configuration file not found: {}", path.display())));
            }
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = match extension(path).as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates configuration from an assembled [`Figment`].
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "executable", reason: "must not be empty".to_string() });
        }
        if let Some(root) = &self.root_url {
            if !(root.starts_with("http://") || root.starts_with("https://")) {
                exn::bail!(ErrorKind::Invalid { field: "root_url", reason: "must be an http(s) URL".to_string() });
            }
            if !root.ends_with('/') {
                exn::bail!(ErrorKind::Invalid { field: "root_url", reason: "must end with a slash".to_string() });
            }
        }
        if !self.only.is_empty() && !self.except.is_empty() {
            tracing::warn!("Both `only` and `except` are configured; `except` will be ignored");
        }
        Ok(())
    }

    /// Default renderer options, in a form the renderer understands.
    pub fn renderer_options(&self) -> Options {
        Options::from(self.options.clone())
    }
}

/// `config.toml` inside the platform-specific configuration directory.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "paperboy").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}
