//! Configuration management for kiln.
//!
//! Parses `kiln.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! The core only owns a handful of well-known fields (site URL, content and
//! output directories, cache and concurrency settings). Everything under
//! `[plugins.<name>]` is kept as a loosely-typed TOML table: plugins are
//! developed independently, so each one reads its own sub-section through
//! [`Config::plugin`] into a typed struct of its choosing.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `site.url`, `build.content_dir` and `build.output_dir` support
//! `${VAR}` and `${VAR:-default}` expansion.

mod expand;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override content directory.
    pub content_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override worker count for concurrent dispatch.
    pub workers: Option<usize>,
    /// Override draft inclusion.
    pub include_drafts: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "kiln.toml";

/// Default glob for content files.
const DEFAULT_PATTERN: &str = "**/*.md";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site identity.
    pub site: SiteConfig,
    /// Build paths and content selection (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Build cache settings (paths are relative strings from TOML).
    cache: CacheConfigRaw,
    /// Concurrency settings.
    pub concurrency: ConcurrencyConfig,
    /// Per-plugin sections, keyed by plugin name.
    plugins: toml::Table,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Site identity.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute base URL of the published site.
    pub url: String,
    /// Site title.
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost/".to_owned(),
            title: String::new(),
        }
    }
}

impl SiteConfig {
    /// Parsed base URL, if `url` is a valid absolute URL.
    #[must_use]
    pub fn base_url(&self) -> Option<url::Url> {
        url::Url::parse(&self.url).ok()
    }

    /// Host of the configured site, used to classify links as internal.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        self.base_url()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    }
}

/// Raw build configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    content_dir: Option<String>,
    output_dir: Option<String>,
    patterns: Option<Vec<String>>,
    include_drafts: Option<bool>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug, Default)]
pub struct BuildConfig {
    /// Directory holding content files.
    pub content_dir: PathBuf,
    /// Directory the site is written to.
    pub output_dir: PathBuf,
    /// Glob patterns, relative to `content_dir`, selecting content files.
    pub patterns: Vec<String>,
    /// Whether draft documents are published.
    pub include_drafts: bool,
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether the persistent cache is used.
    pub enabled: bool,
    /// Cache root directory.
    pub dir: PathBuf,
}

/// Concurrency configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Requested worker count. `None` uses all available cores.
    pub workers: Option<usize>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// A plugin section does not match the shape the plugin expects.
    #[error("Invalid [plugins.{plugin}] section: {message}")]
    Plugin {
        /// Plugin name.
        plugin: String,
        /// Deserialization message.
        message: String,
    },
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.url`").
        field: String,
        /// Error message (e.g., "${`SITE_HOST`} not set").
        message: String,
    },
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::Validation(format!("{field} is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `kiln.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the result does not validate.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Parse configuration text, resolving relative paths against `config_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed, an environment variable is
    /// missing, or validation fails.
    pub fn from_toml_str(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(config_dir);
        config.validate()?;
        Ok(config)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            build: BuildConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            concurrency: ConcurrencyConfig::default(),
            plugins: toml::Table::new(),
            build_resolved: BuildConfig {
                content_dir: base.join("content"),
                output_dir: base.join("public"),
                patterns: vec![DEFAULT_PATTERN.to_owned()],
                include_drafts: false,
            },
            cache_resolved: CacheConfig {
                enabled: true,
                dir: base.join(".kiln/cache"),
            },
            config_path: None,
        }
    }

    /// Deserialize the `[plugins.<name>]` section into `T`.
    ///
    /// A missing section yields `T::default()`, so plugins never have to
    /// special-case an unconfigured site.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Plugin` if the section exists but does not match `T`.
    pub fn plugin<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, ConfigError> {
        let Some(section) = self.plugins.get(name) else {
            return Ok(T::default());
        };
        section
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Plugin {
                plugin: name.to_owned(),
                message: e.to_string(),
            })
    }

    /// Raw value of `key` inside `[plugins.<name>]`.
    #[must_use]
    pub fn plugin_value(&self, name: &str, key: &str) -> Option<&toml::Value> {
        self.plugins.get(name)?.get(key)
    }

    /// Replace the `[plugins.<name>]` section.
    pub fn set_plugin_section(&mut self, name: &str, section: toml::Table) {
        self.plugins
            .insert(name.to_owned(), toml::Value::Table(section));
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url(&self.site.url, "site.url")?;

        if self.concurrency.workers == Some(0) {
            return Err(ConfigError::Validation(
                "concurrency.workers must be greater than 0".to_owned(),
            ));
        }
        if self.build_resolved.patterns.is_empty() {
            return Err(ConfigError::Validation(
                "build.patterns cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(content_dir) = &settings.content_dir {
            self.build_resolved.content_dir.clone_from(content_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.build_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(workers) = settings.workers {
            self.concurrency.workers = Some(workers);
        }
        if let Some(include_drafts) = settings.include_drafts {
            self.build_resolved.include_drafts = include_drafts;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml_str(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.site.url = expand::expand_env(&self.site.url, "site.url")?;

        if let Some(ref dir) = self.build.content_dir {
            self.build.content_dir = Some(expand::expand_env(dir, "build.content_dir")?);
        }
        if let Some(ref dir) = self.build.output_dir {
            self.build.output_dir = Some(expand::expand_env(dir, "build.output_dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.build_resolved = BuildConfig {
            content_dir: resolve(self.build.content_dir.as_deref(), "content"),
            output_dir: resolve(self.build.output_dir.as_deref(), "public"),
            patterns: self
                .build
                .patterns
                .clone()
                .unwrap_or_else(|| vec![DEFAULT_PATTERN.to_owned()]),
            include_drafts: self.build.include_drafts.unwrap_or(false),
        };

        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            dir: resolve(self.cache.dir.as_deref(), ".kiln/cache"),
        };
    }
}
