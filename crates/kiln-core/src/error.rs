//! Error types for plugins and builds.

use std::path::PathBuf;

use kiln_config::ConfigError;

use crate::stage::Stage;

/// Error returned by a plugin's stage handler.
///
/// Any such error is stage-fatal: the [`Engine`](crate::Engine) stops the
/// build and wraps it in [`BuildError::Plugin`]. Plugins that prefer to keep
/// going on a single bad document log the failure and return `Ok(())` instead.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Free-form failure description.
    #[error("{0}")]
    Message(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Plugin configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Failure tied to one document.
    #[error("{}: {message}", .path.display())]
    Document {
        /// Source path of the document.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
    /// Any other error raised by a third-party plugin.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl PluginError {
    /// Create a [`PluginError::Message`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Create a [`PluginError::Document`].
    pub fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Error that aborts a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A plugin's stage handler failed.
    #[error("{stage} stage failed in plugin `{plugin}`: {source}")]
    Plugin {
        /// Stage being run.
        stage: Stage,
        /// Name of the failing plugin.
        plugin: String,
        /// Error returned by the plugin.
        #[source]
        source: PluginError,
    },
    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    Executor(#[from] rayon::ThreadPoolBuildError),
    /// `site.url` is not an absolute URL.
    #[error("Invalid site URL: {0}")]
    SiteUrl(String),
}

impl BuildError {
    /// Stage that failed, if the error came from a plugin.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Plugin { stage, .. } => Some(*stage),
            Self::Executor(_) | Self::SiteUrl(_) => None,
        }
    }

    /// Name of the failing plugin, if the error came from a plugin.
    #[must_use]
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Plugin { plugin, .. } => Some(plugin),
            Self::Executor(_) | Self::SiteUrl(_) => None,
        }
    }
}
