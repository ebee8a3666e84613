//! Pipeline stages and plugin priorities.

use std::fmt;

use serde::Serialize;

/// One phase of a build.
///
/// Stages form a fixed total order. The [`Engine`](crate::Engine) runs every
/// plugin of a stage before starting the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Create documents from source files.
    Load,
    /// Build feeds and other derived collections.
    Collect,
    /// Adjust configuration-dependent state before transformation.
    Configure,
    /// Rewrite document content.
    Transform,
    /// Produce rendered HTML.
    Render,
    /// Write output to disk.
    Write,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Self; 6] = [
        Self::Load,
        Self::Collect,
        Self::Configure,
        Self::Transform,
        Self::Render,
        Self::Write,
    ];

    /// Lowercase stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Collect => "collect",
            Self::Configure => "configure",
            Self::Transform => "transform",
            Self::Render => "render",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known priorities. Lower runs earlier within a stage.
pub mod priority {
    /// Run before everything else in the stage.
    pub const FIRST: i32 = -1000;
    /// Run ahead of default plugins.
    pub const EARLY: i32 = -100;
    /// Priority of plugins that do not declare one.
    pub const DEFAULT: i32 = 0;
    /// Run after default plugins.
    pub const LATE: i32 = 100;
    /// Run after everything else in the stage.
    pub const LAST: i32 = 1000;
}
