//! Plugin contract.
//!
//! A plugin is a [`Plugin`] plus any number of narrow per-stage traits. The
//! registry asks each plugin for each capability independently through the
//! `as_*` accessors, so a plugin only implements the stages it cares about:
//!
//! ```
//! use kiln_core::{BuildContext, Plugin, PluginError, RenderPlugin, Stage, priority};
//!
//! struct Shout;
//!
//! impl Plugin for Shout {
//!     fn name(&self) -> &str {
//!         "shout"
//!     }
//!
//!     fn priority(&self, _stage: Stage) -> i32 {
//!         priority::LATE
//!     }
//!
//!     fn as_render(&self) -> Option<&dyn RenderPlugin> {
//!         Some(self)
//!     }
//! }
//!
//! impl RenderPlugin for Shout {
//!     fn render(&self, ctx: &BuildContext) -> Result<(), PluginError> {
//!         ctx.process_all(|doc| {
//!             doc.html = doc.html.take().map(|html| html.to_uppercase());
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use crate::context::BuildContext;
use crate::error::PluginError;
use crate::stage::{Stage, priority};

/// A named build component.
pub trait Plugin: Send + Sync {
    /// Unique plugin name, used in logs, errors and the execution plan.
    fn name(&self) -> &str;

    /// Priority within `stage`. Lower runs earlier.
    ///
    /// Defaults to [`priority::DEFAULT`]. Plugins with equal priority run in
    /// registration order.
    fn priority(&self, stage: Stage) -> i32 {
        let _ = stage;
        priority::DEFAULT
    }

    /// Load capability.
    fn as_load(&self) -> Option<&dyn LoadPlugin> {
        None
    }

    /// Collect capability.
    fn as_collect(&self) -> Option<&dyn CollectPlugin> {
        None
    }

    /// Configure capability.
    fn as_configure(&self) -> Option<&dyn ConfigurePlugin> {
        None
    }

    /// Transform capability.
    fn as_transform(&self) -> Option<&dyn TransformPlugin> {
        None
    }

    /// Render capability.
    fn as_render(&self) -> Option<&dyn RenderPlugin> {
        None
    }

    /// Write capability.
    fn as_write(&self) -> Option<&dyn WritePlugin> {
        None
    }
}

/// Creates documents, usually from source files.
pub trait LoadPlugin: Send + Sync {
    /// Run the Load stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn load(&self, ctx: &BuildContext) -> Result<(), PluginError>;
}

/// Builds feeds and other derived collections.
pub trait CollectPlugin: Send + Sync {
    /// Run the Collect stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn collect(&self, ctx: &BuildContext) -> Result<(), PluginError>;
}

/// Prepares shared state before documents are transformed.
pub trait ConfigurePlugin: Send + Sync {
    /// Run the Configure stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn configure(&self, ctx: &BuildContext) -> Result<(), PluginError>;
}

/// Rewrites document content.
pub trait TransformPlugin: Send + Sync {
    /// Run the Transform stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn transform(&self, ctx: &BuildContext) -> Result<(), PluginError>;
}

/// Produces rendered HTML.
pub trait RenderPlugin: Send + Sync {
    /// Run the Render stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn render(&self, ctx: &BuildContext) -> Result<(), PluginError>;
}

/// Writes output.
pub trait WritePlugin: Send + Sync {
    /// Run the Write stage.
    ///
    /// # Errors
    ///
    /// Any error aborts the build.
    fn write(&self, ctx: &BuildContext) -> Result<(), PluginError>;
}

/// Whether `plugin` has a handler for `stage`.
pub(crate) fn supports(plugin: &dyn Plugin, stage: Stage) -> bool {
    match stage {
        Stage::Load => plugin.as_load().is_some(),
        Stage::Collect => plugin.as_collect().is_some(),
        Stage::Configure => plugin.as_configure().is_some(),
        Stage::Transform => plugin.as_transform().is_some(),
        Stage::Render => plugin.as_render().is_some(),
        Stage::Write => plugin.as_write().is_some(),
    }
}

/// Run the `stage` handler of `plugin`. A missing handler is a no-op.
pub(crate) fn invoke(
    plugin: &dyn Plugin,
    stage: Stage,
    ctx: &BuildContext,
) -> Result<(), PluginError> {
    match stage {
        Stage::Load => plugin.as_load().map_or(Ok(()), |p| p.load(ctx)),
        Stage::Collect => plugin.as_collect().map_or(Ok(()), |p| p.collect(ctx)),
        Stage::Configure => plugin.as_configure().map_or(Ok(()), |p| p.configure(ctx)),
        Stage::Transform => plugin.as_transform().map_or(Ok(()), |p| p.transform(ctx)),
        Stage::Render => plugin.as_render().map_or(Ok(()), |p| p.render(ctx)),
        Stage::Write => plugin.as_write().map_or(Ok(()), |p| p.write(ctx)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl Plugin for Bare {
        fn name(&self) -> &str {
            "bare"
        }
    }

    struct Writer;

    impl Plugin for Writer {
        fn name(&self) -> &str {
            "writer"
        }

        fn as_write(&self) -> Option<&dyn WritePlugin> {
            Some(self)
        }
    }

    impl WritePlugin for Writer {
        fn write(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
            Err(PluginError::msg("disk full"))
        }
    }

    #[test]
    fn test_default_capabilities() {
        assert!(Stage::ALL.iter().all(|&s| !supports(&Bare, s)));
        assert_eq!(Bare.priority(Stage::Load), priority::DEFAULT);
    }

    #[test]
    fn test_capability_detection() {
        assert!(supports(&Writer, Stage::Write));
        assert!(!supports(&Writer, Stage::Render));
    }

    #[test]
    fn test_invoke_dispatches_to_handler() {
        let ctx = BuildContext::for_tests();
        assert!(invoke(&Writer, Stage::Write, &ctx).is_err());
        assert!(invoke(&Writer, Stage::Load, &ctx).is_ok());
    }
}
