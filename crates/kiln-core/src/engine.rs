//! Stage scheduler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_cache::Cache;
use kiln_config::Config;

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::plugin::{self, Plugin};
use crate::stage::Stage;

/// Registered plugins, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin.
    ///
    /// Registration order breaks priority ties. A second plugin with an
    /// already registered name is accepted with a warning.
    pub fn register(&mut self, plugin: impl Plugin + 'static) {
        self.register_boxed(Box::new(plugin));
    }

    /// Register an already boxed plugin.
    pub fn register_boxed(&mut self, plugin: Box<dyn Plugin>) {
        if self.plugins.iter().any(|p| p.name() == plugin.name()) {
            tracing::warn!(plugin = plugin.name(), "Plugin registered twice");
        }
        self.plugins.push(plugin);
    }

    /// Plugins handling `stage`, in execution order.
    ///
    /// Sorted by [`Plugin::priority`] with a stable sort, so equal priorities
    /// keep registration order.
    #[must_use]
    pub fn plugins_for(&self, stage: Stage) -> Vec<&dyn Plugin> {
        let mut plugins: Vec<(i32, &dyn Plugin)> = self
            .plugins
            .iter()
            .map(|p| &**p)
            .filter(|p| plugin::supports(*p, stage))
            .map(|p| (p.priority(stage), p))
            .collect();
        plugins.sort_by_key(|(priority, _)| *priority);
        plugins.into_iter().map(|(_, p)| p).collect()
    }

    /// Registered plugin names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Time spent in one plugin's stage handler.
#[derive(Clone, Debug)]
pub struct PluginTiming {
    /// Plugin name.
    pub name: String,
    /// Priority the plugin ran with.
    pub priority: i32,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// Outcome of one stage.
#[derive(Clone, Debug)]
pub struct StageReport {
    /// Stage that ran.
    pub stage: Stage,
    /// Wall-clock duration of the whole stage.
    pub duration: Duration,
    /// Plugins in the order they ran.
    pub plugins: Vec<PluginTiming>,
}

/// Outcome of a full build.
#[derive(Clone, Debug)]
pub struct BuildReport {
    /// Every stage, in execution order.
    pub stages: Vec<StageReport>,
    /// Wall-clock duration of the build.
    pub duration: Duration,
    /// Documents in the store at the end of the build.
    pub documents: usize,
    /// Documents flagged `skip`.
    pub skipped: usize,
    /// Feeds at the end of the build.
    pub feeds: usize,
}

/// Runs registered plugins through the fixed stage sequence.
///
/// Stages run one at a time in [`Stage::ALL`] order. Within a stage, plugins
/// run sequentially by priority. The first plugin error stops the build;
/// changes made before it are kept.
pub struct Engine {
    registry: PluginRegistry,
    context: BuildContext,
}

impl Engine {
    /// Create an engine with a fresh [`BuildContext`].
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be created.
    pub fn new(config: Config, cache: Arc<dyn Cache>) -> Result<Self, BuildError> {
        Ok(Self::with_context(BuildContext::new(config, cache)?))
    }

    /// Create an engine around an existing context.
    #[must_use]
    pub fn with_context(context: BuildContext) -> Self {
        Self {
            registry: PluginRegistry::new(),
            context,
        }
    }

    /// Register a plugin.
    pub fn register(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.registry.register(plugin);
        self
    }

    /// Register an already boxed plugin.
    pub fn register_boxed(&mut self, plugin: Box<dyn Plugin>) -> &mut Self {
        self.registry.register_boxed(plugin);
        self
    }

    /// Plugin registry.
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Build context.
    #[must_use]
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Consume the engine, returning its context.
    #[must_use]
    pub fn into_context(self) -> BuildContext {
        self.context
    }

    /// Plugin names per stage, in the order they would run.
    ///
    /// Stages without plugins are included with an empty list.
    #[must_use]
    pub fn execution_plan(&self) -> Vec<(Stage, Vec<String>)> {
        Stage::ALL
            .iter()
            .map(|&stage| {
                let names = self
                    .registry
                    .plugins_for(stage)
                    .iter()
                    .map(|p| p.name().to_owned())
                    .collect();
                (stage, names)
            })
            .collect()
    }

    /// Run every stage.
    ///
    /// The document index is rebuilt once the Load stage finishes.
    ///
    /// # Errors
    ///
    /// Returns the first plugin error, wrapped with its stage and plugin name.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let mut stages = Vec::with_capacity(Stage::ALL.len());

        for stage in Stage::ALL {
            stages.push(self.run_stage(stage)?);
            if stage == Stage::Load {
                let index = self.context.rebuild_index();
                tracing::debug!(documents = index.len(), "Indexed documents");
            }
        }

        let snapshot = self.context.documents().snapshot();
        let documents = snapshot.len();
        let skipped = snapshot.iter().filter(|d| d.skip).count();
        let report = BuildReport {
            stages,
            duration: started.elapsed(),
            documents,
            skipped,
            feeds: self.context.feeds().len(),
        };
        tracing::info!(
            documents = report.documents,
            skipped = report.skipped,
            feeds = report.feeds,
            elapsed_ms = report.duration.as_millis(),
            "Build finished"
        );
        Ok(report)
    }

    /// Run the plugins of a single stage.
    ///
    /// # Errors
    ///
    /// Returns the first plugin error, wrapped with its stage and plugin name.
    /// Plugins after the failing one do not run.
    pub fn run_stage(&self, stage: Stage) -> Result<StageReport, BuildError> {
        let _stage_span = tracing::info_span!("stage", stage = %stage).entered();
        let plugins = self.registry.plugins_for(stage);
        tracing::info!(plugins = plugins.len(), "Stage started");

        let started = Instant::now();
        let mut timings = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            let name = plugin.name();
            let priority = plugin.priority(stage);
            let _plugin_span = tracing::info_span!("plugin", name, priority).entered();

            let plugin_started = Instant::now();
            plugin::invoke(plugin, stage, &self.context).map_err(|source| {
                tracing::error!(error = %source, "Plugin failed");
                BuildError::Plugin {
                    stage,
                    plugin: name.to_owned(),
                    source,
                }
            })?;
            let duration = plugin_started.elapsed();
            tracing::debug!(elapsed_ms = duration.as_millis(), "Plugin finished");

            timings.push(PluginTiming {
                name: name.to_owned(),
                priority,
                duration,
            });
        }

        let duration = started.elapsed();
        tracing::info!(elapsed_ms = duration.as_millis(), "Stage finished");
        Ok(StageReport {
            stage,
            duration,
            plugins: timings,
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("plugins", &self.registry.names())
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use crate::plugin::{LoadPlugin, RenderPlugin};
    use crate::stage::priority;

    struct Named(&'static str, i32);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self, _stage: Stage) -> i32 {
            self.1
        }

        fn as_render(&self) -> Option<&dyn RenderPlugin> {
            Some(self)
        }
    }

    impl RenderPlugin for Named {
        fn render(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    struct LoadOnly;

    impl Plugin for LoadOnly {
        fn name(&self) -> &str {
            "load-only"
        }

        fn as_load(&self) -> Option<&dyn LoadPlugin> {
            Some(self)
        }
    }

    impl LoadPlugin for LoadOnly {
        fn load(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    #[test]
    fn test_plugins_for_sorts_stably() {
        let mut registry = PluginRegistry::new();
        registry.register(Named("late", priority::LATE));
        registry.register(Named("default-1", priority::DEFAULT));
        registry.register(Named("first", priority::FIRST));
        registry.register(Named("default-2", priority::DEFAULT));
        registry.register(LoadOnly);

        let names: Vec<_> = registry
            .plugins_for(Stage::Render)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, ["first", "default-1", "default-2", "late"]);
        assert_eq!(registry.plugins_for(Stage::Load).len(), 1);
        assert!(registry.plugins_for(Stage::Write).is_empty());
    }

    #[test]
    fn test_execution_plan_lists_every_stage() {
        let mut engine = Engine::with_context(BuildContext::for_tests());
        engine.register(LoadOnly).register(Named("md", 0));

        let plan = engine.execution_plan();
        assert_eq!(plan.len(), Stage::ALL.len());
        assert_eq!(plan[0], (Stage::Load, vec!["load-only".to_owned()]));
        assert_eq!(plan[4], (Stage::Render, vec!["md".to_owned()]));
        assert!(plan[5].1.is_empty());
    }

    #[test]
    fn test_run_reports_every_stage() {
        let mut engine = Engine::with_context(BuildContext::for_tests());
        engine.register(LoadOnly);

        let report = engine.run().unwrap();
        let stages: Vec<_> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, Stage::ALL);
        assert_eq!(report.stages[0].plugins[0].name, "load-only");
        assert_eq!(report.documents, 0);
    }
}
