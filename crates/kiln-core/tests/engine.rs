//! Scheduler behavior: stage order, priorities, fail-fast and dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kiln_cache::{MemoryCache, NullCache};
use kiln_config::Config;
use kiln_core::{
    BuildContext, BuildError, CollectPlugin, ConfigurePlugin, Document, Engine, LoadPlugin,
    Plugin, PluginError, RenderPlugin, Stage, TransformPlugin, WritePlugin, priority,
};
use pretty_assertions::assert_eq;

type Log = Arc<Mutex<Vec<String>>>;

/// Records every stage it runs in, optionally failing in one of them.
struct Recorder {
    name: &'static str,
    priority: i32,
    fail_in: Option<Stage>,
    log: Log,
}

impl Recorder {
    fn new(name: &'static str, priority: i32, log: &Log) -> Self {
        Self {
            name,
            priority,
            fail_in: None,
            log: Arc::clone(log),
        }
    }

    fn failing_in(mut self, stage: Stage) -> Self {
        self.fail_in = Some(stage);
        self
    }

    fn record(&self, stage: Stage) -> Result<(), PluginError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{stage}:{}", self.name));
        if self.fail_in == Some(stage) {
            return Err(PluginError::msg(format!("{} exploded", self.name)));
        }
        Ok(())
    }
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self, _stage: Stage) -> i32 {
        self.priority
    }

    fn as_load(&self) -> Option<&dyn LoadPlugin> {
        Some(self)
    }

    fn as_collect(&self) -> Option<&dyn CollectPlugin> {
        Some(self)
    }

    fn as_configure(&self) -> Option<&dyn ConfigurePlugin> {
        Some(self)
    }

    fn as_transform(&self) -> Option<&dyn TransformPlugin> {
        Some(self)
    }

    fn as_render(&self) -> Option<&dyn RenderPlugin> {
        Some(self)
    }

    fn as_write(&self) -> Option<&dyn WritePlugin> {
        Some(self)
    }
}

impl LoadPlugin for Recorder {
    fn load(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
        self.record(Stage::Load)
    }
}

impl CollectPlugin for Recorder {
    fn collect(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
        self.record(Stage::Collect)
    }
}

impl ConfigurePlugin for Recorder {
    fn configure(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
        self.record(Stage::Configure)
    }
}

impl TransformPlugin for Recorder {
    fn transform(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
        self.record(Stage::Transform)
    }
}

impl RenderPlugin for Recorder {
    fn render(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
        self.record(Stage::Render)
    }
}

impl WritePlugin for Recorder {
    fn write(&self, _ctx: &BuildContext) -> Result<(), PluginError> {
        self.record(Stage::Write)
    }
}

fn engine() -> Engine {
    Engine::new(Config::default(), Arc::new(NullCache)).unwrap()
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_stages_run_in_fixed_order_and_by_priority() {
    let log = Log::default();
    let mut engine = engine();
    engine
        .register(Recorder::new("late", priority::LATE, &log))
        .register(Recorder::new("a", priority::DEFAULT, &log))
        .register(Recorder::new("first", priority::FIRST, &log))
        .register(Recorder::new("b", priority::DEFAULT, &log));

    engine.run().unwrap();

    let expected: Vec<String> = Stage::ALL
        .iter()
        .flat_map(|stage| {
            ["first", "a", "b", "late"]
                .into_iter()
                .map(move |name| format!("{stage}:{name}"))
        })
        .collect();
    assert_eq!(entries(&log), expected);
}

#[test]
fn test_fail_fast_stops_stage_and_build() {
    let log = Log::default();
    let mut engine = engine();
    engine
        .register(Recorder::new("one", 1, &log))
        .register(Recorder::new("two", 2, &log).failing_in(Stage::Transform))
        .register(Recorder::new("three", 3, &log));

    let err = engine.run().unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Transform));
    assert_eq!(err.plugin(), Some("two"));
    assert_eq!(
        err.to_string(),
        "transform stage failed in plugin `two`: two exploded"
    );
    assert!(matches!(err, BuildError::Plugin { .. }));

    let log = entries(&log);
    assert!(log.contains(&"transform:two".to_owned()));
    assert!(!log.contains(&"transform:three".to_owned()));
    assert!(!log.iter().any(|entry| entry.starts_with("render:")));
}

#[test]
fn test_run_stage_runs_only_that_stage() {
    let log = Log::default();
    let mut engine = engine();
    engine.register(Recorder::new("solo", priority::DEFAULT, &log));

    let report = engine.run_stage(Stage::Collect).unwrap();

    assert_eq!(report.stage, Stage::Collect);
    assert_eq!(report.plugins.len(), 1);
    assert_eq!(entries(&log), ["collect:solo"]);
}

/// Loads `count` documents, then counts every visit during Transform.
struct Counter {
    count: usize,
    visits: Arc<AtomicUsize>,
}

impl Plugin for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn as_load(&self) -> Option<&dyn LoadPlugin> {
        Some(self)
    }

    fn as_transform(&self) -> Option<&dyn TransformPlugin> {
        Some(self)
    }
}

impl LoadPlugin for Counter {
    fn load(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        for i in 0..self.count {
            ctx.documents()
                .append(Document::from_source(format!("doc-{i}.md"), ""));
        }
        Ok(())
    }
}

impl TransformPlugin for Counter {
    fn transform(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        ctx.process_all(|doc| {
            self.visits.fetch_add(1, Ordering::Relaxed);
            let seen = doc.attr::<u32>("visits").unwrap_or(0);
            doc.set_attr("visits", &(seen + 1))?;
            Ok(())
        })
    }
}

#[test]
fn test_every_document_processed_exactly_once() {
    let visits = Arc::new(AtomicUsize::new(0));
    let mut config = Config::default();
    config.concurrency.workers = Some(4);
    let mut engine = Engine::new(config, Arc::new(MemoryCache::new())).unwrap();
    engine.register(Counter {
        count: 500,
        visits: Arc::clone(&visits),
    });

    let report = engine.run().unwrap();

    assert_eq!(report.documents, 500);
    assert_eq!(visits.load(Ordering::Relaxed), 500);
    let documents = engine.context().documents().all();
    assert!(documents.iter().all(|d| d.attr::<u32>("visits") == Some(1)));
}

#[test]
fn test_index_built_after_load() {
    let mut engine = engine();
    engine.register(Counter {
        count: 3,
        visits: Arc::default(),
    });

    engine.run().unwrap();

    let index = engine.context().index();
    assert_eq!(index.len(), 3);
    assert!(index.by_slug("doc-2").is_some());
}
