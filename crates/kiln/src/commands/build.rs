//! `kiln build` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use kiln_cache::{Cache, FileCache, NullCache};
use kiln_config::{CliSettings, Config};
use kiln_core::{BuildReport, Engine};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover kiln.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content directory (overrides config).
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of worker threads, capped at the number of cores (overrides config).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Include drafts in the output.
    #[arg(long)]
    drafts: bool,

    /// Enable verbose output (stage and plugin timing logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable caching (default: enabled).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable caching.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or a plugin aborts the build.
    pub(crate) fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            content_dir: self.content_dir.clone(),
            output_dir: self.output_dir.clone(),
            cache_enabled: self.resolve_cache_enabled(),
            workers: self.workers,
            include_drafts: self.drafts.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Content directory: {}",
            config.build_resolved.content_dir.display()
        ));
        output.info(&format!(
            "Output directory: {}",
            config.build_resolved.output_dir.display()
        ));

        let cache: Arc<dyn Cache> = if config.cache_resolved.enabled {
            // FileCache may wipe the directory on a version change, so the
            // .gitignore is written afterwards.
            let cache = FileCache::new(config.cache_resolved.dir.clone(), version);
            ensure_gitignore(cache.root())?;
            output.info(&format!(
                "Cache directory: {}",
                config.cache_resolved.dir.display()
            ));
            Arc::new(cache)
        } else {
            output.info("Cache: disabled");
            Arc::new(NullCache)
        };

        let mut engine = Engine::new(config, cache)?;
        kiln_plugins::register_defaults(&mut engine);
        output.info(&format!("Workers: {}", engine.context().executor().workers()));

        let report = engine.run()?;
        print_summary(&output, &report);
        Ok(())
    }

    /// Resolve `cache_enabled` from --cache/--no-cache flags.
    fn resolve_cache_enabled(&self) -> Option<bool> {
        self.no_cache.then_some(false).or(self.cache)
    }
}

fn print_summary(output: &Output, report: &BuildReport) {
    output.highlight("Stages:");
    for stage in &report.stages {
        output.info(&format!(
            "  {:<10} {:>8.1?}",
            stage.stage.as_str(),
            stage.duration
        ));
        for plugin in &stage.plugins {
            output.detail(&format!(
                "    {:<12} {:>8.1?}",
                plugin.name, plugin.duration
            ));
        }
    }
    output.success(&format!(
        "Built {} documents ({} skipped), {} feeds in {:.2?}",
        report.documents, report.skipped, report.feeds, report.duration
    ));
}

/// Ensure the cache directory exists with a `.gitignore`.
fn ensure_gitignore(dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)?;

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists()
        && let Err(e) = std::fs::write(&gitignore_path, "# Automatically created by kiln\n*\n")
    {
        tracing::warn!(path = %gitignore_path.display(), error = %e, "Failed to write cache .gitignore");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: BuildArgs,
    }

    fn parse(args: &[&str]) -> BuildArgs {
        TestCli::try_parse_from(std::iter::once("kiln").chain(args.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_cache_flags() {
        assert_eq!(parse(&[]).resolve_cache_enabled(), None);
        assert_eq!(parse(&["--no-cache"]).resolve_cache_enabled(), Some(false));
        assert_eq!(parse(&["--cache", "true"]).resolve_cache_enabled(), Some(true));
        assert!(
            TestCli::try_parse_from(["kiln", "--cache", "true", "--no-cache"]).is_err()
        );
    }

    #[test]
    fn test_parse_overrides() {
        let args = parse(&["--workers", "3", "--drafts", "-o", "out", "--content-dir", "src"]);
        assert_eq!(args.workers, Some(3));
        assert!(args.drafts);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.content_dir, Some(PathBuf::from("src")));
    }

    #[test]
    fn test_execute_builds_site() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("content")).unwrap();
        std::fs::write(root.join("content/hello.md"), "# Hello\n").unwrap();
        std::fs::write(
            root.join("kiln.toml"),
            "[site]\nurl = \"https://mysite.test/\"\n",
        )
        .unwrap();

        let config = root.join("kiln.toml");
        let args = parse(&["--config", config.to_str().unwrap(), "--workers", "1"]);
        args.execute("test").unwrap();

        assert!(root.join("public/hello/index.html").is_file());
        assert!(root.join(".kiln/cache/.gitignore").is_file());
        assert!(root.join(".kiln/cache/markdown").is_dir());
    }

    #[test]
    fn test_execute_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("missing.toml");
        let args = parse(&["--config", config.to_str().unwrap()]);

        let err = args.execute("test").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
