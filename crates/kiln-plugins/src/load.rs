//! Source file discovery and loading.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::Pattern;
use kiln_core::{BuildContext, Document, LoadPlugin, Plugin, PluginError, Stage, priority};
use regex::Regex;

static H1_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());

/// Creates one document per source file matching `build.patterns`.
///
/// Files are read on the worker pool and appended in path order, so the store
/// order is deterministic.
pub struct SourceLoader;

impl Plugin for SourceLoader {
    fn name(&self) -> &str {
        "load"
    }

    fn priority(&self, _stage: Stage) -> i32 {
        priority::FIRST
    }

    fn as_load(&self) -> Option<&dyn LoadPlugin> {
        Some(self)
    }
}

impl LoadPlugin for SourceLoader {
    fn load(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        let build = &ctx.config().build_resolved;
        if !build.content_dir.is_dir() {
            return Err(PluginError::msg(format!(
                "Content directory not found: {}",
                build.content_dir.display()
            )));
        }

        let paths = discover(&build.content_dir, &build.patterns)?;
        let documents = ctx.executor().map(&paths, |relative| {
            let content = fs::read_to_string(build.content_dir.join(relative))
                .map_err(|e| PluginError::document(relative, e.to_string()))?;
            Ok::<_, PluginError>(load_document(relative, content))
        })?;

        tracing::info!(
            documents = documents.len(),
            dir = %build.content_dir.display(),
            "Loaded sources"
        );
        ctx.documents().extend(documents);
        Ok(())
    }
}

/// Relative paths of every file under `root` matching any of `patterns`.
fn discover(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, PluginError> {
    let prefix = Pattern::escape(&root.to_string_lossy());
    let mut found = BTreeSet::new();

    for pattern in patterns {
        let full = format!("{prefix}/{pattern}");
        let entries = glob::glob(&full)
            .map_err(|e| PluginError::msg(format!("Invalid pattern `{pattern}`: {e}")))?;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable path");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                found.insert(relative.to_path_buf());
            }
        }
    }

    Ok(found.into_iter().collect())
}

fn load_document(relative: &Path, content: String) -> Document {
    let title = H1_PATTERN
        .captures(&content)
        .map(|caps| caps[1].trim().to_owned());
    let mut document = Document::from_source(relative, content);
    document.title = title;
    document
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_matches_patterns_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("posts")).unwrap();
        fs::write(root.join("index.md"), "# Home").unwrap();
        fs::write(root.join("posts/b.md"), "").unwrap();
        fs::write(root.join("posts/a.md"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let paths = discover(root, &["**/*.md".to_owned(), "*.md".to_owned()]).unwrap();

        assert_eq!(
            paths,
            [
                PathBuf::from("index.md"),
                PathBuf::from("posts/a.md"),
                PathBuf::from("posts/b.md"),
            ]
        );
    }

    #[test]
    fn test_discover_rejects_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path(), &["[".to_owned()]).is_err());
    }

    #[test]
    fn test_load_document_extracts_title() {
        let doc = load_document(Path::new("guide/Getting Started.md"), "intro\n\n#  Getting started \n".to_owned());

        assert_eq!(doc.title.as_deref(), Some("Getting started"));
        assert_eq!(doc.slug, "guide/getting-started");
        assert_eq!(doc.href, "/guide/getting-started/");
    }

    #[test]
    fn test_load_document_without_heading() {
        let doc = load_document(Path::new("a.md"), "## Not a title".to_owned());
        assert_eq!(doc.title, None);
    }
}
