//! Draft detection.

use kiln_core::{BuildContext, LoadPlugin, Plugin, PluginError, Stage, priority};

const DRAFT_MARKER: &str = "draft: true";

/// Flags documents whose body starts with a `draft: true` line.
///
/// The marker line is removed from the content. Drafts are also skipped
/// unless `build.include_drafts` is set; they stay in the store so links to
/// them still resolve.
pub struct DraftFilter;

impl Plugin for DraftFilter {
    fn name(&self) -> &str {
        "drafts"
    }

    fn priority(&self, _stage: Stage) -> i32 {
        priority::LATE
    }

    fn as_load(&self) -> Option<&dyn LoadPlugin> {
        Some(self)
    }
}

impl LoadPlugin for DraftFilter {
    fn load(&self, ctx: &BuildContext) -> Result<(), PluginError> {
        let include_drafts = ctx.config().build_resolved.include_drafts;

        ctx.process_all(|doc| {
            if let Some(body) = strip_marker(&doc.content) {
                doc.content = body.to_owned();
                doc.draft = true;
            }
            if doc.draft && !include_drafts {
                tracing::debug!(path = %doc.path.display(), "Skipping draft");
                doc.skip = true;
            }
            Ok(())
        })
    }
}

/// Body without its leading draft marker, if it has one.
fn strip_marker(content: &str) -> Option<&str> {
    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
    (first.trim() == DRAFT_MARKER).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("draft: true\n# Title"), Some("# Title"));
        assert_eq!(strip_marker("  draft: true  \r\nbody"), Some("body"));
        assert_eq!(strip_marker("draft: true"), Some(""));
        assert_eq!(strip_marker("# Title\ndraft: true"), None);
        assert_eq!(strip_marker("draft: false\nbody"), None);
    }
}
