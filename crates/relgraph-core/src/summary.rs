//! Relationship summary for one bug, as shown under the bug's details.
//!
//! Lines are read from the bug's own side: if 10 depends on 5, bug 10 shows
//! "depends on 5" and bug 5 shows "blocks 10". Related bugs that were
//! deleted, or that the viewer may not see, are left out.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::Result;
use crate::model::{BugId, ProjectId, RelationshipId};
use crate::registry::{RelationshipType, Side};
use crate::services::AccessControl;
use crate::store::RelationshipStore;

/// Viewer thresholds and layout for [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Access needed to see a related bug.
    pub view_threshold: u16,
    /// Access needed to edit the bug's relationships.
    pub update_threshold: u16,
    /// Maximum summary length before truncation.
    pub width: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            view_threshold: 10,
            update_threshold: 40,
            width: 42,
        }
    }
}

/// One related bug as seen from the summarized bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub relationship: RelationshipId,
    /// Type from the summarized bug's point of view.
    pub kind: RelationshipType,
    pub description: String,
    pub related: BugId,
    pub status: u16,
    pub handler: Option<String>,
    pub project: ProjectId,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipSummary {
    pub bug: BugId,
    pub lines: Vec<SummaryLine>,
    /// Some relationship crosses a project boundary.
    pub show_project: bool,
    /// The viewer may add or remove relationships on this bug.
    pub editable: bool,
    /// Some child the bug depends on is still unresolved.
    pub unresolved_blockers: bool,
}

impl RelationshipSummary {
    /// Fixed-width text, one line per relationship.
    #[must_use]
    pub fn to_text(&self, width: usize) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let summary = truncate(&line.summary, width);
            let summary = if self.show_project {
                format!("[{}] {summary}", line.project)
            } else {
                summary
            };
            writeln!(
                out,
                "{:<20}{:<8}{}",
                line.description,
                line.related.padded(),
                summary
            )
            .ok();
        }
        out
    }
}

/// Build the summary of `bug`'s relationships for the viewer behind
/// `access`.
///
/// # Errors
///
/// Collaborator failures.
pub fn summarize(
    store: &RelationshipStore<'_>,
    access: &dyn AccessControl,
    options: &SummaryOptions,
    bug: BugId,
) -> Result<RelationshipSummary> {
    let registry = store.registry();
    let related = store.all(bug)?;

    let others: Vec<BugId> = related
        .relationships
        .iter()
        .filter_map(|rel| rel.other_end(bug))
        .collect();
    let records = store.bugs().load_many(&others)?;

    let mut lines = Vec::with_capacity(related.len());
    for rel in &related.relationships {
        let Some(view) = rel.link().viewed_from(bug, registry)? else {
            continue;
        };
        let Some(record) = records.get(&view.destination) else {
            tracing::debug!(%bug, related = %view.destination, "related bug is gone; skipping");
            continue;
        };
        if !access.has_permission(options.view_threshold, view.destination)? {
            continue;
        }

        lines.push(SummaryLine {
            relationship: rel.id,
            kind: view.kind,
            description: registry.description(view.kind, Side::Source)?.to_string(),
            related: view.destination,
            status: record.status,
            handler: record.handler.clone(),
            project: record.project_id,
            summary: record.summary.clone(),
        });
    }

    let editable = !store.bugs().is_read_only(bug)?
        && access.has_permission(options.update_threshold, bug)?;

    Ok(RelationshipSummary {
        bug,
        lines,
        show_project: related.crosses_projects,
        editable,
        unresolved_blockers: !store.can_resolve(bug)?,
    })
}

/// Cut `text` to `width` characters, ending in `...` when shortened.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_summaries_are_untouched() {
        assert_eq!(truncate("Crash on save", 42), "Crash on save");
        assert_eq!(truncate("", 42), "");
    }

    #[test]
    fn long_summaries_end_in_ellipsis() {
        let long = "x".repeat(50);
        let cut = truncate(&long, 42);
        assert_eq!(cut.chars().count(), 42);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let cut = truncate("ééééé", 4);
        assert_eq!(cut, "é...");
    }

    #[test]
    fn text_rendering_pads_columns() {
        let summary = RelationshipSummary {
            bug: BugId(10),
            lines: vec![SummaryLine {
                relationship: RelationshipId(1),
                kind: RelationshipType::DependsOn,
                description: "depends on".to_string(),
                related: BugId(5),
                status: 10,
                handler: None,
                project: ProjectId(1),
                summary: "Login fails".to_string(),
            }],
            show_project: false,
            editable: true,
            unresolved_blockers: true,
        };
        assert_eq!(
            summary.to_text(42),
            "depends on          0000005 Login fails\n"
        );

        let crossing = RelationshipSummary {
            show_project: true,
            ..summary
        };
        assert_eq!(
            crossing.to_text(42),
            "depends on          0000005 [1] Login fails\n"
        );
    }
}
