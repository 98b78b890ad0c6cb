//! Human-readable summary renderer for commit diffs.

use crate::diff::model::{CommitDiff, TableChange};

/// Render a Markdown summary of a [`CommitDiff`].
pub fn render_diff_summary(diff: &CommitDiff) -> String {
    let mut out = String::new();

    out.push_str("## Commit Diff\n\n");
    out.push_str(&format!(
        "**From**: `{}`  \n**To**: `{}`\n\n",
        diff.from.short(),
        diff.to.short()
    ));

    if diff.is_empty() {
        out.push_str("_No changes detected._\n");
        return out;
    }

    out.push_str(
        "| Table | Status | Unmodified | Added | Deleted | Modified | Cells | Before | After |\n\
         |---|---|---|---|---|---|---|---|---|\n",
    );
    for t in &diff.tables {
        out.push_str(&format!(
            "| {} | {}{} | {} | {} | {} | {} | {} | {} | {} |\n",
            t.tablename,
            t.status.as_str(),
            if t.schema_changed && t.status == TableChange::Modified {
                " (schema)"
            } else {
                ""
            },
            t.rows_unmodified,
            t.rows_added,
            t.rows_deleted,
            t.rows_modified,
            t.cells_modified,
            t.entries_before,
            t.entries_after,
        ));
    }
    out
}
