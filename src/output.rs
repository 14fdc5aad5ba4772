//! CLI output formatting for planned and committed updates.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entry is its identity — positional index + name — with dates and
//! staleness flags shown as secondary context. Index pages are summarized per
//! bucket rather than listed file by file, so a plan for a large site stays
//! readable.
//!
//! # Output Format
//!
//! ```text
//! posts
//!     Added
//!         001 hello
//!             Date: 20000101
//!     Updated
//!         001 world (document, index)
//!     Removed
//!         001 gone
//!     Index pages
//!         all: 1, 2
//!         essays: 1
//!     Removed indexes
//!         notes
//!
//! posts: 2 documents, 3 index pages, 1 removed
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::endpoints::CommitStats;
use crate::entry::ChangeFlags;
use crate::plan::Update;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Render the set flags as a parenthesized suffix, empty when all are set.
fn flag_suffix(flags: &ChangeFlags) -> String {
    if *flags == ChangeFlags::all() {
        return String::new();
    }
    let mut parts = Vec::new();
    if flags.entity {
        parts.push("document");
    }
    if flags.index {
        parts.push("index");
    }
    if flags.static_dir {
        parts.push("static");
    }
    format!(" ({})", parts.join(", "))
}

/// Format one planned update as display lines.
pub fn format_update_output(update: &Update) -> Vec<String> {
    let mut lines = vec![update.type_name.clone()];

    if !update.entries.add.is_empty() {
        lines.push("    Added".to_string());
        for (i, planned) in update.entries.add.iter().enumerate() {
            lines.push(format!("        {} {}", format_index(i + 1), planned.entry.name));
            if let Some(entity) = &planned.entity {
                lines.push(format!("            Date: {}", entity.date));
            }
        }
    }

    if !update.entries.update.is_empty() {
        lines.push("    Updated".to_string());
        for (i, planned) in update.entries.update.iter().enumerate() {
            lines.push(format!(
                "        {} {}{}",
                format_index(i + 1),
                planned.entry.name,
                flag_suffix(&planned.flags)
            ));
        }
    }

    if !update.entries.remove.is_empty() {
        lines.push("    Removed".to_string());
        for (i, entry) in update.entries.remove.iter().enumerate() {
            lines.push(format!("        {} {}", format_index(i + 1), entry.name));
        }
    }

    if !update.indexes.write.is_empty() {
        lines.push("    Index pages".to_string());
        for (bucket, pages) in &update.indexes.write {
            let numbers = pages
                .keys()
                .map(|number| number.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("        {}: {}", bucket, numbers));
        }
    }

    if !update.indexes.remove.is_empty() {
        lines.push("    Removed indexes".to_string());
        for path in &update.indexes.remove {
            lines.push(format!("        {}", path.display()));
        }
    }

    lines
}

/// Print a planned update to stdout.
pub fn print_update_output(update: &Update) {
    for line in format_update_output(update) {
        println!("{}", line);
    }
}

/// Format the one-line summary of a committed update.
pub fn format_build_summary(type_name: &str, stats: &CommitStats) -> String {
    let mut parts = vec![
        count(stats.documents_written, "document", "documents"),
        count(stats.pages_written, "index page", "index pages"),
    ];
    if stats.static_dirs_copied > 0 {
        parts.push(count(stats.static_dirs_copied, "static dir", "static dirs"));
    }
    let removed = stats.documents_removed + stats.indexes_removed;
    if removed > 0 {
        parts.push(format!("{} removed", removed));
    }
    format!("{}: {}", type_name, parts.join(", "))
}

/// Print a commit summary to stdout.
pub fn print_build_summary(type_name: &str, stats: &CommitStats) {
    println!("{}", format_build_summary(type_name, stats));
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", n, plural)
    }
}
