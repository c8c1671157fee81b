use chapter_merge_core::{MergeStatus, RunReport, ScanOutcome, Session};
use chrono::Local;
use colored::*;
use indicatif::HumanBytes;
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::commands::ReportStyle;

pub const TIMESTAMP_FORMAT: &str = "%y-%m-%d :: %H:%M:%S";

#[derive(Debug, Clone, Tabled)]
struct SessionRow {
    #[tabled(rename = "Session")]
    session: String,
    #[tabled(rename = "Chapters")]
    chapters: String,
    #[tabled(rename = "Cumulative Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn session_status(session: &Session) -> &'static str {
    if session.ambiguous {
        "ambiguous"
    } else if session.is_merge_candidate() {
        "merge"
    } else {
        "complete"
    }
}

fn title(directory: &Path, timestamp: &str) -> String {
    format!(
        "Summary for directory: '{}' @ {}",
        directory.display(),
        timestamp
    )
}

/// `"2 to 5 chapters"`, or `"3 chapters"` when every session has the same
/// count.
fn chapter_range(sessions: &[Session]) -> String {
    let counts = sessions.iter().map(|s| s.chapters.len());
    match (counts.clone().min(), counts.max()) {
        (Some(min), Some(max)) if min == max => format!("{} chapters", min),
        (Some(min), Some(max)) => format!("{} to {} chapters", min, max),
        _ => "0 chapters".to_string(),
    }
}

pub fn render_table(outcome: &ScanOutcome, timestamp: &str) -> String {
    let mut rows: Vec<SessionRow> = outcome
        .sessions
        .iter()
        .map(|session| SessionRow {
            session: session.key.clone(),
            chapters: session.chapter_labels().join(" "),
            size: HumanBytes(session.total_size()).to_string(),
            status: session_status(session).to_string(),
        })
        .collect();

    let total: u64 = outcome.sessions.iter().map(Session::total_size).sum();
    rows.push(SessionRow {
        session: format!("{} sessions", outcome.sessions.len()),
        chapters: chapter_range(&outcome.sessions),
        size: HumanBytes(total).to_string(),
        status: format!("{} to merge", outcome.candidates().count()),
    });

    let table = Table::new(rows).with(Style::psql()).to_string();
    format!("{}\n{}", title(&outcome.directory, timestamp), table)
}

pub fn render_tree(outcome: &ScanOutcome, timestamp: &str) -> String {
    let mut lines = vec![title(&outcome.directory, timestamp)];

    let last_session = outcome.sessions.len().saturating_sub(1);
    for (i, session) in outcome.sessions.iter().enumerate() {
        let (branch, indent) = if i == last_session {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        lines.push(format!(
            "{}{} ({})",
            branch,
            session.key,
            session_status(session)
        ));

        let last_chapter = session.chapters.len().saturating_sub(1);
        for (j, chapter) in session.chapters.iter().enumerate() {
            let leaf = if j == last_chapter { "└── " } else { "├── " };
            lines.push(format!(
                "{}{}{} :: {}",
                indent,
                leaf,
                chapter.chapter_label,
                HumanBytes(chapter.size_bytes)
            ));
        }
    }

    lines.join("\n")
}

pub fn print_scan_report(outcome: &ScanOutcome, style: ReportStyle) {
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let rendered = match style {
        ReportStyle::Table => render_table(outcome, &timestamp),
        ReportStyle::Tree => render_tree(outcome, &timestamp),
    };
    println!("{}", rendered);

    for session in outcome.ambiguous() {
        let duplicates: Vec<String> = session
            .duplicate_indices
            .iter()
            .map(|index| index.to_string())
            .collect();
        println!(
            "{} '{}' has duplicate chapters ({}), it will not be merged",
            "ambiguous:".yellow(),
            session.key,
            duplicates.join(", ")
        );
    }
    for warning in &outcome.warnings {
        println!("{} {}", "warning:".yellow(), warning);
    }
    if !outcome.unmatched.is_empty() {
        println!(
            "{} files did not match the filename pattern",
            outcome.unmatched.len()
        );
    }
}

pub fn print_run_summary(report: &RunReport) {
    println!();
    println!(
        "{} succeeded, {} failed, {} skipped, {} ambiguous, {} already complete, {} warnings in {:.2}s",
        report.count(MergeStatus::Succeeded).to_string().green(),
        report.count(MergeStatus::Failed).to_string().red(),
        report.count(MergeStatus::Skipped).to_string().yellow(),
        report.ambiguous.len().to_string().yellow(),
        report.complete.len().to_string().cyan(),
        report.warnings.len().to_string().yellow(),
        report.duration.as_secs_f64(),
    );

    for result in &report.results {
        match result.status() {
            MergeStatus::Succeeded => {
                if let Some(path) = result.output_path() {
                    println!("  {} {} -> {}", "✓".green(), result.session_key(), path.display());
                }
            }
            MergeStatus::Failed => {
                if let Some(err) = result.error() {
                    println!("  {} {}: {}", "✗".red(), result.session_key(), err);
                }
            }
            MergeStatus::Skipped => {
                if let Some(reason) = result.skip_reason() {
                    println!("  {} {}: {}", "-".yellow(), result.session_key(), reason);
                }
            }
        }
    }

    if !report.deselected.is_empty() {
        println!("Not selected: {}", report.deselected.join(", "));
    }
    if !report.unknown_selection.is_empty() {
        println!(
            "{} {}",
            "Unknown sessions requested:".yellow(),
            report.unknown_selection.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chapter_merge_core::{ChapterFile, ChapterIndex};
    use std::path::PathBuf;

    fn session(key: &str, labels: &[&str], ambiguous: bool) -> Session {
        Session {
            key: key.to_string(),
            chapters: labels
                .iter()
                .map(|label| ChapterFile {
                    path: PathBuf::from(format!("/card/{}_{}.MP4", key, label)),
                    session_key: key.to_string(),
                    chapter: ChapterIndex::parse(label),
                    chapter_label: label.to_string(),
                    size_bytes: 1024,
                    modified: None,
                })
                .collect(),
            ambiguous,
            duplicate_indices: Vec::new(),
        }
    }

    fn outcome(sessions: Vec<Session>) -> ScanOutcome {
        ScanOutcome {
            directory: PathBuf::from("/card"),
            sessions,
            warnings: Vec::new(),
            unmatched: Vec::new(),
        }
    }

    #[test]
    fn test_chapter_range() {
        assert_eq!(chapter_range(&[]), "0 chapters");
        assert_eq!(
            chapter_range(&[session("A", &["1", "2"], false)]),
            "2 chapters"
        );
        assert_eq!(
            chapter_range(&[
                session("A", &["1", "2"], false),
                session("B", &["1"], false),
                session("C", &["1", "2", "3"], false),
            ]),
            "1 to 3 chapters"
        );
    }

    #[test]
    fn test_session_status() {
        assert_eq!(session_status(&session("A", &["1", "2"], false)), "merge");
        assert_eq!(session_status(&session("A", &["1"], false)), "complete");
        assert_eq!(session_status(&session("A", &["1", "1"], true)), "ambiguous");
    }

    #[test]
    fn test_table_has_rows_and_footer() {
        let outcome = outcome(vec![
            session("CLIP", &["001", "002", "003"], false),
            session("CLIP2", &["001"], false),
        ]);
        let table = render_table(&outcome, "24-05-01 :: 10:00:00");

        assert!(table.starts_with("Summary for directory: '/card' @ 24-05-01 :: 10:00:00"));
        assert!(table.contains("Cumulative Size"));
        assert!(table.contains("001 002 003"));
        assert!(table.contains("3.00 KiB"));
        assert!(table.contains("2 sessions"));
        assert!(table.contains("1 to 3 chapters"));
        assert!(table.contains("1 to merge"));
    }

    #[test]
    fn test_tree_branches() {
        let outcome = outcome(vec![
            session("A", &["1", "2"], false),
            session("B", &["1", "2"], false),
        ]);
        let tree = render_tree(&outcome, "ts");
        let lines: Vec<&str> = tree.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1], "├── A (merge)");
        assert_eq!(lines[2], "│   ├── 1 :: 1.00 KiB");
        assert_eq!(lines[3], "│   └── 2 :: 1.00 KiB");
        assert_eq!(lines[4], "└── B (merge)");
        assert_eq!(lines[6], "    └── 2 :: 1.00 KiB");
    }
}
