use crate::api::StatusDetails;
use crate::insights::{DiffSummary, InsightsReport};
use crate::report::columns::{columns, Table};

pub const SUMMARY_TITLE: &str = "LOCI Summary";
pub const UPLOAD_TITLE: &str = "LOCI Upload Status";
pub const MISSING_DIFF_WARNING: &str = "No comparison analysis found between the selected base and target versions. \
Information about symbol changes (modified, deleted, etc.) is missing from the report.";
const THRESHOLDS_NOTE: &str = "Performance thresholds are enforced in the __LOCI Performance__ check.";
const CHANGE_CAUSES: [&str; 3] = ["Compiler optimizations", "Instruction reordering", "Assembly generation"];

/// `* M modified | + A added | − D deleted functions`
pub fn diff_overview_line(diff: &DiffSummary) -> String {
    format!(
        "* {} modified | + {} added | − {} deleted functions",
        diff.modified, diff.added, diff.deleted
    )
}

/// Markdown run summary for an analyzed version
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    report: &'a InsightsReport,
    details: &'a StatusDetails,
    agent_summary: Option<&'a str>,
}

impl<'a> RunSummary<'a> {
    pub fn new(report: &'a InsightsReport, details: &'a StatusDetails) -> Self {
        Self {
            report,
            details,
            agent_summary: None,
        }
    }

    pub fn with_agent_summary(mut self, summary: Option<&'a str>) -> Self {
        self.agent_summary = summary;
        self
    }

    /// A comparison ran but the backend supplied no change counters
    pub fn missing_diff_summary(&self) -> bool {
        self.report.has_baseline && self.report.diff_summary.is_none()
    }

    pub fn render(&self) -> String {
        let report = self.report;
        let compared_diff = report.diff_summary.filter(|_| report.has_baseline);

        let mut out = format!("# {}\n", SUMMARY_TITLE);
        if let Some(summary) = self.agent_summary {
            out.push_str(summary);
            out.push('\n');
        }

        out.push_str("\n### Execution Metrics\n");
        if !report.is_empty() {
            let label = if compared_diff.is_some() {
                "Modified symbols count"
            } else {
                "Symbols count"
            };
            out.push_str(&format!(
                "{}: {} (showing top {})<br>\n\n",
                label, report.total_count, report.top_n
            ));
            out.push_str(&Table::build(&report.rows, &columns(report.has_baseline)).to_markdown());
        } else if report.has_baseline {
            out.push_str("No modified symbols detected.\n");
        } else {
            out.push_str("No symbols detected.\n");
        }

        if let Some(diff) = compared_diff {
            out.push_str("\n## Diff Overview\n");
            out.push_str(&diff_overview_line(&diff));
            out.push_str("\n\n#### What counts as a change?\n");
            out.push_str(
                "Function modifications may result from different factors (not always direct source code edits), such as:\n",
            );
            for cause in CHANGE_CAUSES {
                out.push_str(&format!("- {}\n", cause));
            }
        } else if self.missing_diff_summary() {
            out.push_str(&format!("\n* {}\n", MISSING_DIFF_WARNING));
        }

        out.push_str(&format!(
            "\n{} [{}]({})\n{}\n",
            self.details.message, self.details.label, self.details.url, THRESHOLDS_NOTE
        ));
        out
    }
}

/// Markdown summary written right after an upload
pub fn render_upload_summary(details: &StatusDetails) -> String {
    format!(
        "# {}\n{} [{}]({})\n",
        UPLOAD_TITLE, details.message, details.label, details.url
    )
}
