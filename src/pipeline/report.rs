use super::CycleReport;
use crate::history::History;
use crate::markdown::{escape_md_bold, single_line};

pub fn format_report(report: &CycleReport) -> String {
    let mut output = format!("# Research: {}\n\n", single_line(&report.question));

    if report.rewritten_query != report.question {
        output.push_str(&format!(
            "_Searched for: {}_\n\n",
            single_line(&report.rewritten_query)
        ));
    }

    output.push_str("## Answer\n\n");
    output.push_str(report.answer.trim());
    output.push_str("\n\n");

    if !report.summaries.is_empty() {
        output.push_str("## Sources\n\n");
        for summary in &report.summaries {
            output.push_str(&format!(
                "- **{}**: {}\n",
                escape_md_bold(&summary.source),
                single_line(&summary.text)
            ));
        }
        output.push('\n');
    }

    if !report.failed.is_empty() {
        output.push_str("## Skipped Sources\n\n");
        for failed in &report.failed {
            output.push_str(&format!(
                "- {} ({})\n",
                single_line(&failed.source),
                single_line(&failed.reason)
            ));
        }
        output.push('\n');
    }

    output
}

/// Lists the user's questions, oldest first. Assistant turns are not shown.
pub fn format_history(history: &History) -> String {
    let mut output = String::from("## History\n\n");
    if history.is_empty() {
        output.push_str("(no questions yet)\n");
    }
    for question in history.user_questions() {
        output.push_str(&format!("- {}\n", single_line(question)));
    }
    output
}
