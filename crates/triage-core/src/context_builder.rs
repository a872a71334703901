use triage_github::GithubIssue;

use crate::content_guard::FileContent;
use crate::response_decoder::MAX_REQUESTED_FILES;

pub const ISSUE_TITLE_MAX_CHARS: usize = 500;
pub const ISSUE_BODY_MAX_CHARS: usize = 10_000;
const NO_LABELS_PLACEHOLDER: &str = "(None)";

fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Opening user message: the issue as the reporter filed it, capped.
pub fn render_issue_details(issue: &GithubIssue) -> String {
    let labels = issue.label_names().join(", ");
    let labels = if labels.is_empty() {
        NO_LABELS_PLACEHOLDER
    } else {
        labels.as_str()
    };
    format!(
        "## Issue Details\n\n**Title:** {}\n\n**Author:** @{}\n\n**Labels:** {}\n\n**Body:**\n{}",
        take_chars(&issue.title, ISSUE_TITLE_MAX_CHARS),
        issue.user.login,
        labels,
        take_chars(issue.body_text(), ISSUE_BODY_MAX_CHARS),
    )
}

/// Follow-up user message carrying one batch of requested files.
pub fn render_file_contents(files: &[FileContent]) -> String {
    let mut rendered = String::from("## Requested File Contents\n\n");
    for file in files.iter().take(MAX_REQUESTED_FILES) {
        rendered.push_str(&format!(
            "### `{}`\n\n```\n{}\n```\n\n",
            file.path,
            file.rendered_body()
        ));
    }
    rendered
}
