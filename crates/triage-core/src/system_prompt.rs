use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TriageError;

pub const DIRECTORY_STRUCTURE_PLACEHOLDER: &str = "{{DirectoryStructure}}";

fn directory_structure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)#{2,6}[ \t]+directory structure.*?```[\w-]*[ \t]*\n(.*?)\n```")
            .expect("valid regex")
    })
}

/// First fenced block under a "Directory Structure" heading, if any.
pub fn extract_directory_structure(agents_markdown: &str) -> Option<String> {
    directory_structure_pattern()
        .captures(agents_markdown)
        .and_then(|captures| captures.get(1))
        .map(|tree| tree.as_str().trim().to_string())
}

/// Loads the system prompt template and fills the directory placeholder.
///
/// The agents guide is only read when the template asks for it; once it is
/// needed, a missing guide or a guide without a directory block is fatal.
pub fn load_system_prompt(prompt_path: &Path, agents_path: &Path) -> Result<String, TriageError> {
    let template = read_required(prompt_path, "system prompt")?;
    if !template.contains(DIRECTORY_STRUCTURE_PLACEHOLDER) {
        return Ok(template);
    }

    let agents = read_required(agents_path, "agents guide")?;
    let tree = extract_directory_structure(&agents).ok_or_else(|| {
        TriageError::Config(format!(
            "no directory structure block found in {}",
            agents_path.display()
        ))
    })?;
    tracing::debug!(
        path = %agents_path.display(),
        lines = tree.lines().count(),
        "filled directory structure"
    );
    Ok(template.replace(DIRECTORY_STRUCTURE_PLACEHOLDER, &tree))
}

fn read_required(path: &Path, what: &str) -> Result<String, TriageError> {
    std::fs::read_to_string(path).map_err(|error| {
        TriageError::Config(format!("failed to read {what} {}: {error}", path.display()))
    })
}
