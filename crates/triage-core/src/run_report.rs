use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::classification::Classification;

/// Writes the posted comment body to `path`, replacing any previous file.
pub fn write_output_file(path: &Path, comment_body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, comment_body)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Appends workflow step outputs in `key=value` form.
pub fn append_github_output(path: &Path, classification: Option<Classification>) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let label = classification.map(Classification::as_str).unwrap_or("none");
    write!(file, "response=success\nclassification={label}\n")
        .with_context(|| format!("failed to append to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{append_github_output, write_output_file};
    use crate::Classification;

    #[test]
    fn functional_output_file_creates_parent_dirs_and_overwrites() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("out/nested/response.md");
        write_output_file(&path, "first").expect("write");
        write_output_file(&path, "second").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "second");
    }

    #[test]
    fn functional_github_output_appends_key_value_lines() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("github_output");
        std::fs::write(&path, "existing=1\n").expect("seed");
        append_github_output(&path, Some(Classification::Feature)).expect("append");
        append_github_output(&path, None).expect("append");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "existing=1\nresponse=success\nclassification=feature\nresponse=success\nclassification=none\n"
        );
    }
}
