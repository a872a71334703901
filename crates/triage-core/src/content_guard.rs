//! Read-only access to repository files requested by the model.
//!
//! Requested paths are untrusted. [`ContentGuard::read`] is total: every
//! input yields a [`FileContent`], and anything that cannot be returned
//! verbatim is replaced by a bracketed sentinel.

use std::{
    fs::File,
    io::{self, Read},
    path::{Component, Path, PathBuf},
};

/// Byte ceiling for one file. Larger files are cut to this many bytes.
pub const MAX_FILE_BYTES: u64 = 50_000;

const TRUNCATION_MARKER: &str = "[Truncated]";

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the guard could produce for one requested path.
pub enum FileBody {
    Text(String),
    /// The first [`MAX_FILE_BYTES`] bytes, cut back to a char boundary.
    Truncated(String),
    AccessDenied,
    NotFound,
    Directory,
    Binary,
    Error(String),
}

impl FileBody {
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Truncated(_) => "truncated",
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::Directory => "directory",
            Self::Binary => "binary",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    pub body: FileBody,
}

impl FileContent {
    /// Text placed inside the file's fenced block in the next prompt.
    pub fn rendered_body(&self) -> String {
        match &self.body {
            FileBody::Text(text) => text.clone(),
            FileBody::Truncated(text) => format!("{text}\n{TRUNCATION_MARKER}"),
            FileBody::AccessDenied => format!("[Access denied: {}]", self.path),
            FileBody::NotFound => format!("[File not found: {}]", self.path),
            FileBody::Directory => format!("[{} is a directory]", self.path),
            FileBody::Binary => "[Binary file]".to_string(),
            FileBody::Error(message) => format!("[Error: {message}]"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentGuard {
    /// Configured root, made absolute against the working directory.
    root: PathBuf,
    /// Symlink-free form of `root`, when it existed at construction.
    canonical_root: Option<PathBuf>,
}

impl ContentGuard {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(root),
                Err(_) => root,
            }
        };
        let canonical_root = std::fs::canonicalize(&root).ok();
        Self {
            root,
            canonical_root,
        }
    }

    pub fn read(&self, requested: &str) -> FileContent {
        let body = match self.resolve(requested) {
            Some(target) => self.read_contained(&target),
            None => FileBody::AccessDenied,
        };
        tracing::info!(
            path = requested,
            outcome = body.outcome_label(),
            "served requested file"
        );
        FileContent {
            path: requested.to_string(),
            body,
        }
    }

    /// Lexical containment: any `..`, or an absolute path outside the root,
    /// is refused before the filesystem is touched.
    fn resolve(&self, requested: &str) -> Option<PathBuf> {
        let requested_path = Path::new(requested);
        let relative = if requested_path.is_absolute() {
            requested_path
                .strip_prefix(&self.root)
                .ok()
                .or_else(|| {
                    let canonical = self.canonical_root.as_deref()?;
                    requested_path.strip_prefix(canonical).ok()
                })?
        } else {
            requested_path
        };

        let mut contained = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => contained.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(self.root.join(contained))
    }

    fn read_contained(&self, target: &Path) -> FileBody {
        let metadata = match std::fs::metadata(target) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return FileBody::NotFound,
            Err(error) => return FileBody::Error(error.to_string()),
        };
        match self.escapes_root_via_link(target) {
            Ok(false) => {}
            Ok(true) => return FileBody::AccessDenied,
            Err(error) => return FileBody::Error(error.to_string()),
        }
        if metadata.is_dir() {
            return FileBody::Directory;
        }

        let read = if metadata.len() > MAX_FILE_BYTES {
            read_prefix(target).map(FileBody::Truncated)
        } else {
            std::fs::read(target)
                .map(|bytes| FileBody::Text(String::from_utf8_lossy(&bytes).into_owned()))
        };
        match read {
            Ok(FileBody::Text(text) | FileBody::Truncated(text)) if text.contains('\0') => {
                FileBody::Binary
            }
            Ok(body) => body,
            Err(error) => FileBody::Error(error.to_string()),
        }
    }

    fn escapes_root_via_link(&self, target: &Path) -> io::Result<bool> {
        let canonical_root = match &self.canonical_root {
            Some(root) => root.clone(),
            None => std::fs::canonicalize(&self.root)?,
        };
        let canonical_target = std::fs::canonicalize(target)?;
        Ok(!canonical_target.starts_with(&canonical_root))
    }
}

fn read_prefix(target: &Path) -> io::Result<String> {
    let mut buffer = Vec::with_capacity(MAX_FILE_BYTES as usize);
    File::open(target)?
        .take(MAX_FILE_BYTES)
        .read_to_end(&mut buffer)?;
    let complete = buffer.len() - incomplete_utf8_tail_len(&buffer);
    Ok(String::from_utf8_lossy(&buffer[..complete]).into_owned())
}

/// Length of a multi-byte sequence cut off at the end of `bytes`, or 0.
fn incomplete_utf8_tail_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(4) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let expected = match byte {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return 0,
        };
        return if expected > back { back } else { 0 };
    }
    0
}
