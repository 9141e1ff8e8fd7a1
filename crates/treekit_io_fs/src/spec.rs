//! Classifier/mirror enums, options and top-level error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Content verdict for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFileClass {
    /// Sample carries no run of three NUL characters.
    Text,
    /// Sample carries at least one run of three NUL characters.
    Binary,
}

impl EnumFileClass {
    /// Lower-case name used by the Python bridge and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for EnumFileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `name_ignore` is matched against directory basenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorIgnoreMode {
    /// Basename equals `name_ignore`.
    Exact,
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
}

/// Filesystem operation that failed during a mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorOp {
    ReadDir,
    CreateDir,
    CopyFile,
    RemoveFile,
    RemoveDir,
    Metadata,
}

impl fmt::Display for EnumMirrorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_op = match self {
            Self::ReadDir => "read directory",
            Self::CreateDir => "create directory",
            Self::CopyFile => "copy file",
            Self::RemoveFile => "remove file",
            Self::RemoveDir => "remove directory",
            Self::Metadata => "read metadata",
        };
        f.write_str(c_op)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `mirror_tree`.
#[derive(Debug, Clone)]
pub struct SpecMirrorOptions {
    /// Replace destination files that already exist.
    ///
    /// When `false`, an existing same-named destination entry fails the run
    /// with [`MirrorError::ConflictOnOverwriteDisabled`].
    pub if_overwrite_existing: bool,
    /// Directory name skipped on both source and destination side, at any depth.
    /// Empty string ignores nothing.
    pub name_ignore: String,
    /// Interpretation of `name_ignore`.
    pub rule_ignore: EnumMirrorIgnoreMode,
    /// Re-apply permissions, times and xattrs after each copy (Linux only).
    pub if_preserve_metadata: bool,
}

impl Default for SpecMirrorOptions {
    fn default() -> Self {
        Self {
            if_overwrite_existing: true,
            name_ignore: String::new(),
            rule_ignore: EnumMirrorIgnoreMode::Exact,
            if_preserve_metadata: true,
        }
    }
}

impl SpecMirrorOptions {
    /// Options with the two knobs every caller sets.
    pub fn new(if_overwrite_existing: bool, name_ignore: impl Into<String>) -> Self {
        Self {
            if_overwrite_existing,
            name_ignore: name_ignore.into(),
            ..Self::default()
        }
    }
}

/// Failures raised by the classifier.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Path does not reference an existing regular file.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Sampling read failed.
    #[error("Failed to sample {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ClassifyError {
    /// `io::ErrorKind` of the failed sampling read, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            Self::NotFound(_) => None,
        }
    }
}

/// Failures raised by `mirror_tree`. The first failure aborts the run.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Source directory does not exist.
    #[error("Source not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Source path exists but is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// One tree contains the other with no ignored directory between them.
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        dir_source.display(),
        dir_destination.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        dir_source: PathBuf,
        /// Normalized destination directory.
        dir_destination: PathBuf,
    },
    /// Invalid glob/regex in `name_ignore`.
    #[error("{0}")]
    InvalidPattern(String),
    /// Destination entry exists and overwrite is disabled.
    #[error("Destination exists and overwrite is disabled: {}", .0.display())]
    ConflictOnOverwriteDisabled(PathBuf),
    /// Underlying filesystem call failed.
    #[error("Failed to {op} {}: {source}", path.display())]
    Io {
        op: EnumMirrorOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MirrorError {
    pub(crate) fn from_io(op: EnumMirrorOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// `io::ErrorKind` of the underlying failure, if this is an I/O error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
