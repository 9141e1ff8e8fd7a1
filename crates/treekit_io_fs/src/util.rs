use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumMirrorIgnoreMode, EnumMirrorOp, MirrorError};

////////////////////////////////////////////////////////////////////////////////
// #region IgnoreMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeIgnoreMatcher {
    Nothing,
    Exact(String),
    Glob(GlobMatcher),
    Regex(Regex),
}

impl TypeIgnoreMatcher {
    pub(crate) fn from_raw(
        name_ignore: &str,
        rule_ignore: EnumMirrorIgnoreMode,
    ) -> Result<Self, MirrorError> {
        if name_ignore.is_empty() {
            return Ok(Self::Nothing);
        }

        match rule_ignore {
            EnumMirrorIgnoreMode::Exact => Ok(Self::Exact(name_ignore.to_string())),
            EnumMirrorIgnoreMode::Glob => {
                let matcher = Glob::new(name_ignore)
                    .map_err(|e| {
                        MirrorError::InvalidPattern(format!("Invalid ignore pattern: {e}"))
                    })?
                    .compile_matcher();
                Ok(Self::Glob(matcher))
            }
            EnumMirrorIgnoreMode::Regex => {
                let regex = Regex::new(name_ignore).map_err(|e| {
                    MirrorError::InvalidPattern(format!("Invalid ignore pattern: {e}"))
                })?;
                Ok(Self::Regex(regex))
            }
        }
    }

    /// Regex patterns match anywhere in the name unless anchored.
    pub(crate) fn is_ignored(&self, name_dir: &str) -> bool {
        match self {
            Self::Nothing => false,
            Self::Exact(v) => v == name_dir,
            Self::Glob(v) => v.is_match(name_dir),
            Self::Regex(v) => v.is_match(name_dir),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Lower-cased extension of the final path segment, leading dot included.
///
/// `archive.tar.GZ` gives `.gz` and `.bashrc` gives `.bashrc`. A name ending
/// with `.` or without any dot has no extension.
pub fn derive_extension<P: AsRef<Path>>(path: P) -> Option<String> {
    let name_file = path.as_ref().file_name()?.to_string_lossy();
    let idx_dot = name_file.rfind('.')?;
    if idx_dot + 1 == name_file.len() {
        return None;
    }
    Some(name_file[idx_dot..].to_lowercase())
}

/// Absolute path with links resolved through its nearest existing ancestor.
///
/// Components below that ancestor (a destination not created yet) are
/// appended unchanged.
fn resolve_through_existing_ancestor(path: &Path) -> PathBuf {
    let path_abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let mut l_names_missing: Vec<OsString> = Vec::new();
    let mut path_probe = path_abs.as_path();
    loop {
        if let Ok(path_real) = fs::canonicalize(path_probe) {
            return l_names_missing
                .iter()
                .rev()
                .fold(path_real, |path_acc, name| path_acc.join(name));
        }
        match (path_probe.parent(), path_probe.file_name()) {
            (Some(path_parent), Some(name)) => {
                l_names_missing.push(name.to_os_string());
                path_probe = path_parent;
            }
            _ => return path_abs,
        }
    }
}

/// Whether mirroring `src` onto `dst` would walk into its own output.
///
/// Nested trees are accepted when an ignored directory separates them. A
/// destination below the source needs an ignored name anywhere on the path
/// between the two. A source below the destination needs the first name
/// under the destination to be ignored, otherwise the destination walk
/// would descend into or prune the source.
pub(crate) fn is_overlap(src: &Path, dst: &Path, matcher_ignore: &TypeIgnoreMatcher) -> bool {
    let path_src = resolve_through_existing_ancestor(src);
    let path_dst = resolve_through_existing_ancestor(dst);
    let is_ignored_component =
        |c: Component<'_>| matcher_ignore.is_ignored(&c.as_os_str().to_string_lossy());

    if let Ok(path_rel) = path_dst.strip_prefix(&path_src) {
        return !path_rel.components().any(is_ignored_component);
    }
    if let Ok(path_rel) = path_src.strip_prefix(&path_dst) {
        return !path_rel.components().next().is_some_and(is_ignored_component);
    }
    false
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DirectoryListing

#[derive(Debug, Clone)]
pub(crate) struct SpecListedEntry {
    pub(crate) path_entry: PathBuf,
    pub(crate) name_entry: OsString,
    pub(crate) if_is_symlink: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SpecDirListing {
    pub(crate) l_files: Vec<SpecListedEntry>,
    pub(crate) l_dirs: Vec<SpecListedEntry>,
}

/// One-level listing split into files and directories, sorted by name.
///
/// Symlinks resolving to a directory are listed as directories; every other
/// non-directory entry (broken links included) is listed as a file.
pub(crate) fn list_directory(path_dir: &Path) -> Result<SpecDirListing, MirrorError> {
    let iter_entries = fs::read_dir(path_dir)
        .map_err(|e| MirrorError::from_io(EnumMirrorOp::ReadDir, path_dir, e))?;

    let mut spec_listing = SpecDirListing::default();
    for _entry_res in iter_entries {
        let entry =
            _entry_res.map_err(|e| MirrorError::from_io(EnumMirrorOp::ReadDir, path_dir, e))?;
        let path_entry = entry.path();
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| MirrorError::from_io(EnumMirrorOp::Metadata, &path_entry, e))?;

        let b_is_symlink = cfg_file_type.is_symlink();
        let b_is_dir = cfg_file_type.is_dir() || (b_is_symlink && path_entry.is_dir());
        let spec_entry = SpecListedEntry {
            path_entry,
            name_entry: entry.file_name(),
            if_is_symlink: b_is_symlink,
        };
        if b_is_dir {
            spec_listing.l_dirs.push(spec_entry);
        } else {
            spec_listing.l_files.push(spec_entry);
        }
    }

    spec_listing
        .l_dirs
        .sort_by(|a, b| a.name_entry.cmp(&b.name_entry));
    spec_listing
        .l_files
        .sort_by(|a, b| a.name_entry.cmp(&b.name_entry));
    Ok(spec_listing)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileOperations

/// `mkdir -p`; returns `true` when the directory had to be created.
pub(crate) fn ensure_directory(path_dir: &Path) -> Result<bool, MirrorError> {
    if path_dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path_dir)
        .map_err(|e| MirrorError::from_io(EnumMirrorOp::CreateDir, path_dir, e))?;
    Ok(true)
}

/// Remove a listed destination directory. Links are unlinked, never followed.
pub(crate) fn remove_directory_entry(spec_entry: &SpecListedEntry) -> Result<(), MirrorError> {
    let path_dir = &spec_entry.path_entry;
    let res_remove = if spec_entry.if_is_symlink {
        _remove_symlink_dir(path_dir)
    } else {
        fs::remove_dir_all(path_dir)
    };
    res_remove.map_err(|e| MirrorError::from_io(EnumMirrorOp::RemoveDir, path_dir, e))
}

/// Unlink a destination symlink of either kind.
pub(crate) fn remove_symlink(path_link: &Path) -> Result<(), MirrorError> {
    if path_link.is_dir() {
        _remove_symlink_dir(path_link)
            .map_err(|e| MirrorError::from_io(EnumMirrorOp::RemoveDir, path_link, e))
    } else {
        fs::remove_file(path_link)
            .map_err(|e| MirrorError::from_io(EnumMirrorOp::RemoveFile, path_link, e))
    }
}

pub(crate) fn remove_file_entry(spec_entry: &SpecListedEntry) -> Result<(), MirrorError> {
    fs::remove_file(&spec_entry.path_entry).map_err(|e| {
        MirrorError::from_io(EnumMirrorOp::RemoveFile, &spec_entry.path_entry, e)
    })
}

#[cfg(windows)]
fn _remove_symlink_dir(path_link: &Path) -> Result<(), io::Error> {
    fs::remove_dir(path_link)
}

#[cfg(not(windows))]
fn _remove_symlink_dir(path_link: &Path) -> Result<(), io::Error> {
    fs::remove_file(path_link)
}

pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> Result<u64, io::Error> {
    let n_bytes = fs::copy(path_file_src, path_file_dst)?;
    if if_preserve_metadata {
        preserve_file_metadata(path_file_src, path_file_dst)?;
    }
    Ok(n_bytes)
}

/// Re-apply source xattrs, mode and times onto a freshly copied file.
///
/// Extended attributes are best effort; filesystems without xattr support
/// leave the destination without them.
#[cfg(target_os = "linux")]
fn preserve_file_metadata(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::FileTime;

    if let Ok(iter_names_attr) = xattr::list(path_file_src) {
        for name_attr in iter_names_attr {
            if let Ok(Some(raw_value)) = xattr::get(path_file_src, &name_attr) {
                let _ = xattr::set(path_file_dst, &name_attr, &raw_value);
            }
        }
    }

    let meta_file_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, meta_file_src.permissions())?;
    filetime::set_file_times(
        path_file_dst,
        FileTime::from_last_access_time(&meta_file_src),
        FileTime::from_last_modification_time(&meta_file_src),
    )
}

// Times and xattrs are preserved on Linux only.
#[cfg(not(target_os = "linux"))]
fn preserve_file_metadata(_path_file_src: &Path, _path_file_dst: &Path) -> Result<(), io::Error> {
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
