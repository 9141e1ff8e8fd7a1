//! One-way recursive directory mirroring.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, trace};

use crate::report::{ReportMirror, ReportMirrorBuilder};
use crate::spec::{EnumMirrorOp, MirrorError, SpecMirrorOptions};
use crate::util::{
    SpecListedEntry, TypeIgnoreMatcher, copy_file_with_metadata, ensure_directory, is_overlap,
    list_directory, remove_directory_entry, remove_file_entry, remove_symlink,
};

#[derive(Debug)]
struct SpecMirrorContext {
    spec_mirror_options: SpecMirrorOptions,
    matcher_ignore: TypeIgnoreMatcher,
    builder_mirror_report: ReportMirrorBuilder,
}

/// Make `dir_destination` match `dir_source`.
///
/// Per directory level, depth first:
/// 1. Create the destination directory (and missing ancestors).
/// 2. Copy every source file; delete destination files the source lacks.
/// 3. Recurse into every source subdirectory that is not ignored; delete
///    destination subdirectories that are neither ignored nor retained.
///
/// Directories matching [`SpecMirrorOptions::name_ignore`] are never read on
/// the source side and never touched on the destination side.
///
/// The first failing filesystem call aborts the run; work already done stays
/// in place. Returns a [`ReportMirror`] summary on success.
pub fn mirror_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_mirror_options: SpecMirrorOptions,
) -> Result<ReportMirror, MirrorError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let matcher_ignore = TypeIgnoreMatcher::from_raw(
        &spec_mirror_options.name_ignore,
        spec_mirror_options.rule_ignore,
    )?;

    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    match fs::metadata(&path_dir_src) {
        Ok(meta_dir_src) if meta_dir_src.is_dir() => {}
        Ok(_) => return Err(MirrorError::SourceNotDirectory(path_dir_src)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MirrorError::NotFound(path_dir_src));
        }
        Err(e) => return Err(MirrorError::from_io(EnumMirrorOp::Metadata, path_dir_src, e)),
    }
    if is_overlap(&path_dir_src, &path_dir_dst, &matcher_ignore) {
        return Err(MirrorError::SourceDestinationOverlap {
            dir_source: path_dir_src,
            dir_destination: path_dir_dst,
        });
    }

    debug!(
        source = %path_dir_src.display(),
        destination = %path_dir_dst.display(),
        if_overwrite_existing = spec_mirror_options.if_overwrite_existing,
        name_ignore = %spec_mirror_options.name_ignore,
        "mirror started"
    );

    let mut spec_mirror_ctx = SpecMirrorContext {
        spec_mirror_options,
        matcher_ignore,
        builder_mirror_report: ReportMirrorBuilder::default(),
    };
    mirror_directory(&path_dir_src, &path_dir_dst, &mut spec_mirror_ctx)?;

    let report_mirror = spec_mirror_ctx.builder_mirror_report.build();
    debug!(report = %report_mirror, "mirror finished");
    Ok(report_mirror)
}

fn mirror_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_mirror_ctx: &mut SpecMirrorContext,
) -> Result<(), MirrorError> {
    if ensure_directory(path_dir_dst)? {
        trace!(path = %path_dir_dst.display(), "created directory");
        spec_mirror_ctx.builder_mirror_report.add_dir_created();
    }

    let spec_listing_src = list_directory(path_dir_src)?;

    let mut set_names_file_kept: HashSet<OsString> =
        HashSet::with_capacity(spec_listing_src.l_files.len());
    for spec_entry in &spec_listing_src.l_files {
        let path_file_dst = path_dir_dst.join(&spec_entry.name_entry);
        sync_file(&spec_entry.path_entry, &path_file_dst, spec_mirror_ctx)?;
        set_names_file_kept.insert(spec_entry.name_entry.clone());
    }

    let spec_listing_dst = list_directory(path_dir_dst)?;
    for spec_entry in &spec_listing_dst.l_files {
        if set_names_file_kept.contains(&spec_entry.name_entry) {
            continue;
        }
        remove_file_entry(spec_entry)?;
        trace!(path = %spec_entry.path_entry.display(), "deleted orphan file");
        spec_mirror_ctx.builder_mirror_report.add_file_deleted();
    }

    let mut set_names_dir_kept: HashSet<OsString> =
        HashSet::with_capacity(spec_listing_src.l_dirs.len());
    for spec_entry in &spec_listing_src.l_dirs {
        if is_ignored_dir(spec_entry, spec_mirror_ctx) {
            trace!(path = %spec_entry.path_entry.display(), "skipped ignored directory");
            spec_mirror_ctx.builder_mirror_report.add_dir_ignored();
            continue;
        }
        let path_dir_dst_sub = path_dir_dst.join(&spec_entry.name_entry);
        if path_dir_dst_sub.is_symlink() {
            remove_symlink(&path_dir_dst_sub)?;
            trace!(path = %path_dir_dst_sub.display(), "unlinked destination symlink");
        }
        mirror_directory(&spec_entry.path_entry, &path_dir_dst_sub, spec_mirror_ctx)?;
        set_names_dir_kept.insert(spec_entry.name_entry.clone());
    }

    // Directories created by the descent above are retained by construction,
    // so the listing taken before it is sufficient.
    for spec_entry in &spec_listing_dst.l_dirs {
        if is_ignored_dir(spec_entry, spec_mirror_ctx)
            || set_names_dir_kept.contains(&spec_entry.name_entry)
        {
            continue;
        }
        remove_directory_entry(spec_entry)?;
        trace!(path = %spec_entry.path_entry.display(), "deleted orphan directory");
        spec_mirror_ctx.builder_mirror_report.add_dir_deleted();
    }

    Ok(())
}

fn is_ignored_dir(spec_entry: &SpecListedEntry, spec_mirror_ctx: &SpecMirrorContext) -> bool {
    spec_mirror_ctx
        .matcher_ignore
        .is_ignored(&spec_entry.name_entry.to_string_lossy())
}

fn sync_file(
    path_file_src: &Path,
    path_file_dst: &Path,
    spec_mirror_ctx: &mut SpecMirrorContext,
) -> Result<(), MirrorError> {
    match fs::symlink_metadata(path_file_dst) {
        Ok(meta_file_dst) => {
            if !spec_mirror_ctx.spec_mirror_options.if_overwrite_existing {
                return Err(MirrorError::ConflictOnOverwriteDisabled(
                    path_file_dst.to_path_buf(),
                ));
            }
            // Never write through a destination link.
            if meta_file_dst.file_type().is_symlink() {
                remove_symlink(path_file_dst)?;
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(MirrorError::from_io(EnumMirrorOp::Metadata, path_file_dst, e)),
    }

    let n_bytes = copy_file_with_metadata(
        path_file_src,
        path_file_dst,
        spec_mirror_ctx.spec_mirror_options.if_preserve_metadata,
    )
    .map_err(|e| MirrorError::from_io(EnumMirrorOp::CopyFile, path_file_dst, e))?;

    trace!(
        source = %path_file_src.display(),
        destination = %path_file_dst.display(),
        n_bytes,
        "copied file"
    );
    spec_mirror_ctx.builder_mirror_report.add_file_copied(n_bytes);
    Ok(())
}
