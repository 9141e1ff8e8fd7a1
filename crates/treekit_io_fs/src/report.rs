//! Mirror report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// Aggregate counters for one successful `mirror_tree` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportMirror {
    /// Source files copied onto the destination.
    pub cnt_files_copied: u64,
    /// Destination files deleted because the source lacks them.
    pub cnt_files_deleted: u64,
    /// Destination directories created (root included).
    pub cnt_dirs_created: u64,
    /// Destination directories deleted recursively.
    pub cnt_dirs_deleted: u64,
    /// Source directories skipped by the ignore rule.
    pub cnt_dirs_ignored: u64,
    /// Bytes written by file copies.
    pub n_bytes_copied: u64,
}

impl ReportMirror {
    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert("cnt_files_deleted".to_string(), self.cnt_files_deleted);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_dirs_deleted".to_string(), self.cnt_dirs_deleted);
        dict_counts.insert("cnt_dirs_ignored".to_string(), self.cnt_dirs_ignored);
        dict_counts.insert("n_bytes_copied".to_string(), self.n_bytes_copied);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} copied={} deleted={} dirs_created={} dirs_deleted={} ignored={} bytes={}",
            self.cnt_files_copied,
            self.cnt_files_deleted,
            self.cnt_dirs_created,
            self.cnt_dirs_deleted,
            self.cnt_dirs_ignored,
            self.n_bytes_copied
        )
    }
}

impl fmt::Display for ReportMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[MIRROR]"))
    }
}

/// Mutable accumulator threaded through the recursion.
#[derive(Debug, Default, Clone)]
pub struct ReportMirrorBuilder {
    report: ReportMirror,
}

impl ReportMirrorBuilder {
    pub fn add_file_copied(&mut self, n_bytes: u64) {
        self.report.cnt_files_copied += 1;
        self.report.n_bytes_copied += n_bytes;
    }

    pub fn add_file_deleted(&mut self) {
        self.report.cnt_files_deleted += 1;
    }

    pub fn add_dir_created(&mut self) {
        self.report.cnt_dirs_created += 1;
    }

    pub fn add_dir_deleted(&mut self) {
        self.report.cnt_dirs_deleted += 1;
    }

    pub fn add_dir_ignored(&mut self) {
        self.report.cnt_dirs_ignored += 1;
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportMirror {
        self.report
    }
}
