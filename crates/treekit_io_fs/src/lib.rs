//! `treekit_io_fs` v1:
//! Rust-side filesystem kernel for text/binary classification and one-way
//! directory mirroring.
//!
//! Modules:
//! - `conf`     : constants and built-in extension tables
//! - `classify` : extension cache, classifier and content sampling
//! - `mirror`   : recursive mirror orchestration
//! - `spec`     : enums/options/errors
//! - `report`   : mirror run report model
//! - `util`     : shared helper functions
//!
//! The two components are independent. Both are synchronous; a
//! [`Classifier`] may be shared between threads, `mirror_tree` runs
//! depth-first on the calling thread.

pub mod classify;
pub mod conf;
pub mod mirror;
pub mod report;
pub mod spec;
mod util;

pub use classify::{Classifier, SpecExtensionCache, classify_sample};
pub use conf::{N_SAMPLE_SIZE_BYTES_DEFAULT, TUP_EXTS_BINARY_BUILTIN, TUP_EXTS_TEXT_BUILTIN};
pub use mirror::mirror_tree;
pub use report::{ReportMirror, ReportMirrorBuilder};
pub use spec::{
    ClassifyError, EnumFileClass, EnumMirrorIgnoreMode, EnumMirrorOp, MirrorError,
    SpecMirrorOptions,
};
pub use util::derive_extension;
