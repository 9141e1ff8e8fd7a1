use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use pyo3::exceptions::{
    PyFileExistsError, PyFileNotFoundError, PyNotADirectoryError, PyOSError, PyPermissionError,
    PyValueError,
};
use pyo3::prelude::*;
use treekit_io_fs::{
    Classifier, ClassifyError, EnumFileClass, EnumMirrorIgnoreMode, MirrorError,
    N_SAMPLE_SIZE_BYTES_DEFAULT, ReportMirror, SpecExtensionCache, SpecMirrorOptions,
    derive_extension, mirror_tree,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "treekit.fs.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "ReportMirror")]
#[derive(Debug, Clone)]
struct PyReportMirror {
    #[pyo3(get)]
    cnt_files_copied: u64,
    #[pyo3(get)]
    cnt_files_deleted: u64,
    #[pyo3(get)]
    cnt_dirs_created: u64,
    #[pyo3(get)]
    cnt_dirs_deleted: u64,
    #[pyo3(get)]
    cnt_dirs_ignored: u64,
    #[pyo3(get)]
    n_bytes_copied: u64,
}

impl From<ReportMirror> for PyReportMirror {
    fn from(report_mirror: ReportMirror) -> Self {
        Self {
            cnt_files_copied: report_mirror.cnt_files_copied,
            cnt_files_deleted: report_mirror.cnt_files_deleted,
            cnt_dirs_created: report_mirror.cnt_dirs_created,
            cnt_dirs_deleted: report_mirror.cnt_dirs_deleted,
            cnt_dirs_ignored: report_mirror.cnt_dirs_ignored,
            n_bytes_copied: report_mirror.n_bytes_copied,
        }
    }
}

impl PyReportMirror {
    fn as_report(&self) -> ReportMirror {
        ReportMirror {
            cnt_files_copied: self.cnt_files_copied,
            cnt_files_deleted: self.cnt_files_deleted,
            cnt_dirs_created: self.cnt_dirs_created,
            cnt_dirs_deleted: self.cnt_dirs_deleted,
            cnt_dirs_ignored: self.cnt_dirs_ignored,
            n_bytes_copied: self.n_bytes_copied,
        }
    }
}

#[pymethods]
impl PyReportMirror {
    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.as_report().to_dict()
    }

    #[pyo3(signature = (prefix = "[MIRROR]"))]
    fn format(&self, prefix: &str) -> String {
        self.as_report().format(prefix)
    }

    fn __str__(&self) -> String {
        self.format("[MIRROR]")
    }
}

#[pyclass(name = "Classifier", frozen)]
#[derive(Debug)]
struct PyClassifier {
    inner: Classifier,
}

#[pymethods]
impl PyClassifier {
    #[new]
    #[pyo3(signature = (if_seed_builtin = true))]
    fn new(if_seed_builtin: bool) -> Self {
        let cache = if if_seed_builtin {
            SpecExtensionCache::with_builtin_seed()
        } else {
            SpecExtensionCache::empty()
        };
        Self {
            inner: Classifier::with_cache(cache),
        }
    }

    #[pyo3(signature = (path, sample_size = N_SAMPLE_SIZE_BYTES_DEFAULT))]
    fn classify(&self, py: Python<'_>, path: PathBuf, sample_size: usize) -> PyResult<&'static str> {
        let res_class = py.allow_threads(|| {
            self.inner
                .classify_with_sample_size(&path, sample_size)
        });
        res_class
            .map(EnumFileClass::as_str)
            .map_err(map_classify_error)
    }

    fn cached_class(&self, ext: &str) -> Option<&'static str> {
        self.inner.cached_class(ext).map(EnumFileClass::as_str)
    }

    fn __len__(&self) -> usize {
        self.inner.snapshot_cache().len()
    }
}

fn parse_rule_ignore(value: &str) -> PyResult<EnumMirrorIgnoreMode> {
    match value {
        "exact" => Ok(EnumMirrorIgnoreMode::Exact),
        "glob" => Ok(EnumMirrorIgnoreMode::Glob),
        "regex" => Ok(EnumMirrorIgnoreMode::Regex),
        _ => Err(PyValueError::new_err(format!(
            "Invalid ignore strategy: `{value}`. Expected one of: ['exact', 'glob', 'regex']"
        ))),
    }
}

fn map_io_kind(kind: io::ErrorKind, message: String) -> PyErr {
    match kind {
        io::ErrorKind::NotFound => PyFileNotFoundError::new_err(message),
        io::ErrorKind::PermissionDenied => PyPermissionError::new_err(message),
        io::ErrorKind::AlreadyExists => PyFileExistsError::new_err(message),
        _ => PyOSError::new_err(message),
    }
}

fn map_classify_error(exception: ClassifyError) -> PyErr {
    let message = exception.to_string();
    if let Some(kind) = exception.io_kind() {
        return map_io_kind(kind, message);
    }
    PyFileNotFoundError::new_err(message)
}

fn map_mirror_error(exception: MirrorError) -> PyErr {
    let message = exception.to_string();
    if let Some(kind) = exception.io_kind() {
        return map_io_kind(kind, message);
    }
    match exception {
        MirrorError::NotFound(_) => PyFileNotFoundError::new_err(message),
        MirrorError::SourceNotDirectory(_) => PyNotADirectoryError::new_err(message),
        MirrorError::ConflictOnOverwriteDisabled(_) => PyFileExistsError::new_err(message),
        MirrorError::InvalidPattern(_) | MirrorError::SourceDestinationOverlap { .. } => {
            PyValueError::new_err(message)
        }
        MirrorError::Io { .. } => PyOSError::new_err(message),
    }
}

/// One-shot classification with a fresh seeded cache.
#[pyfunction(name = "classify_file")]
#[pyo3(signature = (path, sample_size = N_SAMPLE_SIZE_BYTES_DEFAULT))]
fn classify_file_py(py: Python<'_>, path: PathBuf, sample_size: usize) -> PyResult<&'static str> {
    let res_class =
        py.allow_threads(|| Classifier::new().classify_with_sample_size(&path, sample_size));
    res_class
        .map(EnumFileClass::as_str)
        .map_err(map_classify_error)
}

#[pyfunction(name = "derive_extension")]
fn derive_extension_py(path: PathBuf) -> Option<String> {
    derive_extension(path)
}

#[pyfunction(name = "mirror_tree")]
#[pyo3(signature = (
    dir_source,
    dir_destination,
    if_overwrite_existing = true,
    name_ignore = "",
    rule_ignore = "exact",
    if_preserve_metadata = true
))]
fn mirror_tree_py(
    py: Python<'_>,
    dir_source: PathBuf,
    dir_destination: PathBuf,
    if_overwrite_existing: bool,
    name_ignore: &str,
    rule_ignore: &str,
    if_preserve_metadata: bool,
) -> PyResult<PyReportMirror> {
    let spec_mirror_options = SpecMirrorOptions {
        if_overwrite_existing,
        name_ignore: name_ignore.to_string(),
        rule_ignore: parse_rule_ignore(rule_ignore)?,
        if_preserve_metadata,
    };

    let report_mirror =
        py.allow_threads(|| mirror_tree(dir_source, dir_destination, spec_mirror_options));
    let report_mirror = report_mirror.map_err(map_mirror_error)?;
    Ok(PyReportMirror::from(report_mirror))
}

#[pymodule]
fn _treekit_io_fs_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyReportMirror>()?;
    module.add_class::<PyClassifier>()?;
    module.add_function(wrap_pyfunction!(classify_file_py, module)?)?;
    module.add_function(wrap_pyfunction!(derive_extension_py, module)?)?;
    module.add_function(wrap_pyfunction!(mirror_tree_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
