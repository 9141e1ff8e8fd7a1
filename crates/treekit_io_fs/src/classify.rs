//! Text/binary classification backed by a per-classifier extension cache.
//!
//! A verdict comes from the extension cache when the extension is known and
//! from content sampling otherwise. Sampling reads the leading bytes of the
//! file, decodes them as text and looks for a run of three NUL characters.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::conf::{
    N_NUL_RUN_BINARY, N_SAMPLE_SIZE_BYTES_DEFAULT, TUP_EXTS_BINARY_BUILTIN, TUP_EXTS_TEXT_BUILTIN,
};
use crate::spec::{ClassifyError, EnumFileClass};
use crate::util::derive_extension;

////////////////////////////////////////////////////////////////////////////////
// #region ExtensionCache

/// Extension -> verdict mapping split into a text and a binary partition.
///
/// Keys are lower-cased extensions with their leading dot. An extension sits
/// in at most one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExtensionCache {
    set_exts_text: HashSet<String>,
    set_exts_binary: HashSet<String>,
}

impl Default for SpecExtensionCache {
    fn default() -> Self {
        Self::with_builtin_seed()
    }
}

impl SpecExtensionCache {
    /// Cache with no known extensions; every lookup misses.
    pub fn empty() -> Self {
        Self {
            set_exts_text: HashSet::new(),
            set_exts_binary: HashSet::new(),
        }
    }

    /// Cache seeded with the built-in text and binary extension tables.
    pub fn with_builtin_seed() -> Self {
        Self {
            set_exts_text: TUP_EXTS_TEXT_BUILTIN.iter().map(|v| v.to_string()).collect(),
            set_exts_binary: TUP_EXTS_BINARY_BUILTIN
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }

    pub fn lookup(&self, ext: &str) -> Option<EnumFileClass> {
        let ext = ext.to_lowercase();
        if self.set_exts_text.contains(&ext) {
            return Some(EnumFileClass::Text);
        }
        if self.set_exts_binary.contains(&ext) {
            return Some(EnumFileClass::Binary);
        }
        None
    }

    /// Store `enum_class` for `ext`, moving it out of the other partition.
    ///
    /// Returns `false` when the cache already held this exact verdict.
    pub fn record(&mut self, ext: &str, enum_class: EnumFileClass) -> bool {
        let ext = ext.to_lowercase();
        let (set_target, set_other) = match enum_class {
            EnumFileClass::Text => (&mut self.set_exts_text, &mut self.set_exts_binary),
            EnumFileClass::Binary => (&mut self.set_exts_binary, &mut self.set_exts_text),
        };
        set_other.remove(&ext);
        set_target.insert(ext)
    }

    pub fn len(&self) -> usize {
        self.set_exts_text.len() + self.set_exts_binary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Classifier

/// File classifier owning its own extension cache.
///
/// The cache sits behind a read/write lock, so one classifier can be shared
/// between threads through `&self`.
#[derive(Debug)]
pub struct Classifier {
    cache: RwLock<SpecExtensionCache>,
    n_sample_size_bytes: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Classifier with the built-in seed and a 10 KiB sample.
    pub fn new() -> Self {
        Self::with_cache(SpecExtensionCache::with_builtin_seed())
    }

    pub fn with_cache(cache: SpecExtensionCache) -> Self {
        Self {
            cache: RwLock::new(cache),
            n_sample_size_bytes: N_SAMPLE_SIZE_BYTES_DEFAULT,
        }
    }

    /// Override the default sample size used by [`Classifier::classify`].
    pub fn with_sample_size(mut self, n_sample_size_bytes: usize) -> Self {
        self.n_sample_size_bytes = n_sample_size_bytes;
        self
    }

    pub fn sample_size(&self) -> usize {
        self.n_sample_size_bytes
    }

    pub fn classify<P: AsRef<Path>>(&self, path: P) -> Result<EnumFileClass, ClassifyError> {
        self.classify_with_sample_size(path, self.n_sample_size_bytes)
    }

    /// Classify `path`, sampling at most `n_sample_size_bytes` on a cache miss.
    ///
    /// Fails with [`ClassifyError::NotFound`] when `path` is not an existing
    /// regular file. A non-empty extension seen for the first time is recorded
    /// with the sampled verdict.
    pub fn classify_with_sample_size<P: AsRef<Path>>(
        &self,
        path: P,
        n_sample_size_bytes: usize,
    ) -> Result<EnumFileClass, ClassifyError> {
        let path_file = path.as_ref();
        match fs::metadata(path_file) {
            Ok(meta_file) if meta_file.is_file() => {}
            Ok(_) => return Err(ClassifyError::NotFound(path_file.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ClassifyError::NotFound(path_file.to_path_buf()));
            }
            Err(e) => {
                return Err(ClassifyError::Io {
                    path: path_file.to_path_buf(),
                    source: e,
                });
            }
        }

        let ext = derive_extension(path_file);
        if let Some(ext) = ext.as_deref()
            && let Some(enum_class) = self.cache.read().lookup(ext)
        {
            trace!(path = %path_file.display(), ext, class = %enum_class, "extension cache hit");
            return Ok(enum_class);
        }

        let raw_sample = read_sample(path_file, n_sample_size_bytes).map_err(|e| {
            ClassifyError::Io {
                path: path_file.to_path_buf(),
                source: e,
            }
        })?;
        let enum_class = classify_sample(&raw_sample);
        debug!(
            path = %path_file.display(),
            n_bytes_sampled = raw_sample.len(),
            class = %enum_class,
            "classified by content sampling"
        );

        let Some(ext) = ext else {
            return Ok(enum_class);
        };
        let mut cache = self.cache.write();
        // Another thread may have recorded this extension since the read lock.
        if let Some(enum_class_cached) = cache.lookup(&ext) {
            return Ok(enum_class_cached);
        }
        cache.record(&ext, enum_class);
        Ok(enum_class)
    }

    /// Cached verdict for `ext`, if any.
    pub fn cached_class(&self, ext: &str) -> Option<EnumFileClass> {
        self.cache.read().lookup(ext)
    }

    /// Copy of the current cache contents.
    pub fn snapshot_cache(&self) -> SpecExtensionCache {
        self.cache.read().clone()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Sampling

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumSampleEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

/// Decide text vs. binary from raw leading bytes, with no cache involved.
pub fn classify_sample(raw_sample: &[u8]) -> EnumFileClass {
    let c_decoded = decode_sample(raw_sample);
    if has_nul_run(&c_decoded, N_NUL_RUN_BINARY) {
        EnumFileClass::Binary
    } else {
        EnumFileClass::Text
    }
}

fn read_sample(path_file: &Path, n_sample_size_bytes: usize) -> Result<Vec<u8>, io::Error> {
    let file = File::open(path_file)?;
    let mut raw_sample = Vec::with_capacity(n_sample_size_bytes.min(64 * 1024));
    file.take(n_sample_size_bytes as u64)
        .read_to_end(&mut raw_sample)?;
    Ok(raw_sample)
}

fn detect_encoding(raw_sample: &[u8]) -> (EnumSampleEncoding, usize) {
    match raw_sample {
        [0xEF, 0xBB, 0xBF, ..] => (EnumSampleEncoding::Utf8, 3),
        [0xFF, 0xFE, 0x00, 0x00, ..] => (EnumSampleEncoding::Utf32Le, 4),
        [0x00, 0x00, 0xFE, 0xFF, ..] => (EnumSampleEncoding::Utf32Be, 4),
        [0xFF, 0xFE, ..] => (EnumSampleEncoding::Utf16Le, 2),
        [0xFE, 0xFF, ..] => (EnumSampleEncoding::Utf16Be, 2),
        _ => (EnumSampleEncoding::Utf8, 0),
    }
}

/// Lossy decode. Invalid UTF-8 becomes U+FFFD; a partial UTF-16/32 unit at the end is dropped.
fn decode_sample(raw_sample: &[u8]) -> String {
    let (enum_encoding, n_bom_len) = detect_encoding(raw_sample);
    let raw_body = &raw_sample[n_bom_len..];

    match enum_encoding {
        EnumSampleEncoding::Utf8 => String::from_utf8_lossy(raw_body).into_owned(),
        EnumSampleEncoding::Utf16Le | EnumSampleEncoding::Utf16Be => {
            let iter_units = raw_body.chunks_exact(2).map(|v| {
                if enum_encoding == EnumSampleEncoding::Utf16Le {
                    u16::from_le_bytes([v[0], v[1]])
                } else {
                    u16::from_be_bytes([v[0], v[1]])
                }
            });
            char::decode_utf16(iter_units)
                .map(|v| v.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        EnumSampleEncoding::Utf32Le | EnumSampleEncoding::Utf32Be => raw_body
            .chunks_exact(4)
            .map(|v| {
                let raw_unit = [v[0], v[1], v[2], v[3]];
                let n_code_point = if enum_encoding == EnumSampleEncoding::Utf32Le {
                    u32::from_le_bytes(raw_unit)
                } else {
                    u32::from_be_bytes(raw_unit)
                };
                char::from_u32(n_code_point).unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect(),
    }
}

fn has_nul_run(c_decoded: &str, n_run_len: usize) -> bool {
    let mut n_run = 0;
    for ch in c_decoded.chars() {
        if ch == '\0' {
            n_run += 1;
            if n_run >= n_run_len {
                return true;
            }
        } else {
            n_run = 0;
        }
    }
    false
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use super::{Classifier, SpecExtensionCache, classify_sample, decode_sample};
    use crate::spec::{ClassifyError, EnumFileClass};

    fn write_bytes(dir: &Path, name: &str, raw: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, raw).expect("write bytes");
        path
    }

    #[test]
    fn seeded_text_extensions_skip_sampling() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();

        // Binary content, but the extension verdict wins.
        for name in ["a.txt", "B.JAVA", "c.xml"] {
            let path = write_bytes(tmp.path(), name, b"AAA\0\0\0");
            assert_eq!(classifier.classify(&path).unwrap(), EnumFileClass::Text);
        }
    }

    #[test]
    fn seeded_text_extensions_classify_text_when_cold() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::with_cache(SpecExtensionCache::empty());

        for name in ["a.txt", "b.java", "c.xml"] {
            let path = write_bytes(tmp.path(), name, b"<root>plain text</root>\n");
            assert_eq!(classifier.classify(&path).unwrap(), EnumFileClass::Text);
        }
        assert_eq!(classifier.cached_class(".java"), Some(EnumFileClass::Text));
    }

    #[test]
    fn seeded_binary_extensions_classify_binary() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();

        for name in ["a.gz", "b.zip", "c.EXE"] {
            let path = write_bytes(tmp.path(), name, b"just ascii");
            assert_eq!(classifier.classify(&path).unwrap(), EnumFileClass::Binary);
        }
    }

    #[test]
    fn unknown_extension_is_sampled_then_cached() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();
        assert_eq!(classifier.cached_class(".foo"), None);

        let path_bin = write_bytes(tmp.path(), "one.foo", b"AAA\0\0\0BBB");
        assert_eq!(classifier.classify(&path_bin).unwrap(), EnumFileClass::Binary);
        assert_eq!(classifier.cached_class(".foo"), Some(EnumFileClass::Binary));

        // Cache precedence: same extension, text content, cached verdict.
        let path_txt = write_bytes(tmp.path(), "two.FOO", b"printable ascii only");
        assert_eq!(classifier.classify(&path_txt).unwrap(), EnumFileClass::Binary);
    }

    #[test]
    fn unknown_extension_printable_is_text() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();
        let path = write_bytes(tmp.path(), "notes.foo", b"Hello, world!\n");
        assert_eq!(classifier.classify(&path).unwrap(), EnumFileClass::Text);
        assert_eq!(classifier.cached_class(".foo"), Some(EnumFileClass::Text));
    }

    #[test]
    fn zero_byte_file_is_text() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();
        let path = write_bytes(tmp.path(), "empty.foo", b"");
        assert_eq!(classifier.classify(&path).unwrap(), EnumFileClass::Text);
    }

    #[test]
    fn file_without_extension_is_always_sampled() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();
        let n_cache_len = classifier.snapshot_cache().len();

        let path_bin = write_bytes(tmp.path(), "blob", b"\0\0\0");
        let path_txt = write_bytes(tmp.path(), "README", b"readme");
        assert_eq!(classifier.classify(&path_bin).unwrap(), EnumFileClass::Binary);
        assert_eq!(classifier.classify(&path_txt).unwrap(), EnumFileClass::Text);
        assert_eq!(classifier.snapshot_cache().len(), n_cache_len);
    }

    #[test]
    fn missing_path_and_directory_are_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();

        let err = classifier
            .classify(tmp.path().join("missing.txt"))
            .expect_err("missing file");
        assert!(matches!(err, ClassifyError::NotFound(_)));

        let err = classifier.classify(tmp.path()).expect_err("directory");
        assert!(matches!(err, ClassifyError::NotFound(_)));
    }

    #[test]
    fn sample_size_bounds_the_nul_search() {
        let tmp = TempDir::new().expect("tempdir");
        let mut raw = vec![b'a'; 64];
        raw.extend_from_slice(&[0, 0, 0]);
        let path = write_bytes(tmp.path(), "late_nul", &raw);

        let classifier = Classifier::new();
        assert_eq!(
            classifier.classify_with_sample_size(&path, 64).unwrap(),
            EnumFileClass::Text
        );
        assert_eq!(
            classifier.classify_with_sample_size(&path, 67).unwrap(),
            EnumFileClass::Binary
        );
        assert_eq!(
            classifier.classify_with_sample_size(&path, 0).unwrap(),
            EnumFileClass::Text
        );

        let classifier = Classifier::new().with_sample_size(16);
        assert_eq!(classifier.sample_size(), 16);
        assert_eq!(classifier.classify(&path).unwrap(), EnumFileClass::Text);
    }

    #[test]
    fn nul_run_rule_is_exactly_three() {
        assert_eq!(classify_sample(b""), EnumFileClass::Text);
        assert_eq!(classify_sample(b"a\0b\0\0c"), EnumFileClass::Text);
        assert_eq!(classify_sample(b"a\0\0\0"), EnumFileClass::Binary);
        assert_eq!(classify_sample(b"\xC3\x28 no nul"), EnumFileClass::Text);
        assert_eq!(classify_sample(b"\xE2\0\0\0"), EnumFileClass::Binary);
    }

    #[test]
    fn byte_order_marks_select_the_decoder() {
        // "AB" as UTF-32LE: raw bytes hold NUL runs, decoded chars do not.
        let raw_utf32_le = b"\xFF\xFE\0\0A\0\0\0B\0\0\0";
        assert_eq!(decode_sample(raw_utf32_le), "AB");
        assert_eq!(classify_sample(raw_utf32_le), EnumFileClass::Text);
        assert_eq!(classify_sample(&raw_utf32_le[4..]), EnumFileClass::Binary);

        let raw_utf32_be = b"\0\0\xFE\xFF\0\0\0A";
        assert_eq!(decode_sample(raw_utf32_be), "A");

        let raw_utf16_le = b"\xFF\xFEH\0i\0";
        assert_eq!(decode_sample(raw_utf16_le), "Hi");
        let raw_utf16_be = b"\xFE\xFF\0H\0i";
        assert_eq!(decode_sample(raw_utf16_be), "Hi");

        // Three NUL code units after a UTF-16 BOM are three NUL chars.
        let raw_utf16_nul = b"\xFE\xFF\0\0\0\0\0\0";
        assert_eq!(classify_sample(raw_utf16_nul), EnumFileClass::Binary);

        assert_eq!(decode_sample(b"\xEF\xBB\xBFok"), "ok");
    }

    #[test]
    fn cache_record_keeps_partitions_disjoint() {
        let mut cache = SpecExtensionCache::empty();
        assert!(cache.is_empty());

        assert!(cache.record(".Dat", EnumFileClass::Text));
        assert_eq!(cache.lookup(".dat"), Some(EnumFileClass::Text));
        assert!(!cache.record(".dat", EnumFileClass::Text));

        assert!(cache.record(".dat", EnumFileClass::Binary));
        assert_eq!(cache.lookup(".DAT"), Some(EnumFileClass::Binary));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn builtin_seed_matches_tables() {
        let cache = SpecExtensionCache::default();
        assert_eq!(cache.lookup(".xsl"), Some(EnumFileClass::Text));
        assert_eq!(cache.lookup(".war"), Some(EnumFileClass::Binary));
        assert_eq!(cache.lookup(".foo"), None);
        assert_eq!(cache.len(), 22 + 17);
    }

    #[test]
    fn classifier_is_shareable_across_threads() {
        let tmp = TempDir::new().expect("tempdir");
        let classifier = Classifier::new();
        let l_paths: Vec<_> = (0..8)
            .map(|i| write_bytes(tmp.path(), &format!("f{i}.bar"), b"text"))
            .collect();

        std::thread::scope(|scope| {
            for path in &l_paths {
                let classifier = &classifier;
                scope.spawn(move || {
                    assert_eq!(classifier.classify(path).unwrap(), EnumFileClass::Text);
                });
            }
        });
        assert_eq!(classifier.cached_class(".bar"), Some(EnumFileClass::Text));
    }
}
