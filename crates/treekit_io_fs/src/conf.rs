//! Classifier constants and built-in extension seed tables.

/// Default number of leading bytes read when sampling file content.
pub const N_SAMPLE_SIZE_BYTES_DEFAULT: usize = 10_240;
/// Length of the NUL run that marks a sample as binary.
pub const N_NUL_RUN_BINARY: usize = 3;

/// Extensions known to hold text content.
pub const TUP_EXTS_TEXT_BUILTIN: [&str; 22] = [
    ".bat",
    ".classpath",
    ".conf",
    ".css",
    ".cvsignore",
    ".dtd",
    ".html",
    ".java",
    ".js",
    ".jsp",
    ".jspf",
    ".log",
    ".properties",
    ".sh",
    ".sql",
    ".tld",
    ".txt",
    ".wsdd",
    ".wsdl",
    ".xml",
    ".xsd",
    ".xsl",
];

/// Extensions known to hold binary content.
pub const TUP_EXTS_BINARY_BUILTIN: [&str; 17] = [
    ".class", ".doc", ".exe", ".gif", ".gz", ".jar", ".jpg", ".mdb", ".pdf", ".rar", ".sar",
    ".swf", ".swp", ".vsd", ".war", ".xls", ".zip",
];
