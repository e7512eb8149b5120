use crate::domain::model::{Manifest, Requirement};
use std::collections::{BTreeSet, HashSet};

/// Top-level modules shipped with CPython 3 (`sys.stdlib_module_names`).
const STDLIB_MODULES: &[&str] = &[
    "__future__", "_thread", "abc", "aifc", "argparse", "array", "ast", "asynchat",
    "asyncio", "asyncore", "atexit", "audioop", "base64", "bdb", "binascii", "bisect",
    "builtins", "bz2", "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code",
    "codecs", "codeop", "collections", "colorsys", "compileall", "concurrent",
    "configparser", "contextlib", "contextvars", "copy", "copyreg", "cprofile", "crypt",
    "csv", "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal", "difflib",
    "dis", "distutils", "doctest", "email", "encodings", "ensurepip", "enum", "errno",
    "faulthandler", "fcntl", "filecmp", "fileinput", "fnmatch", "fractions", "ftplib",
    "functools", "gc", "getopt", "getpass", "gettext", "glob", "graphlib", "grp", "gzip",
    "hashlib", "heapq", "hmac", "html", "http", "idlelib", "imaplib", "imghdr", "imp",
    "importlib", "inspect", "io", "ipaddress", "itertools", "json", "keyword", "lib2to3",
    "linecache", "locale", "logging", "lzma", "mailbox", "mailcap", "marshal", "math",
    "mimetypes", "mmap", "modulefinder", "msilib", "msvcrt", "multiprocessing", "netrc",
    "nis", "nntplib", "ntpath", "numbers", "opcode", "operator", "optparse", "os",
    "ossaudiodev", "pathlib", "pdb", "pickle", "pickletools", "pipes", "pkgutil",
    "platform", "plistlib", "poplib", "posix", "posixpath", "pprint", "profile", "pstats",
    "pty", "pwd", "py_compile", "pyclbr", "pydoc", "queue", "quopri", "random", "re",
    "readline", "reprlib", "resource", "rlcompleter", "runpy", "sched", "secrets",
    "select", "selectors", "shelve", "shlex", "shutil", "signal", "site", "smtpd",
    "smtplib", "sndhdr", "socket", "socketserver", "spwd", "sqlite3", "sre_compile",
    "sre_constants", "sre_parse", "ssl", "stat", "statistics", "string", "stringprep",
    "struct", "subprocess", "sunau", "symtable", "sys", "sysconfig", "syslog", "tabnanny",
    "tarfile", "telnetlib", "tempfile", "termios", "textwrap", "threading", "time",
    "timeit", "tkinter", "token", "tokenize", "tomllib", "trace", "traceback",
    "tracemalloc", "tty", "turtle", "turtledemo", "types", "typing", "unicodedata",
    "unittest", "urllib", "uu", "uuid", "venv", "warnings", "wave", "weakref",
    "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml", "xmlrpc", "zipapp",
    "zipfile", "zipimport", "zlib", "zoneinfo",
];

#[derive(Debug, Clone)]
pub struct StdlibCatalog {
    modules: HashSet<String>,
}

impl Default for StdlibCatalog {
    fn default() -> Self {
        Self {
            modules: STDLIB_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl StdlibCatalog {
    /// 加入額外模組並移除允許清單中的名稱
    pub fn with_overrides(extra: &[String], allow: &[String]) -> Self {
        let mut catalog = Self::default();
        for module in extra {
            catalog.modules.insert(module_key(module));
        }
        for module in allow {
            catalog.modules.remove(&module_key(module));
        }
        catalog
    }

    /// Matches on the first dotted segment, so `urllib.parse` hits `urllib`.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains(&module_key(name))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn module_key(name: &str) -> String {
    let top = name.trim().split('.').next().unwrap_or_default();
    top.to_lowercase().replace('-', "_")
}

impl Manifest {
    /// Active requirements worth handing to an installer: first declaration
    /// per normalized name, commented-out entries never, stdlib names only
    /// when `keep_stdlib` is set.
    pub fn install_set(&self, catalog: &StdlibCatalog, keep_stdlib: bool) -> Vec<&Requirement> {
        let mut seen = HashSet::new();
        self.requirements()
            .filter(|r| keep_stdlib || !catalog.contains(&r.name))
            .filter(|r| seen.insert(r.normalized.clone()))
            .collect()
    }

    /// 同時出現在宣告清單與標準庫中的名稱
    pub fn stdlib_overlap(&self, catalog: &StdlibCatalog) -> Vec<String> {
        let overlap: BTreeSet<&str> = self
            .requirements()
            .filter(|r| catalog.contains(&r.name))
            .map(|r| r.name.as_str())
            .collect();
        overlap.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_manifest;

    #[test]
    fn test_stdlib_lookup() {
        let catalog = StdlibCatalog::default();
        for name in ["sqlite3", "asyncio", "urllib.parse", "pathlib", "typing", "JSON"] {
            assert!(catalog.contains(name), "{} should be stdlib", name);
        }
        for name in ["python-telegram-bot", "typing-extensions", "psutil", "aiofiles"] {
            assert!(!catalog.contains(name), "{} should not be stdlib", name);
        }
    }

    #[test]
    fn test_overrides() {
        let catalog = StdlibCatalog::with_overrides(
            &["tomli".to_string()],
            &["dataclasses".to_string()],
        );
        assert!(catalog.contains("tomli"));
        assert!(!catalog.contains("dataclasses"));
        assert!(catalog.len() > 100);
    }

    #[test]
    fn test_install_set_excludes_stdlib_disabled_and_duplicates() {
        let manifest = parse_manifest(
            "python-telegram-bot==20.7\nsqlite3\n# psutil>=5.9.0\nPython_Telegram_Bot>=20\ntyping-extensions>=4.0.0\n",
        );
        let catalog = StdlibCatalog::default();

        let names: Vec<&str> = manifest
            .install_set(&catalog, false)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["python-telegram-bot", "typing-extensions"]);

        let with_stdlib = manifest.install_set(&catalog, true);
        assert_eq!(with_stdlib.len(), 3);
        assert_eq!(manifest.stdlib_overlap(&catalog), vec!["sqlite3"]);
    }
}
