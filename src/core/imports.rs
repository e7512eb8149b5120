use crate::core::checker::RuleSet;
use crate::core::parser::normalize_name;
use crate::core::stdlib::StdlibCatalog;
use crate::domain::model::{Diagnostic, Manifest, Rule};
use crate::utils::error::Result;
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+([A-Za-z_][\w.]*(?:\s+as\s+\w+)?(?:\s*,\s*[A-Za-z_][\w.]*(?:\s+as\s+\w+)?)*)")
        .expect("valid import pattern")
});

static FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+([A-Za-z_][\w.]*)\s+import\b").expect("valid from-import pattern")
});

/// 套件發行名稱與 import 名稱不同的常見對照
const KNOWN_ALIASES: &[(&str, &str)] = &[
    ("python-telegram-bot", "telegram"),
    ("typing-extensions", "typing_extensions"),
    ("pyyaml", "yaml"),
    ("pillow", "PIL"),
    ("beautifulsoup4", "bs4"),
    ("scikit-learn", "sklearn"),
    ("opencv-python", "cv2"),
    ("python-dateutil", "dateutil"),
    ("python-dotenv", "dotenv"),
    ("psycopg2-binary", "psycopg2"),
    ("attrs", "attr"),
    ("protobuf", "google"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSite {
    pub file: PathBuf,
    pub line: usize,
}

/// Top-level imported module name mapped to every place it is imported.
#[derive(Debug, Clone, Default)]
pub struct ImportIndex {
    pub modules: BTreeMap<String, Vec<ImportSite>>,
    pub local_modules: HashSet<String>,
    pub files_scanned: usize,
}

pub struct ImportScanner {
    root: PathBuf,
}

impl ImportScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn scan(&self) -> Result<ImportIndex> {
        let mut index = ImportIndex::default();

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Error walking directory: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            // 專案內的套件目錄（含 __init__.py）也算本地模組
            if path.file_name().and_then(|n| n.to_str()) == Some("__init__.py") {
                if let Some(pkg) = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                {
                    index.local_modules.insert(pkg.to_string());
                }
            }

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                index.local_modules.insert(stem.to_string());
            }

            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            // 舊檔案可能是 latin-1 之類的編碼，import 敘述本身是 ASCII
            let content = String::from_utf8_lossy(&bytes);
            for (module, line) in extract_imports(&content) {
                index.modules.entry(module).or_default().push(ImportSite {
                    file: path.to_path_buf(),
                    line,
                });
            }
            index.files_scanned += 1;
        }

        tracing::debug!(
            "Scanned {} Python files, found {} imported modules",
            index.files_scanned,
            index.modules.len()
        );
        Ok(index)
    }
}

/// Returns `(top_level_module, line_number)` pairs. Relative imports are skipped.
pub fn extract_imports(source: &str) -> Vec<(String, usize)> {
    let mut found = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(caps) = FROM_RE.captures(line) {
            found.push((top_level(&caps[1]), line_no));
        } else if let Some(caps) = IMPORT_RE.captures(line) {
            for part in caps[1].split(',') {
                let module = part.split_whitespace().next().unwrap_or_default();
                if !module.is_empty() {
                    found.push((top_level(module), line_no));
                }
            }
        }
    }

    found
}

fn top_level(module: &str) -> String {
    module.split('.').next().unwrap_or(module).to_string()
}

/// 發行名稱 -> import 名稱；設定檔的 aliases 優先
pub fn import_name_for(distribution: &str, aliases: &HashMap<String, String>) -> String {
    let normalized = normalize_name(distribution);
    if let Some(alias) = aliases
        .iter()
        .find(|(dist, _)| normalize_name(dist) == normalized)
        .map(|(_, module)| module.clone())
    {
        return alias;
    }
    KNOWN_ALIASES
        .iter()
        .find(|(dist, _)| *dist == normalized)
        .map(|(_, module)| module.to_string())
        .unwrap_or_else(|| normalized.replace('-', "_"))
}

/// Compares what the sources import against what the manifest declares.
pub fn cross_reference(
    manifest: &Manifest,
    imports: &ImportIndex,
    catalog: &StdlibCatalog,
    aliases: &HashMap<String, String>,
    rules: &RuleSet,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let provided: HashMap<String, &str> = manifest
        .requirements()
        .filter(|r| !catalog.contains(&r.name))
        .map(|r| (import_name_for(&r.name, aliases).to_lowercase(), r.name.as_str()))
        .collect();

    for (module, sites) in &imports.modules {
        if catalog.contains(module) || imports.local_modules.contains(module) {
            continue;
        }
        if provided.contains_key(&module.to_lowercase()) {
            continue;
        }
        let first = &sites[0];
        diagnostics.extend(rules.diagnostic(
            Rule::UndeclaredImport,
            None,
            Some(module.as_str()),
            format!(
                "'{}' is imported at {}:{} but no requirement provides it",
                module,
                first.file.display(),
                first.line
            ),
        ));
    }

    let imported: HashSet<String> = imports.modules.keys().map(|m| m.to_lowercase()).collect();
    let mut reported: HashSet<&str> = HashSet::new();
    for requirement in manifest.requirements() {
        if catalog.contains(&requirement.name) {
            continue;
        }
        if !reported.insert(requirement.normalized.as_str()) {
            continue;
        }
        let module = import_name_for(&requirement.name, aliases);
        if !imported.contains(&module.to_lowercase()) {
            diagnostics.extend(rules.diagnostic(
                Rule::UnusedRequirement,
                Some(requirement.line),
                Some(requirement.name.as_str()),
                format!(
                    "'{}' is declared but '{}' is never imported",
                    requirement.name, module
                ),
            ));
        }
    }

    diagnostics
}
