use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 版本比較運算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "===")]
    Arbitrary,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "==")]
    Exact,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<")]
    Below,
    #[serde(rename = ">")]
    Above,
}

impl Operator {
    /// Longest tokens first so `===` wins over `==`.
    pub const ALL: [Operator; 8] = [
        Operator::Arbitrary,
        Operator::Compatible,
        Operator::Exact,
        Operator::NotEqual,
        Operator::AtMost,
        Operator::AtLeast,
        Operator::Below,
        Operator::Above,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Arbitrary => "===",
            Operator::Compatible => "~=",
            Operator::Exact => "==",
            Operator::NotEqual => "!=",
            Operator::AtMost => "<=",
            Operator::AtLeast => ">=",
            Operator::Below => "<",
            Operator::Above => ">",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    pub op: Operator,
    pub version: String,
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    Exact,
    Minimum,
    Unconstrained,
    Other,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintKind::Exact => "exact",
            ConstraintKind::Minimum => "minimum",
            ConstraintKind::Unconstrained => "unconstrained",
            ConstraintKind::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub line: usize,
    pub name: String,
    pub normalized: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub extras: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub specifiers: Vec<VersionSpec>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub marker: Option<String>,
    /// pip per-requirement options such as `--hash=sha256:...`; kept but not checked.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inline_comment: Option<String>,
}

impl Requirement {
    pub fn constraint_kind(&self) -> ConstraintKind {
        match self.specifiers.as_slice() {
            [] => ConstraintKind::Unconstrained,
            [only] if only.op == Operator::Exact => ConstraintKind::Exact,
            [only] if only.op == Operator::AtLeast => ConstraintKind::Minimum,
            _ => ConstraintKind::Other,
        }
    }

    /// `==` 或 `>=` 單一條件時的版本字串
    pub fn constraint_version(&self) -> Option<&str> {
        match self.constraint_kind() {
            ConstraintKind::Exact | ConstraintKind::Minimum => {
                self.specifiers.first().map(|s| s.version.as_str())
            }
            _ => None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        !self.specifiers.is_empty() || self.url.is_some()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {}", url)?;
        } else {
            let specs: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
            f.write_str(&specs.join(","))?;
        }
        if let Some(marker) = &self.marker {
            // URL 後面必須有空白，否則 `;` 會被當成 URL 的一部分
            if self.url.is_some() {
                write!(f, " ; {}", marker)?;
            } else {
                write!(f, "; {}", marker)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LineKind {
    Blank,
    Comment { text: String },
    Disabled { requirement: Requirement },
    Directive { flag: String, value: String },
    Requirement { requirement: Requirement },
    Malformed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLine {
    pub number: usize,
    pub raw: String,
    #[serde(flatten)]
    pub kind: LineKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub lines: Vec<ManifestLine>,
}

impl Manifest {
    /// 有效（未被註解掉）的需求，依檔案順序
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.lines.iter().filter_map(|l| match &l.kind {
            LineKind::Requirement { requirement } => Some(requirement),
            _ => None,
        })
    }

    pub fn disabled(&self) -> impl Iterator<Item = &Requirement> {
        self.lines.iter().filter_map(|l| match &l.kind {
            LineKind::Disabled { requirement } => Some(requirement),
            _ => None,
        })
    }

    pub fn declared_names(&self) -> Vec<String> {
        self.requirements().map(|r| r.name.clone()).collect()
    }

    pub fn malformed(&self) -> impl Iterator<Item = (&ManifestLine, &str)> {
        self.lines.iter().filter_map(|l| match &l.kind {
            LineKind::Malformed { reason } => Some((l, reason.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "warning" | "warn" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    MalformedLine,
    StdlibModule,
    DuplicatePackage,
    UnsupportedDirective,
    DisabledRequirement,
    Unpinned,
    UndeclaredImport,
    UnusedRequirement,
    IndexUnresolved,
}

impl Rule {
    pub const ALL: [Rule; 9] = [
        Rule::MalformedLine,
        Rule::StdlibModule,
        Rule::DuplicatePackage,
        Rule::UnsupportedDirective,
        Rule::DisabledRequirement,
        Rule::Unpinned,
        Rule::UndeclaredImport,
        Rule::UnusedRequirement,
        Rule::IndexUnresolved,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Rule::MalformedLine => "malformed-line",
            Rule::StdlibModule => "stdlib-module",
            Rule::DuplicatePackage => "duplicate-package",
            Rule::UnsupportedDirective => "unsupported-directive",
            Rule::DisabledRequirement => "disabled-requirement",
            Rule::Unpinned => "unpinned",
            Rule::UndeclaredImport => "undeclared-import",
            Rule::UnusedRequirement => "unused-requirement",
            Rule::IndexUnresolved => "index-unresolved",
        }
    }

    /// Accepts both `stdlib-module` and `stdlib_module`.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().replace('_', "-");
        Rule::ALL.into_iter().find(|r| r.code() == code)
    }

    pub fn default_level(&self) -> Option<Severity> {
        match self {
            Rule::MalformedLine | Rule::IndexUnresolved => Some(Severity::Error),
            Rule::StdlibModule
            | Rule::DuplicatePackage
            | Rule::UnsupportedDirective
            | Rule::UndeclaredImport => Some(Severity::Warning),
            Rule::DisabledRequirement | Rule::UnusedRequirement => Some(Severity::Info),
            Rule::Unpinned => None,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: Rule,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub package: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub lines: usize,
    pub requirements: usize,
    pub disabled: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub manifest_path: String,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub declared: Vec<String>,
    pub install_set: Vec<String>,
    pub stdlib_overlap: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AuditReport {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    /// 第三方套件與標準庫名稱必須互斥，且不得有錯誤
    pub fn is_conformant(&self) -> bool {
        self.stdlib_overlap.is_empty() && self.summary.errors == 0
    }

    pub fn fails_at(&self, threshold: Severity) -> bool {
        self.highest_severity().is_some_and(|s| s >= threshold)
    }
}
