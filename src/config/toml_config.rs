use crate::core::report::ReportFormat;
use crate::domain::model::{Rule, Severity};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "req-audit.toml";
pub const DEFAULT_MANIFEST: &str = "requirements.txt";
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub manifest: ManifestConfig,
    /// 規則代碼 -> `off` / `info` / `warning` / `error`
    pub rules: HashMap<String, String>,
    pub stdlib: StdlibConfig,
    pub imports: ImportsConfig,
    pub index: IndexConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub path: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_MANIFEST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StdlibConfig {
    pub extra_modules: Vec<String>,
    pub allow: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    pub source_dir: Option<String>,
    /// 發行名稱 -> import 名稱
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub timeout_seconds: u64,
    pub concurrent_requests: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: Some(DEFAULT_INDEX_URL.to_string()),
            timeout_seconds: 10,
            concurrent_requests: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: Option<String>,
    pub formats: Vec<String>,
    pub fail_on: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            formats: vec!["text".to_string()],
            fail_on: "error".to_string(),
        }
    }
}

impl AuditConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AuditError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AuditError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Explicit paths must exist; otherwise `req-audit.toml` is used when
    /// present and built-in defaults when not.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                tracing::info!("📁 Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// 替換環境變數 (例如 ${INDEX_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env pattern"));

        ENV_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn report_formats(&self) -> Result<Vec<ReportFormat>> {
        self.report
            .formats
            .iter()
            .map(|f| ReportFormat::parse(f))
            .collect()
    }

    pub fn fail_on(&self) -> Result<Severity> {
        Severity::parse(&self.report.fail_on).ok_or_else(|| AuditError::InvalidConfigValueError {
            field: "report.fail_on".to_string(),
            value: self.report.fail_on.clone(),
            reason: "Allowed values: info, warning, error".to_string(),
        })
    }

    fn rule_override(&self, rule: Rule) -> Option<&str> {
        self.rules
            .iter()
            .find(|(code, _)| Rule::from_code(code) == Some(rule))
            .map(|(_, level)| level.as_str())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("manifest.path", &self.manifest.path)?;

        for (code, level) in &self.rules {
            if Rule::from_code(code).is_none() {
                let known: Vec<&str> = Rule::ALL.iter().map(|r| r.code()).collect();
                return Err(AuditError::InvalidConfigValueError {
                    field: format!("rules.{}", code),
                    value: code.clone(),
                    reason: format!("Unknown rule. Known rules: {}", known.join(", ")),
                });
            }
            validation::validate_choice(
                &format!("rules.{}", code),
                level,
                &["off", "info", "warning", "error"],
            )?;
        }

        if let Some(dir) = &self.imports.source_dir {
            validation::validate_path("imports.source_dir", dir)?;
        }

        if self.index.enabled {
            let url = validation::validate_required_field("index.url", &self.index.url)?;
            validation::validate_index_url("index.url", url)?;
        }
        validation::validate_range("index.timeout_seconds", self.index.timeout_seconds, 1, 300)?;
        validation::validate_range(
            "index.concurrent_requests",
            self.index.concurrent_requests,
            1,
            64,
        )?;

        if let Some(output) = &self.report.output_path {
            validation::validate_path("report.output_path", output)?;
        }
        for format in &self.report.formats {
            validation::validate_choice("report.formats", format, &ReportFormat::NAMES)?;
        }
        self.fail_on()?;

        Ok(())
    }
}

impl ConfigProvider for AuditConfig {
    fn manifest_path(&self) -> &str {
        &self.manifest.path
    }

    fn output_path(&self) -> Option<&str> {
        self.report.output_path.as_deref()
    }

    fn output_formats(&self) -> &[String] {
        &self.report.formats
    }

    fn rule_level(&self, rule: Rule) -> Option<Severity> {
        match self.rule_override(rule) {
            Some(level) if level.trim().eq_ignore_ascii_case("off") => None,
            Some(level) => Severity::parse(level).or_else(|| rule.default_level()),
            None => rule.default_level(),
        }
    }

    fn extra_stdlib_modules(&self) -> &[String] {
        &self.stdlib.extra_modules
    }

    fn allowed_stdlib_modules(&self) -> &[String] {
        &self.stdlib.allow
    }

    fn source_dir(&self) -> Option<&str> {
        self.imports.source_dir.as_deref()
    }

    fn import_aliases(&self) -> &HashMap<String, String> {
        &self.imports.aliases
    }

    fn index_url(&self) -> Option<&str> {
        if self.index.enabled {
            self.index.url.as_deref()
        } else {
            None
        }
    }

    fn index_timeout_seconds(&self) -> u64 {
        self.index.timeout_seconds
    }

    fn concurrent_requests(&self) -> usize {
        self.index.concurrent_requests
    }
}

impl Validate for AuditConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let config = AuditConfig::from_toml_str("").unwrap();
        assert_eq!(config.manifest_path(), "requirements.txt");
        assert_eq!(config.output_formats(), &["text".to_string()]);
        assert_eq!(config.index_url(), None);
        assert_eq!(config.rule_level(Rule::Unpinned), None);
        assert_eq!(config.rule_level(Rule::StdlibModule), Some(Severity::Warning));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[manifest]
path = "bot/requirements.txt"

[rules]
stdlib_module = "error"
unpinned = "warning"
disabled-requirement = "off"

[stdlib]
extra_modules = ["tomli"]
allow = ["dataclasses"]

[imports]
source_dir = "bot"
aliases = { "my-dist" = "mymod" }

[index]
enabled = true
url = "https://mirror.example.com"
concurrent_requests = 4

[report]
output_path = "./audit"
formats = ["text", "json", "csv"]
fail_on = "warning"
"#;

        let config = AuditConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.manifest_path(), "bot/requirements.txt");
        assert_eq!(config.rule_level(Rule::StdlibModule), Some(Severity::Error));
        assert_eq!(config.rule_level(Rule::Unpinned), Some(Severity::Warning));
        assert_eq!(config.rule_level(Rule::DisabledRequirement), None);
        assert_eq!(config.index_url(), Some("https://mirror.example.com"));
        assert_eq!(config.concurrent_requests(), 4);
        assert_eq!(config.import_aliases().get("my-dist").map(String::as_str), Some("mymod"));
        assert_eq!(config.report_formats().unwrap().len(), 3);
        assert_eq!(config.fail_on().unwrap(), Severity::Warning);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REQ_AUDIT_TEST_INDEX", "https://index.internal");

        let toml_content = r#"
[index]
enabled = true
url = "${REQ_AUDIT_TEST_INDEX}"
"#;

        let config = AuditConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.index_url(), Some("https://index.internal"));

        std::env::remove_var("REQ_AUDIT_TEST_INDEX");
    }

    #[test]
    fn test_config_validation() {
        let unknown_rule = AuditConfig::from_toml_str("[rules]\nno_such_rule = \"error\"\n").unwrap();
        assert!(unknown_rule.validate().is_err());

        let bad_level = AuditConfig::from_toml_str("[rules]\nunpinned = \"loud\"\n").unwrap();
        assert!(bad_level.validate().is_err());

        let bad_format = AuditConfig::from_toml_str("[report]\nformats = [\"xml\"]\n").unwrap();
        assert!(bad_format.validate().is_err());

        let bad_url =
            AuditConfig::from_toml_str("[index]\nenabled = true\nurl = \"pypi.org\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let zero_workers =
            AuditConfig::from_toml_str("[index]\nconcurrent_requests = 0\n").unwrap();
        assert!(zero_workers.validate().is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config =
            AuditConfig::from_toml_str(include_str!("../../req-audit.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.index.url.as_deref(), Some("https://pypi.org"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AuditConfig::from_toml_str("[manifest\npath = 1").unwrap_err();
        assert!(matches!(err, AuditError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[manifest]\npath = \"deps.txt\"\n")
            .unwrap();

        let config = AuditConfig::load(temp_file.path().to_str()).unwrap();
        assert_eq!(config.manifest_path(), "deps.txt");
    }
}
