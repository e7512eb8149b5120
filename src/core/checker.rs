use crate::core::stdlib::StdlibCatalog;
use crate::domain::model::{Diagnostic, LineKind, Manifest, Rule, Severity};
use crate::domain::ports::ConfigProvider;
use std::collections::HashMap;

/// 每條規則的啟用等級，`None` 代表關閉
#[derive(Debug, Clone)]
pub struct RuleSet {
    levels: HashMap<Rule, Option<Severity>>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            levels: Rule::ALL.into_iter().map(|r| (r, r.default_level())).collect(),
        }
    }
}

impl RuleSet {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            levels: Rule::ALL.into_iter().map(|r| (r, config.rule_level(r))).collect(),
        }
    }

    pub fn set(&mut self, rule: Rule, level: Option<Severity>) {
        self.levels.insert(rule, level);
    }

    pub fn level(&self, rule: Rule) -> Option<Severity> {
        self.levels.get(&rule).copied().unwrap_or_else(|| rule.default_level())
    }

    /// Builds a diagnostic at the configured level, or nothing if the rule is off.
    pub fn diagnostic(
        &self,
        rule: Rule,
        line: Option<usize>,
        package: Option<&str>,
        message: impl Into<String>,
    ) -> Option<Diagnostic> {
        self.level(rule).map(|severity| Diagnostic {
            rule,
            severity,
            line,
            package: package.map(str::to_string),
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Checker {
    rules: RuleSet,
    catalog: StdlibCatalog,
}

impl Checker {
    pub fn new(rules: RuleSet, catalog: StdlibCatalog) -> Self {
        Self { rules, catalog }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn catalog(&self) -> &StdlibCatalog {
        &self.catalog
    }

    pub fn check(&self, manifest: &Manifest) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for line in &manifest.lines {
            let found = match &line.kind {
                LineKind::Blank | LineKind::Comment { .. } => continue,
                LineKind::Malformed { reason } => self.rules.diagnostic(
                    Rule::MalformedLine,
                    Some(line.number),
                    None,
                    format!("cannot parse '{}': {}", line.raw.trim(), reason),
                ),
                LineKind::Directive { flag, .. } => self.rules.diagnostic(
                    Rule::UnsupportedDirective,
                    Some(line.number),
                    None,
                    format!("'{}' directive is not followed by the audit", flag),
                ),
                LineKind::Disabled { requirement } => self.rules.diagnostic(
                    Rule::DisabledRequirement,
                    Some(line.number),
                    Some(requirement.name.as_str()),
                    format!(
                        "'{}' is commented out and excluded from installation",
                        requirement
                    ),
                ),
                LineKind::Requirement { requirement } => {
                    if !requirement.options.is_empty() {
                        let mut flags: Vec<&str> = requirement
                            .options
                            .iter()
                            .filter_map(|o| o.split(['=', ' ']).next())
                            .collect();
                        flags.dedup();
                        diagnostics.extend(self.rules.diagnostic(
                            Rule::UnsupportedDirective,
                            Some(line.number),
                            Some(requirement.name.as_str()),
                            format!(
                                "'{}' carries {} options that the audit does not check",
                                requirement.name,
                                flags.join(", ")
                            ),
                        ));
                    }

                    if let Some(first) = first_seen.get(requirement.normalized.as_str()) {
                        diagnostics.extend(self.rules.diagnostic(
                            Rule::DuplicatePackage,
                            Some(line.number),
                            Some(requirement.name.as_str()),
                            format!("'{}' is already declared on line {}", requirement.name, first),
                        ));
                    } else {
                        first_seen.insert(requirement.normalized.as_str(), line.number);
                    }

                    if self.catalog.contains(&requirement.name) {
                        self.rules.diagnostic(
                            Rule::StdlibModule,
                            Some(line.number),
                            Some(requirement.name.as_str()),
                            format!(
                                "'{}' is a standard-library module, not an installable package",
                                requirement.name
                            ),
                        )
                    } else if !requirement.is_pinned() {
                        self.rules.diagnostic(
                            Rule::Unpinned,
                            Some(line.number),
                            Some(requirement.name.as_str()),
                            format!("'{}' has no version constraint", requirement.name),
                        )
                    } else {
                        None
                    }
                }
            };
            diagnostics.extend(found);
        }

        tracing::debug!("Checker produced {} diagnostics", diagnostics.len());
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_manifest;

    fn rules_of(diagnostics: &[Diagnostic]) -> Vec<Rule> {
        diagnostics.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn test_flags_stdlib_module() {
        let manifest = parse_manifest("sqlite3  # Usually included with Python\n");
        let diagnostics = Checker::default().check(&manifest);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, Rule::StdlibModule);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].line, Some(1));
        assert_eq!(diagnostics[0].package.as_deref(), Some("sqlite3"));
    }

    #[test]
    fn test_clean_manifest_has_no_warnings() {
        let manifest =
            parse_manifest("# Core\npython-telegram-bot==20.7\ntyping-extensions>=4.0.0\n");
        assert!(Checker::default().check(&manifest).is_empty());
    }

    #[test]
    fn test_duplicates_directives_disabled_and_malformed() {
        let manifest = parse_manifest(
            "requests==2.31.0\n-r dev.txt\n# pytest>=7.0\nRequests>=2\nflask=3\n",
        );
        let diagnostics = Checker::default().check(&manifest);
        assert_eq!(
            rules_of(&diagnostics),
            vec![
                Rule::UnsupportedDirective,
                Rule::DisabledRequirement,
                Rule::DuplicatePackage,
                Rule::MalformedLine,
            ]
        );
        assert_eq!(diagnostics[2].line, Some(4));
        assert!(diagnostics[2].message.contains("line 1"));
        assert_eq!(diagnostics[3].severity, Severity::Error);
    }

    #[test]
    fn test_hash_pinned_requirement_is_not_malformed() {
        let manifest = parse_manifest(
            "foo==1.0 \\\n    --hash=sha256:abc \\\n    --hash=sha256:def\nbar==2.0\n",
        );
        let diagnostics = Checker::default().check(&manifest);
        assert_eq!(rules_of(&diagnostics), vec![Rule::UnsupportedDirective]);
        assert_eq!(diagnostics[0].line, Some(1));
        assert_eq!(diagnostics[0].package.as_deref(), Some("foo"));
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0].message.contains("--hash options"));
        assert_eq!(manifest.declared_names(), vec!["foo", "bar"]);
    }

    #[test]
    fn test_rule_levels_can_be_overridden() {
        let mut rules = RuleSet::default();
        rules.set(Rule::Unpinned, Some(Severity::Info));
        rules.set(Rule::StdlibModule, Some(Severity::Error));
        rules.set(Rule::DisabledRequirement, None);
        let checker = Checker::new(rules, StdlibCatalog::default());

        let manifest = parse_manifest("aiohttp\nos\n# black>=23.0\n");
        let diagnostics = checker.check(&manifest);
        assert_eq!(rules_of(&diagnostics), vec![Rule::Unpinned, Rule::StdlibModule]);
        assert_eq!(diagnostics[1].severity, Severity::Error);
    }
}
