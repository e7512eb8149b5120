use req_audit::{
    parse_manifest, Checker, ConstraintKind, LineKind, Rule, Severity, StdlibCatalog,
};

const FIXTURE: &str = include_str!("fixtures/requirements.txt");

const STDLIB_ENTRIES: [&str; 11] = [
    "sqlite3",
    "asyncio",
    "logging",
    "datetime",
    "urllib.parse",
    "hashlib",
    "json",
    "os",
    "re",
    "csv",
    "pathlib",
];

/// 每一個非註解、非空白行都必須是合法的需求
#[test]
fn test_every_active_line_is_well_formed() {
    let manifest = parse_manifest(FIXTURE);

    assert_eq!(manifest.malformed().count(), 0);
    for line in &manifest.lines {
        let trimmed = line.raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        assert!(
            matches!(line.kind, LineKind::Requirement { .. }),
            "line {} should parse as a requirement: {:?}",
            line.number,
            line.kind
        );
    }
}

#[test]
fn test_third_party_constraints() {
    let manifest = parse_manifest(FIXTURE);
    let requirements: Vec<_> = manifest.requirements().collect();

    let telegram = requirements[0];
    assert_eq!(telegram.name, "python-telegram-bot");
    assert_eq!(telegram.constraint_kind(), ConstraintKind::Exact);
    assert_eq!(telegram.constraint_version(), Some("20.7"));

    let typing = requirements[1];
    assert_eq!(typing.name, "typing-extensions");
    assert_eq!(typing.constraint_kind(), ConstraintKind::Minimum);
    assert_eq!(typing.constraint_version(), Some("4.0.0"));
}

#[test]
fn test_reparse_yields_identical_names() {
    let first = parse_manifest(FIXTURE).declared_names();
    let second = parse_manifest(FIXTURE).declared_names();

    assert_eq!(first, second);
    assert_eq!(first.len(), 13);
    assert_eq!(first[0], "python-telegram-bot");
    assert_eq!(first[12], "pathlib");
}

#[test]
fn test_commented_out_dependencies_are_not_installed() {
    let manifest = parse_manifest(FIXTURE);
    let catalog = StdlibCatalog::default();

    let disabled: Vec<&str> = manifest.disabled().map(|r| r.name.as_str()).collect();
    assert_eq!(
        disabled,
        vec!["psutil", "aiofiles", "pytest", "black", "flake8", "gunicorn", "supervisor"]
    );

    for keep_stdlib in [false, true] {
        let installed: Vec<&str> = manifest
            .install_set(&catalog, keep_stdlib)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        for name in &disabled {
            assert!(!installed.contains(name), "{} must not be installed", name);
        }
    }

    let installed: Vec<String> = manifest
        .install_set(&catalog, false)
        .iter()
        .map(|r| r.to_string())
        .collect();
    assert_eq!(
        installed,
        vec!["python-telegram-bot==20.7", "typing-extensions>=4.0.0"]
    );
}

#[test]
fn test_stdlib_and_third_party_sets_overlap_is_flagged() {
    let manifest = parse_manifest(FIXTURE);
    let catalog = StdlibCatalog::default();

    let mut overlap = manifest.stdlib_overlap(&catalog);
    overlap.sort();
    let mut expected: Vec<String> = STDLIB_ENTRIES.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(overlap, expected);

    let diagnostics = Checker::default().check(&manifest);
    let stdlib_hits: Vec<&str> = diagnostics
        .iter()
        .filter(|d| d.rule == Rule::StdlibModule)
        .filter_map(|d| d.package.as_deref())
        .collect();
    assert_eq!(stdlib_hits, STDLIB_ENTRIES.to_vec());
    assert!(diagnostics
        .iter()
        .filter(|d| d.rule == Rule::StdlibModule)
        .all(|d| d.severity == Severity::Warning));

    let disabled_notes = diagnostics
        .iter()
        .filter(|d| d.rule == Rule::DisabledRequirement)
        .count();
    assert_eq!(disabled_notes, 7);
    assert!(diagnostics.iter().all(|d| d.severity != Severity::Error));
}

#[test]
fn test_sqlite3_line_warning() {
    let manifest = parse_manifest("sqlite3  # Usually included with Python\n");
    let diagnostics = Checker::default().check(&manifest);

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule, Rule::StdlibModule);
    assert!(diagnostics[0].message.contains("standard-library"));
}
