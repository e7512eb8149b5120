use crate::domain::model::AuditReport;
use crate::utils::error::{AuditError, Result};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub const NAMES: [&'static str; 3] = ["text", "json", "csv"];

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(AuditError::InvalidConfigValueError {
                field: "report.formats".to_string(),
                value: other.to_string(),
                reason: format!("Allowed values: {}", Self::NAMES.join(", ")),
            }),
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Text => "audit_report.txt",
            ReportFormat::Json => "audit_report.json",
            ReportFormat::Csv => "audit_report.csv",
        }
    }

    pub fn render(&self, report: &AuditReport) -> Result<String> {
        match self {
            ReportFormat::Text => Ok(render_text(report)),
            ReportFormat::Json => render_json(report),
            ReportFormat::Csv => render_csv(report),
        }
    }
}

pub fn render_text(report: &AuditReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let _ = writeln!(out, "Manifest: {}", report.manifest_path);
    let _ = writeln!(out, "Generated: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(
        out,
        "Lines: {}  Requirements: {}  Disabled: {}",
        s.lines, s.requirements, s.disabled
    );
    let _ = writeln!(
        out,
        "Errors: {}  Warnings: {}  Info: {}",
        s.errors, s.warnings, s.infos
    );

    if !report.stdlib_overlap.is_empty() {
        let _ = writeln!(
            out,
            "Standard-library names declared as dependencies: {}",
            report.stdlib_overlap.join(", ")
        );
    }

    if report.diagnostics.is_empty() {
        let _ = writeln!(out, "\nNo issues found.");
    } else {
        let _ = writeln!(out);
        for d in &report.diagnostics {
            let location = d
                .line
                .map(|l| format!("line {}", l))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:>8} {:<8} [{}] {}",
                location,
                d.severity.to_string(),
                d.rule,
                d.message
            );
        }
    }

    let _ = writeln!(
        out,
        "\nConformant: {}",
        if report.is_conformant() { "yes" } else { "no" }
    );
    out
}

pub fn render_json(report: &AuditReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// 每個診斷一列
pub fn render_csv(report: &AuditReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["line", "severity", "rule", "package", "message"])?;
    for d in &report.diagnostics {
        writer.write_record([
            d.line.map(|l| l.to_string()).unwrap_or_default(),
            d.severity.to_string(),
            d.rule.to_string(),
            d.package.clone().unwrap_or_default(),
            d.message.clone(),
        ])?;
    }
    let data = writer.into_inner().map_err(|e| AuditError::ProcessingError {
        message: format!("Failed to flush CSV writer: {}", e),
    })?;
    String::from_utf8(data).map_err(|e| AuditError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Diagnostic, Rule, Severity, Summary};
    use chrono::Utc;

    fn sample_report() -> AuditReport {
        AuditReport {
            manifest_path: "requirements.txt".to_string(),
            generated_at: Utc::now(),
            summary: Summary {
                lines: 3,
                requirements: 2,
                disabled: 0,
                errors: 0,
                warnings: 1,
                infos: 0,
            },
            declared: vec!["python-telegram-bot".to_string(), "sqlite3".to_string()],
            install_set: vec!["python-telegram-bot==20.7".to_string()],
            stdlib_overlap: vec!["sqlite3".to_string()],
            diagnostics: vec![Diagnostic {
                rule: Rule::StdlibModule,
                severity: Severity::Warning,
                line: Some(2),
                package: Some("sqlite3".to_string()),
                message: "'sqlite3' is a standard-library module, \"not\" installable".to_string(),
            }],
        }
    }

    #[test]
    fn test_text_report() {
        let text = render_text(&sample_report());
        assert!(text.contains("Requirements: 2"));
        assert!(text.contains("[stdlib-module]"));
        assert!(text.contains("line 2"));
        assert!(text.contains("Conformant: no"));
    }

    #[test]
    fn test_json_report() {
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&sample_report()).unwrap()).unwrap();
        assert_eq!(json["diagnostics"][0]["rule"], "stdlib-module");
        assert_eq!(json["diagnostics"][0]["severity"], "warning");
        assert_eq!(json["stdlib_overlap"][0], "sqlite3");
    }

    #[test]
    fn test_csv_report_quotes_messages() {
        let csv = render_csv(&sample_report()).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "2");
        assert_eq!(&rows[0][2], "stdlib-module");
        assert!(rows[0][4].contains("\"not\""));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("JSON").unwrap(), ReportFormat::Json);
        assert!(ReportFormat::parse("xml").is_err());
    }
}
