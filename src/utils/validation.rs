use crate::utils::error::{AuditError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_index_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AuditError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match url::Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AuditError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AuditError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AuditError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AuditError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AuditError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// 檢查字串是否屬於允許的選項（不分大小寫）
pub fn validate_choice(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim())) {
        return Ok(());
    }
    Err(AuditError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: format!("Allowed values: {}", allowed.join(", ")),
    })
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| AuditError::MissingConfigError {
        field: field_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_index_url() {
        assert!(validate_index_url("index.url", "https://pypi.org").is_ok());
        assert!(validate_index_url("index.url", "http://localhost:8080").is_ok());
        assert!(validate_index_url("index.url", "").is_err());
        assert!(validate_index_url("index.url", "pypi.org").is_err());
        assert!(validate_index_url("index.url", "ftp://pypi.org").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("index.concurrent_requests", 4, 1, 64).is_ok());
        assert!(validate_range("index.concurrent_requests", 0, 1, 64).is_err());
    }

    #[test]
    fn test_validate_choice() {
        assert!(validate_choice("report.formats", "JSON", &["text", "json", "csv"]).is_ok());
        assert!(validate_choice("report.formats", "xml", &["text", "json", "csv"]).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let missing: Option<String> = None;
        assert!(validate_required_field("manifest.path", &missing).is_err());
        let present = Some("requirements.txt".to_string());
        assert_eq!(
            validate_required_field("manifest.path", &present).unwrap(),
            "requirements.txt"
        );
    }
}
