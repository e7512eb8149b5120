use crate::domain::model::{LineKind, Manifest, ManifestLine, Operator, Requirement, VersionSpec};
use regex::Regex;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?").expect("valid name pattern")
});

// pip 的逐行選項，例如 `--hash=sha256:...`
static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s--[A-Za-z]").expect("valid option pattern"));

static NORMALIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid normalize pattern"));

// PEP 440 public version with optional local segment
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^v?(?:\d+!)?\d+(?:\.\d+)*(?:[-_.]?(?:a|b|c|rc|alpha|beta|pre|preview)[-_.]?\d*)?(?:-\d+|[-_.]?(?:post|rev|r)[-_.]?\d*)?(?:[-_.]?dev[-_.]?\d*)?(?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?$",
    )
    .expect("valid version pattern")
});

/// PEP 503 正規化：小寫，連續的 `-` `_` `.` 合併成 `-`
pub fn normalize_name(name: &str) -> String {
    NORMALIZE_RE.replace_all(&name.to_lowercase(), "-").into_owned()
}

pub fn is_valid_version(version: &str) -> bool {
    VERSION_RE.is_match(version)
}

/// Parsing never fails; unreadable lines come back as `LineKind::Malformed`.
///
/// A line ending in `\` continues on the next one. The joined line keeps the
/// number of its first physical line.
pub fn parse_manifest(content: &str) -> Manifest {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in content.lines().enumerate() {
        let raw = raw.trim_end_matches('\r');
        let (number, mut logical) = pending.take().unwrap_or_else(|| (idx + 1, String::new()));
        // 註解行結尾的 `\` 不會接續下一行
        let is_comment = logical.is_empty() && raw.trim_start().starts_with('#');
        match raw.trim_end().strip_suffix('\\').filter(|_| !is_comment) {
            Some(head) => {
                logical.push_str(head);
                logical.push(' ');
                pending = Some((number, logical));
            }
            None => {
                logical.push_str(raw);
                lines.push(parse_line(number, &logical));
            }
        }
    }
    if let Some((number, logical)) = pending {
        lines.push(parse_line(number, logical.trim_end()));
    }

    Manifest { lines }
}

pub fn parse_line(number: usize, raw: &str) -> ManifestLine {
    let line = raw.trim_end_matches('\r');
    let trimmed = line.trim();

    let kind = if trimmed.is_empty() {
        LineKind::Blank
    } else if let Some(body) = trimmed.strip_prefix('#') {
        classify_comment(number, body.trim_start_matches('#').trim())
    } else if trimmed.starts_with('-') {
        let (directive, _) = split_inline_comment(trimmed);
        let (flag, value) = split_directive(directive);
        LineKind::Directive { flag, value }
    } else {
        let (text, comment) = split_inline_comment(trimmed);
        let (text, options) = split_requirement_options(text);
        match parse_requirement(text) {
            Ok(mut requirement) => {
                requirement.line = number;
                requirement.options = options;
                requirement.inline_comment = comment;
                LineKind::Requirement { requirement }
            }
            Err(reason) => LineKind::Malformed { reason },
        }
    };

    ManifestLine {
        number,
        raw: line.to_string(),
        kind,
    }
}

// 被註解掉的需求必須帶版本條件，否則一律視為一般註解
fn classify_comment(number: usize, body: &str) -> LineKind {
    let (text, comment) = split_inline_comment(body);
    if !text.is_empty() {
        if let Ok(mut requirement) = parse_requirement(text) {
            if !requirement.specifiers.is_empty() {
                requirement.line = number;
                requirement.inline_comment = comment;
                return LineKind::Disabled { requirement };
            }
        }
    }
    LineKind::Comment {
        text: body.to_string(),
    }
}

/// `#` starts a comment only at the start of the text or after whitespace.
fn split_inline_comment(text: &str) -> (&str, Option<String>) {
    let mut prev_is_space = true;
    for (idx, ch) in text.char_indices() {
        if ch == '#' && prev_is_space {
            let comment = text[idx + 1..].trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            return (text[..idx].trim_end(), comment);
        }
        prev_is_space = ch.is_whitespace();
    }
    (text.trim_end(), None)
}

/// Splits trailing pip options off a requirement: `foo==1.0 --hash=sha256:ab`.
fn split_requirement_options(text: &str) -> (&str, Vec<String>) {
    let Some(found) = OPTION_RE.find(text) else {
        return (text, Vec::new());
    };

    let mut options: Vec<String> = Vec::new();
    for token in text[found.start()..].split_whitespace() {
        match options.last_mut() {
            // `--hash sha256:ab` 形式，值跟在選項後面
            Some(last) if !token.starts_with("--") => {
                last.push(' ');
                last.push_str(token);
            }
            _ => options.push(token.to_string()),
        }
    }
    (text[..found.start()].trim_end(), options)
}

fn split_directive(text: &str) -> (String, String) {
    let end = text
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(text.len());
    let flag = &text[..end];
    let value = text[end..].trim_start_matches('=').trim();
    (flag.to_string(), value.to_string())
}

/// Parses a single requirement. `line` is left at 0 for the caller to fill in.
pub fn parse_requirement(text: &str) -> Result<Requirement, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty requirement".to_string());
    }

    let (body, marker) = match text.split_once(';') {
        Some((body, marker)) => {
            let marker = marker.trim();
            if marker.is_empty() {
                return Err("empty environment marker after ';'".to_string());
            }
            (body.trim(), Some(marker.to_string()))
        }
        None => (text, None),
    };

    let name = NAME_RE
        .find(body)
        .map(|m| m.as_str())
        .ok_or_else(|| format!("expected a package name at '{}'", body))?;
    let mut rest = body[name.len()..].trim_start();

    let mut extras = Vec::new();
    if let Some(after) = rest.strip_prefix('[') {
        let close = after
            .find(']')
            .ok_or_else(|| "unterminated extras list".to_string())?;
        for extra in after[..close].split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if NAME_RE.find(extra).map(|m| m.as_str().len()) != Some(extra.len()) {
                return Err(format!("invalid extra '{}'", extra));
            }
            extras.push(extra.to_string());
        }
        rest = after[close + 1..].trim_start();
    }

    let mut specifiers = Vec::new();
    let mut url = None;
    if let Some(reference) = rest.strip_prefix('@') {
        let reference = reference.trim();
        if !reference.contains("://") {
            return Err(format!("invalid direct reference '{}'", reference));
        }
        url = Some(reference.to_string());
    } else if !rest.is_empty() {
        let specs = rest
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(rest);
        for spec in specs.split(',') {
            specifiers.push(parse_specifier(spec)?);
        }
    }

    Ok(Requirement {
        line: 0,
        name: name.to_string(),
        normalized: normalize_name(name),
        extras,
        specifiers,
        url,
        marker,
        options: Vec::new(),
        inline_comment: None,
    })
}

fn parse_specifier(spec: &str) -> Result<VersionSpec, String> {
    let spec = spec.trim();
    let op = Operator::ALL
        .into_iter()
        .find(|op| spec.starts_with(op.as_str()))
        .ok_or_else(|| format!("unexpected '{}' after package name", spec))?;

    let version = spec[op.as_str().len()..].trim();
    if version.is_empty() {
        return Err(format!("missing version after '{}'", op));
    }

    let valid = match op {
        Operator::Arbitrary => !version.contains(char::is_whitespace),
        Operator::Exact | Operator::NotEqual => match version.strip_suffix(".*") {
            Some(prefix) => is_valid_version(prefix),
            None => is_valid_version(version),
        },
        _ => is_valid_version(version),
    };
    if !valid {
        return Err(format!("invalid version '{}' for '{}'", version, op));
    }

    Ok(VersionSpec {
        op,
        version: version.to_string(),
    })
}
