use crate::core::checker::RuleSet;
use crate::core::stdlib::StdlibCatalog;
use crate::domain::model::{Diagnostic, Manifest, Rule};
use crate::domain::ports::PackageIndex;
use crate::utils::error::{AuditError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// PyPI 相容的 JSON API：`GET {base}/pypi/{name}/json`
pub struct PypiIndex {
    client: Client,
    base_url: String,
}

impl PypiIndex {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("req-audit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PackageIndex for PypiIndex {
    async fn project_exists(&self, name: &str) -> Result<bool> {
        let url = format!("{}/pypi/{}/json", self.base_url, name);
        tracing::debug!("Looking up {} at {}", name, url);

        let response = self.client.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AuditError::ProcessingError {
                message: format!("index returned {} for '{}'", status, name),
            }),
        }
    }
}

/// Looks up every active, non-stdlib requirement and reports the ones the
/// index does not know. Lookup failures are logged and skipped.
pub async fn resolve_requirements(
    index: Arc<dyn PackageIndex>,
    manifest: &Manifest,
    catalog: &StdlibCatalog,
    rules: &RuleSet,
    concurrent_requests: usize,
) -> Vec<Diagnostic> {
    let semaphore = Arc::new(Semaphore::new(concurrent_requests.max(1)));
    let mut seen = HashSet::new();
    let mut tasks = JoinSet::new();

    for requirement in manifest.requirements() {
        if requirement.url.is_some() || catalog.contains(&requirement.name) {
            continue;
        }
        if !seen.insert(requirement.normalized.clone()) {
            continue;
        }

        let index = Arc::clone(&index);
        let semaphore = Arc::clone(&semaphore);
        let name = requirement.name.clone();
        let normalized = requirement.normalized.clone();
        let line = requirement.line;

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let outcome = index.project_exists(&normalized).await;
            (line, name, outcome)
        });
    }

    let mut missing = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((line, name, Ok(false))) => missing.push((line, name)),
            Ok((_, _, Ok(true))) => {}
            Ok((_, name, Err(e))) => {
                tracing::warn!("⚠️ Could not resolve '{}' on the index: {}", name, e);
            }
            Err(e) => tracing::warn!("⚠️ Index lookup task failed: {}", e),
        }
    }

    missing.sort();
    missing
        .into_iter()
        .filter_map(|(line, name)| {
            rules.diagnostic(
                Rule::IndexUnresolved,
                Some(line),
                Some(name.as_str()),
                format!("'{}' does not exist on the package index", name),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_manifest;
    use std::sync::Mutex;

    struct FakeIndex {
        known: Vec<&'static str>,
        asked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PackageIndex for FakeIndex {
        async fn project_exists(&self, name: &str) -> Result<bool> {
            self.asked.lock().unwrap().push(name.to_string());
            if name == "flaky" {
                return Err(AuditError::ProcessingError {
                    message: "timeout".to_string(),
                });
            }
            Ok(self.known.iter().any(|k| *k == name))
        }
    }

    #[test]
    fn test_resolve_reports_missing_projects_only() {
        let manifest = parse_manifest(
            "python-telegram-bot==20.7\nnot-a-real-pkg==1.0\nsqlite3\nflaky\nPython_Telegram_Bot\n",
        );
        let index = Arc::new(FakeIndex {
            known: vec!["python-telegram-bot"],
            asked: Mutex::new(Vec::new()),
        });

        let diagnostics = tokio_test::block_on(resolve_requirements(
            index.clone(),
            &manifest,
            &StdlibCatalog::default(),
            &RuleSet::default(),
            2,
        ));

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, Rule::IndexUnresolved);
        assert_eq!(diagnostics[0].line, Some(2));

        let mut asked = index.asked.lock().unwrap().clone();
        asked.sort();
        assert_eq!(asked, vec!["flaky", "not-a-real-pkg", "python-telegram-bot"]);
    }
}
