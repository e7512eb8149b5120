use clap::Parser;
use req_audit::config::{CheckArgs, Cli, Commands};
use req_audit::core::report::ReportFormat;
use req_audit::core::Storage;
use req_audit::utils::{logger, validation::Validate};
use req_audit::{
    parse_manifest, AuditConfig, AuditEngine, AuditError, AuditPipeline, LocalStorage, Manifest,
    Result, StdlibCatalog,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(
                "❌ Audit failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = AuditConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check(args) => check(args, config).await,
        Commands::List {
            manifest,
            all,
            json,
        } => {
            if let Some(path) = manifest {
                config.manifest.path = path;
            }
            config.validate()?;
            let manifest = read_manifest(&config.manifest.path).await?;
            list(&manifest, all, json)?;
            Ok(0)
        }
        Commands::InstallSet {
            manifest,
            keep_stdlib,
        } => {
            if let Some(path) = manifest {
                config.manifest.path = path;
            }
            config.validate()?;
            let manifest = read_manifest(&config.manifest.path).await?;
            let catalog =
                StdlibCatalog::with_overrides(&config.stdlib.extra_modules, &config.stdlib.allow);
            for requirement in manifest.install_set(&catalog, keep_stdlib) {
                println!("{}", requirement);
            }
            Ok(0)
        }
    }
}

async fn check(args: CheckArgs, mut config: AuditConfig) -> Result<i32> {
    args.apply_to(&mut config);

    // 驗證配置
    config.validate()?;
    let formats = config.report_formats()?;
    let fail_on = config.fail_on()?;
    tracing::debug!("Audit config: {:?}", config);

    let pipeline = AuditPipeline::new(LocalStorage::default(), config)?;
    let engine = AuditEngine::new(pipeline);
    let outcome = engine.run().await?;

    let stdout_format = formats.first().copied().unwrap_or(ReportFormat::Text);
    print!("{}", stdout_format.render(&outcome.report)?);
    for path in &outcome.written {
        eprintln!("📁 Report saved to: {}", path);
    }

    if outcome.report.fails_at(fail_on) {
        tracing::warn!("Diagnostics at or above '{}' were reported", fail_on);
        Ok(1)
    } else {
        Ok(0)
    }
}

async fn read_manifest(path: &str) -> Result<Manifest> {
    let bytes = LocalStorage::default().read_file(path).await?;
    let content = String::from_utf8(bytes).map_err(|e| AuditError::ProcessingError {
        message: format!("Manifest '{}' is not valid UTF-8: {}", path, e),
    })?;
    Ok(parse_manifest(&content))
}

fn list(manifest: &Manifest, all: bool, json: bool) -> Result<()> {
    let mut entries: Vec<(&req_audit::Requirement, bool)> =
        manifest.requirements().map(|r| (r, true)).collect();
    if all {
        entries.extend(manifest.disabled().map(|r| (r, false)));
        entries.sort_by_key(|(r, _)| r.line);
    }

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|(r, active)| {
                serde_json::json!({
                    "line": r.line,
                    "name": r.name,
                    "normalized": r.normalized,
                    "constraint": r.constraint_kind(),
                    "specifiers": r.specifiers.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                    "active": active,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (r, active) in entries {
        let specs: Vec<String> = r.specifiers.iter().map(|s| s.to_string()).collect();
        println!(
            "{:>4}  {:<30} {:<13} {}{}",
            r.line,
            r.name,
            r.constraint_kind().to_string(),
            specs.join(","),
            if active { "" } else { "  (disabled)" }
        );
    }
    Ok(())
}
