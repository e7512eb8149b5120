use crate::config::toml_config::AuditConfig;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "req-audit", version)]
#[command(about = "Parse and audit Python requirements manifests")]
pub struct Cli {
    /// Path to TOML configuration file (defaults to ./req-audit.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run conformance checks on a manifest
    Check(CheckArgs),

    /// List the requirements parsed from a manifest
    List {
        manifest: Option<String>,

        /// Include commented-out requirements
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Print the requirement lines an installer should actually receive
    InstallSet {
        manifest: Option<String>,

        /// Keep entries that name standard-library modules
        #[arg(long)]
        keep_stdlib: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct CheckArgs {
    pub manifest: Option<String>,

    /// Report formats: text, json, csv. The first one is printed to stdout.
    #[arg(short, long, value_delimiter = ',')]
    pub format: Vec<String>,

    /// Directory to write report files into
    #[arg(short, long)]
    pub output: Option<String>,

    /// Python source tree to cross-check imports against
    #[arg(long)]
    pub source_dir: Option<String>,

    /// Verify every requirement exists on the package index
    #[arg(long)]
    pub check_index: bool,

    #[arg(long)]
    pub index_url: Option<String>,

    /// Lowest diagnostic severity that makes the command exit with status 1
    #[arg(long)]
    pub fail_on: Option<String>,
}

impl CheckArgs {
    /// 命令列參數覆蓋設定檔
    pub fn apply_to(&self, config: &mut AuditConfig) {
        if let Some(manifest) = &self.manifest {
            config.manifest.path = manifest.clone();
        }
        if !self.format.is_empty() {
            config.report.formats = self.format.clone();
        }
        if let Some(output) = &self.output {
            config.report.output_path = Some(output.clone());
        }
        if let Some(dir) = &self.source_dir {
            config.imports.source_dir = Some(dir.clone());
        }
        if self.check_index {
            config.index.enabled = true;
        }
        if let Some(url) = &self.index_url {
            config.index.enabled = true;
            config.index.url = Some(url.clone());
        }
        if let Some(level) = &self.fail_on {
            config.report.fail_on = level.clone();
        }
    }
}
