pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{AuditConfig, LocalStorage};
pub use core::{
    checker::{Checker, RuleSet},
    engine::{AuditEngine, AuditOutcome},
    parser::{parse_manifest, parse_requirement},
    pipeline::AuditPipeline,
    stdlib::StdlibCatalog,
};
pub use domain::model::{
    AuditReport, ConstraintKind, Diagnostic, LineKind, Manifest, Requirement, Rule, Severity,
};
pub use utils::error::{AuditError, Result};
