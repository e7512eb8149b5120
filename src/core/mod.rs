pub mod checker;
pub mod engine;
pub mod imports;
pub mod index;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod stdlib;

pub use crate::domain::model::{AuditReport, Manifest, Requirement};
pub use crate::domain::ports::{ConfigProvider, PackageIndex, Pipeline, Storage};
pub use crate::utils::error::Result;
