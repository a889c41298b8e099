//! Audit log export
//!
//! The service selects and masks rows; turning them into CSV, XLSX or PDF
//! bytes is the job of an [`ExportRenderer`] supplied at startup.

use crate::audit::AuditRecord;
use serde::{Deserialize, Serialize};
use tally_common::TallyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            other => Err(TallyError::parse(format!(
                "Unsupported export format '{}'; expected csv, xlsx or pdf",
                other
            ))),
        }
    }
}

/// Rendered export ready to send
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

pub trait ExportRenderer: Send + Sync {
    fn render(
        &self,
        format: ExportFormat,
        records: &[AuditRecord],
    ) -> Result<RenderedExport, TallyError>;
}
