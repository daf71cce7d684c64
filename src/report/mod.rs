pub mod csv_export;

#[cfg(test)]
use mockall::automock;
use std::path::Path;

use crate::{error::Result, tracker::TrackedEntity};

pub use csv_export::CsvReportExporter;

/// Writes the list of patients about to be closed
#[cfg_attr(test, automock)]
pub trait ReportExporter: Send + Sync {
    fn export(&self, entities: &[TrackedEntity], program_id: &str, destination: &Path) -> Result<()>;
}
