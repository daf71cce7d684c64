use csv::Writer;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::{
    error::{ClosureError, Result},
    report::ReportExporter,
    tracker::TrackedEntity,
};

const HEADER: [&str; 3] = ["Program ID", "Tracked Entity ID", "Org Unit ID"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportExporter;

impl ReportExporter for CsvReportExporter {
    fn export(&self, entities: &[TrackedEntity], program_id: &str, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ClosureError::Report(format!("Failed creating directory {}: {}", parent.display(), e))
            })?;
        }

        let failed = |e: &dyn std::fmt::Display| {
            ClosureError::Report(format!("Failed writing {}: {}", destination.display(), e))
        };

        let mut writer = Writer::from_path(destination).map_err(|e| failed(&e))?;
        writer.write_record(HEADER).map_err(|e| failed(&e))?;

        for entity in entities {
            writer
                .write_record([program_id, entity.tracked_entity.as_str(), entity.org_unit.as_str()])
                .map_err(|e| failed(&e))?;
        }

        writer.flush().map_err(|e| failed(&e))?;
        info!("Report written to {} ({} rows)", destination.display(), entities.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::rules::fixtures::{patient, PROGRAM};

    #[test]
    fn test_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("closures.csv");

        let mut second = patient("te2", vec![]);
        second.org_unit = "ouOther".to_string();
        let entities = vec![patient("te1", vec![]), second];

        CsvReportExporter.export(&entities, PROGRAM, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Program ID,Tracked Entity ID,Org Unit ID");
        assert_eq!(lines[1], format!("{},te1,ouClinic", PROGRAM));
        assert_eq!(lines[2], format!("{},te2,ouOther", PROGRAM));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_unwritable_destination_is_report_error() {
        let dir = tempfile::tempdir().unwrap();

        // The destination is an existing directory, so the file cannot be created
        let err = CsvReportExporter
            .export(&[patient("te1", vec![])], PROGRAM, dir.path())
            .unwrap_err();

        assert!(matches!(err, ClosureError::Report(_)));
    }
}
