use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tracker::dates;

/// A tracked entity (patient) as returned by the tracker API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntity {
    pub tracked_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_entity_type: Option<String>,
    pub org_unit: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Cancelled,
}

/// One patient's participation in a tracker program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub enrollment: String,
    pub tracked_entity: String,
    pub program: String,
    pub status: EnrollmentStatus,
    pub org_unit: String,
    #[serde(with = "dates::iso")]
    pub enrolled_at: DateTime<Utc>,
    #[serde(with = "dates::iso")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Active,
    Completed,
    Visited,
    Schedule,
    Overdue,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    pub program_stage: String,
    pub enrollment: String,
    pub org_unit: String,
    /// Absent on events that were only scheduled
    #[serde(default, with = "dates::iso_option", skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    #[serde(default, with = "dates::iso_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "dates::iso_option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_values: Vec<DataValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub data_element: String,
    pub value: String,
}

/// A data element paired with the value to record at closure.
///
/// Parsed from the `DE-Value` command-line form; the value may itself contain dashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElementValue {
    pub data_element: String,
    pub value: String,
}

impl DataElementValue {
    pub fn new(data_element: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data_element: data_element.into(),
            value: value.into(),
        }
    }
}

impl FromStr for DataElementValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((de, value)) if !de.trim().is_empty() && !value.trim().is_empty() => {
                Ok(Self::new(de.trim(), value.trim()))
            }
            _ => Err(format!("Invalid pair: {} (expected DATA_ELEMENT-VALUE)", s)),
        }
    }
}

impl fmt::Display for DataElementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.data_element, self.value)
    }
}

impl From<&DataElementValue> for DataValue {
    fn from(pair: &DataElementValue) -> Self {
        DataValue {
            data_element: pair.data_element.clone(),
            value: pair.value.clone(),
        }
    }
}

/// Filter for the bulk tracked-entity read
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackedEntityQuery {
    pub program_id: String,
    /// `None` means every org unit, which is not the same as an empty list
    pub org_unit_ids: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TrackedEntityQuery {
    pub fn new(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            ..Default::default()
        }
    }

    /// Org-unit selection mode the server must be asked for
    pub fn ou_mode(&self) -> &'static str {
        match self.org_unit_ids {
            Some(_) => "SELECTED",
            None => "ALL",
        }
    }
}

/// Authoritative enrollment/org-unit slice for one tracked entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledFragment {
    pub tracked_entity_instance: String,
    #[serde(default)]
    pub enrollments: Option<Vec<EnrollmentRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRef {
    pub enrollment: String,
    #[serde(default)]
    pub program: Option<String>,
    pub org_unit: String,
}

/// Write unit sent to the tracker importer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClosurePayload {
    pub enrollments: Vec<Enrollment>,
    pub events: Vec<Event>,
}

impl ClosurePayload {
    pub fn is_empty(&self) -> bool {
        self.enrollments.is_empty() && self.events.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportStats {
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub ignored: u64,
    #[serde(default)]
    pub total: u64,
}
