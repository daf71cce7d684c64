use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{ClosureError, Result},
    tracker::{dates, DataElementValue, Enrollment, Event},
};

/// Upper bound on the inactivity offset, about a century
pub const MAX_TIME_OF_REFERENCE_DAYS: u32 = 36_500;

/// Program-specific rules deciding who is lost to follow-up and how the closure is recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureRules {
    pub program_id: String,
    /// `None` allows every org unit
    pub org_unit_ids: Option<Vec<String>>,
    /// Program stages whose events count as follow-up activity (consultations)
    pub qualifying_stage_ids: Vec<String>,
    /// Program stage of the closure event, also used to detect earlier closures
    pub closure_stage_id: String,
    /// Days without qualifying activity before a patient is lost to follow-up
    pub time_of_reference_days: u32,
    pub data_values: Vec<DataElementValue>,
    pub comment: Option<DataElementValue>,
}

impl ClosureRules {
    pub fn validate(&self) -> Result<()> {
        if self.program_id.trim().is_empty() {
            return Err(ClosureError::Config("program id must not be empty".to_string()));
        }
        if self.closure_stage_id.trim().is_empty() {
            return Err(ClosureError::Config("closure program stage must not be empty".to_string()));
        }
        if self.qualifying_stage_ids.is_empty() {
            return Err(ClosureError::Config(
                "at least one qualifying program stage is required".to_string(),
            ));
        }
        if self.time_of_reference_days > MAX_TIME_OF_REFERENCE_DAYS {
            return Err(ClosureError::Config(format!(
                "time of reference must be at most {} days (got {})",
                MAX_TIME_OF_REFERENCE_DAYS, self.time_of_reference_days
            )));
        }
        if matches!(&self.org_unit_ids, Some(ids) if ids.is_empty()) {
            return Err(ClosureError::Config(
                "org unit filter must list at least one id (omit it for all units)".to_string(),
            ));
        }
        Ok(())
    }

    /// `now - time_of_reference_days`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        dates::shift_days(now, -i64::from(self.time_of_reference_days))
    }

    /// Date recorded on the closure event: the same offset applied forward from the last activity
    pub fn closure_date(&self, last_qualifying: DateTime<Utc>) -> DateTime<Utc> {
        dates::shift_days(last_qualifying, i64::from(self.time_of_reference_days))
    }

    pub fn allows_org_unit(&self, org_unit: &str) -> bool {
        match &self.org_unit_ids {
            Some(ids) => ids.iter().any(|id| id == org_unit),
            None => true,
        }
    }

    pub fn is_qualifying(&self, event: &Event) -> bool {
        !event.deleted && self.qualifying_stage_ids.iter().any(|s| *s == event.program_stage)
    }

    pub fn is_closure(&self, event: &Event) -> bool {
        !event.deleted && event.program_stage == self.closure_stage_id
    }

    /// A non-deleted qualifying event without an occurrence date (e.g. a scheduled consultation)
    pub fn has_undated_qualifying(&self, enrollment: &Enrollment) -> bool {
        enrollment
            .events
            .iter()
            .any(|event| self.is_qualifying(event) && event.occurred_at.is_none())
    }

    /// Occurrence dates of non-deleted qualifying events that have one
    pub fn qualifying_dates(&self, enrollment: &Enrollment) -> Vec<DateTime<Utc>> {
        enrollment
            .events
            .iter()
            .filter(|event| self.is_qualifying(event))
            .filter_map(|event| event.occurred_at)
            .collect()
    }

    pub fn last_qualifying_date(&self, enrollment: &Enrollment) -> Option<DateTime<Utc>> {
        self.qualifying_dates(enrollment).into_iter().max()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::tracker::{EnrollmentStatus, EventStatus, TrackedEntity};
    use chrono::TimeZone;

    pub const PROGRAM: &str = "progHIV";
    pub const ORG_UNIT: &str = "ouClinic";
    pub const CONSULTATION: &str = "stageConsult";
    pub const CLOSURE: &str = "stageClosure";

    pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    pub fn rules() -> ClosureRules {
        ClosureRules {
            program_id: PROGRAM.to_string(),
            org_unit_ids: Some(vec![ORG_UNIT.to_string()]),
            qualifying_stage_ids: vec![CONSULTATION.to_string()],
            closure_stage_id: CLOSURE.to_string(),
            time_of_reference_days: 90,
            data_values: vec![DataElementValue::new("deReason", "LOST_TO_FOLLOW_UP")],
            comment: None,
        }
    }

    pub fn event(stage: &str, date: DateTime<Utc>) -> Event {
        Event {
            event: None,
            status: EventStatus::Completed,
            program_stage: stage.to_string(),
            enrollment: "en1".to_string(),
            org_unit: ORG_UNIT.to_string(),
            occurred_at: Some(date),
            deleted: false,
            created_at: None,
            updated_at: None,
            data_values: vec![],
        }
    }

    pub fn deleted(mut event: Event) -> Event {
        event.deleted = true;
        event
    }

    pub fn enrollment(id: &str, program: &str, org_unit: &str, events: Vec<Event>) -> Enrollment {
        Enrollment {
            enrollment: id.to_string(),
            tracked_entity: "te1".to_string(),
            program: program.to_string(),
            status: EnrollmentStatus::Active,
            org_unit: org_unit.to_string(),
            enrolled_at: day(2022, 6, 1),
            occurred_at: day(2022, 6, 1),
            events,
        }
    }

    pub fn patient(id: &str, enrollments: Vec<Enrollment>) -> TrackedEntity {
        TrackedEntity {
            tracked_entity: id.to_string(),
            tracked_entity_type: Some("person".to_string()),
            org_unit: ORG_UNIT.to_string(),
            inactive: false,
            deleted: false,
            enrollments,
        }
    }

    /// E1 from the reference scenario: two consultations in early 2023
    pub fn scenario_patient(extra: Vec<Event>) -> TrackedEntity {
        let mut events = vec![event(CONSULTATION, day(2023, 1, 1)), event(CONSULTATION, day(2023, 2, 1))];
        events.extend(extra);
        patient("E1", vec![enrollment("en1", PROGRAM, ORG_UNIT, events)])
    }
}
