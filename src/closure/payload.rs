use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{
    closure::rules::ClosureRules,
    tracker::{ClosurePayload, DataValue, Enrollment, EnrollmentStatus, Event, EventStatus, TrackedEntity},
};

/// One planned closure: the completed enrollment and the event recording it
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedClosure {
    pub tracked_entity: String,
    pub last_qualifying: DateTime<Utc>,
    pub enrollment: Enrollment,
    pub event: Event,
}

/// Turns eligible tracked entities into the closure write payload
pub struct ClosurePayloadBuilder<'a> {
    rules: &'a ClosureRules,
    now: DateTime<Utc>,
}

impl<'a> ClosurePayloadBuilder<'a> {
    pub fn new(rules: &'a ClosureRules, now: DateTime<Utc>) -> Self {
        Self { rules, now }
    }

    /// Plan the closure of an eligible entity's retained enrollment.
    ///
    /// Returns `None` when the enrollment has no dated qualifying event, which the
    /// eligibility filter already rules out.
    pub fn plan(&self, entity: &TrackedEntity) -> Option<PlannedClosure> {
        let source = entity.enrollments.first()?;
        let last_qualifying = self.rules.last_qualifying_date(source)?;

        let enrollment = Enrollment {
            enrollment: source.enrollment.clone(),
            tracked_entity: source.tracked_entity.clone(),
            program: source.program.clone(),
            status: EnrollmentStatus::Completed,
            org_unit: source.org_unit.clone(),
            enrolled_at: source.enrolled_at,
            occurred_at: source.occurred_at,
            events: Vec::new(),
        };

        let event = Event {
            event: None,
            status: EventStatus::Completed,
            program_stage: self.rules.closure_stage_id.clone(),
            enrollment: source.enrollment.clone(),
            org_unit: source.org_unit.clone(),
            occurred_at: Some(self.rules.closure_date(last_qualifying)),
            deleted: false,
            created_at: Some(self.now),
            updated_at: Some(self.now),
            data_values: self.data_values(),
        };

        Some(PlannedClosure {
            tracked_entity: entity.tracked_entity.clone(),
            last_qualifying,
            enrollment,
            event,
        })
    }

    /// Configured pairs, then the comment pair if one was given
    fn data_values(&self) -> Vec<DataValue> {
        self.rules
            .data_values
            .iter()
            .chain(self.rules.comment.iter())
            .map(DataValue::from)
            .collect()
    }

    pub fn plan_all(&self, entities: &[TrackedEntity]) -> Vec<PlannedClosure> {
        entities
            .iter()
            .filter_map(|entity| {
                let planned = self.plan(entity);
                if planned.is_none() {
                    warn!(
                        "Skipping {}: no dated qualifying event on retained enrollment",
                        entity.tracked_entity
                    );
                }
                planned
            })
            .collect()
    }

    pub fn build(&self, entities: &[TrackedEntity]) -> ClosurePayload {
        into_payload(self.plan_all(entities))
    }
}

/// Assemble planned closures into a payload, keeping enrollment/event pairing order
pub fn into_payload(planned: Vec<PlannedClosure>) -> ClosurePayload {
    let (enrollments, events): (Vec<Enrollment>, Vec<Event>) = planned
        .into_iter()
        .map(|closure| (closure.enrollment, closure.event))
        .unzip();

    ClosurePayload { enrollments, events }
}
