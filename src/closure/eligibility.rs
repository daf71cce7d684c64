use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

use crate::{
    closure::rules::ClosureRules,
    tracker::{Enrollment, EnrollmentStatus, TrackedEntity},
};

/// Why a tracked entity is, or is not, closed in this run
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Eligible { last_qualifying: DateTime<Utc> },
    NoMatchingEnrollment,
    NotActive(EnrollmentStatus),
    AlreadyClosed,
    UndatedQualifyingEvent,
    NoQualifyingEvents,
    RecentActivity {
        last_qualifying: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    },
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Eligible { last_qualifying } => write!(
                f,
                "eligible (last activity {})",
                last_qualifying.format("%Y-%m-%d")
            ),
            Verdict::NoMatchingEnrollment => write!(f, "no enrollment in program within allowed org units"),
            Verdict::NotActive(status) => write!(f, "enrollment is not active ({:?})", status),
            Verdict::AlreadyClosed => write!(f, "closure event already recorded"),
            Verdict::UndatedQualifyingEvent => write!(f, "qualifying event without occurrence date"),
            Verdict::NoQualifyingEvents => write!(f, "no qualifying events"),
            Verdict::RecentActivity { last_qualifying, cutoff } => write!(
                f,
                "activity on {} is after cutoff {}",
                last_qualifying.format("%Y-%m-%d"),
                cutoff.format("%Y-%m-%d")
            ),
        }
    }
}

/// Decides which tracked entities are lost to follow-up.
///
/// Only the **first** enrollment of the target program inside an allowed org unit is
/// considered. Later enrollments of the same program are ignored, both here and when
/// the payload is built.
pub struct EligibilityFilter<'a> {
    rules: &'a ClosureRules,
    now: DateTime<Utc>,
}

impl<'a> EligibilityFilter<'a> {
    pub fn new(rules: &'a ClosureRules, now: DateTime<Utc>) -> Self {
        Self { rules, now }
    }

    fn matching_enrollment_index(&self, entity: &TrackedEntity) -> Option<usize> {
        entity.enrollments.iter().position(|enrollment| {
            enrollment.program == self.rules.program_id && self.rules.allows_org_unit(&enrollment.org_unit)
        })
    }

    pub fn select_enrollment<'e>(&self, entity: &'e TrackedEntity) -> Option<&'e Enrollment> {
        self.matching_enrollment_index(entity)
            .map(|idx| &entity.enrollments[idx])
    }

    /// Evaluate an enrollment against the closure rules
    ///
    /// 1. It must be ACTIVE with no non-deleted closure event
    /// 2. Every qualifying event must carry an occurrence date
    /// 3. It needs at least one qualifying event, and all of them on or before the cutoff
    pub fn evaluate_enrollment(&self, enrollment: &Enrollment) -> Verdict {
        if enrollment.status != EnrollmentStatus::Active {
            return Verdict::NotActive(enrollment.status);
        }

        if enrollment.events.iter().any(|event| self.rules.is_closure(event)) {
            return Verdict::AlreadyClosed;
        }

        if self.rules.has_undated_qualifying(enrollment) {
            return Verdict::UndatedQualifyingEvent;
        }

        let Some(last_qualifying) = self.rules.last_qualifying_date(enrollment) else {
            return Verdict::NoQualifyingEvents;
        };

        let cutoff = self.rules.cutoff(self.now);
        if last_qualifying > cutoff {
            return Verdict::RecentActivity { last_qualifying, cutoff };
        }

        Verdict::Eligible { last_qualifying }
    }

    pub fn evaluate(&self, entity: &TrackedEntity) -> Verdict {
        match self.select_enrollment(entity) {
            Some(enrollment) => self.evaluate_enrollment(enrollment),
            None => Verdict::NoMatchingEnrollment,
        }
    }

    /// Keep eligible entities, each reduced to its single matching enrollment
    pub fn filter(&self, entities: Vec<TrackedEntity>) -> Vec<TrackedEntity> {
        entities
            .into_iter()
            .filter_map(|mut entity| {
                let idx = self.matching_enrollment_index(&entity);
                let verdict = match idx {
                    Some(idx) => self.evaluate_enrollment(&entity.enrollments[idx]),
                    None => Verdict::NoMatchingEnrollment,
                };

                debug!("Tracked entity {}: {}", entity.tracked_entity, verdict);

                match (idx, verdict.is_eligible()) {
                    (Some(idx), true) => {
                        let enrollment = entity.enrollments.swap_remove(idx);
                        entity.enrollments = vec![enrollment];
                        Some(entity)
                    }
                    _ => None,
                }
            })
            .collect()
    }
}
