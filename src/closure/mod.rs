pub mod eligibility;
pub mod engine;
pub mod payload;
pub mod reconcile;
pub mod rules;

pub use eligibility::{EligibilityFilter, Verdict};
pub use engine::{CloseOptions, ClosureEngine, ClosureOutcome};
pub use payload::{ClosurePayloadBuilder, PlannedClosure};
pub use reconcile::{lookup_with_retry, LookupOutcome, Reconciler};
pub use rules::ClosureRules;
