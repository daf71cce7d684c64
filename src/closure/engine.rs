use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use crate::{
    closure::{
        eligibility::EligibilityFilter,
        payload::{into_payload, ClosurePayloadBuilder, PlannedClosure},
        reconcile::Reconciler,
        rules::ClosureRules,
    },
    config::ReconcileConfig,
    error::Result,
    report::ReportExporter,
    tracker::{ClosurePayload, ImportStats, TrackedEntityQuery, TrackerRepository},
    utils,
};

/// Everything one closure run needs
#[derive(Debug, Clone)]
pub struct CloseOptions {
    pub rules: ClosureRules,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub report_path: PathBuf,
    /// Send the payload; otherwise it is only returned
    pub submit: bool,
}

impl CloseOptions {
    pub fn query(&self) -> TrackedEntityQuery {
        TrackedEntityQuery {
            program_id: self.rules.program_id.clone(),
            org_unit_ids: self.rules.org_unit_ids.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Result of a closure run
#[derive(Debug)]
pub struct ClosureOutcome {
    pub fetched: usize,
    pub closures: Vec<PlannedClosure>,
    pub payload: ClosurePayload,
    pub report_path: Option<PathBuf>,
    pub stats: Option<ImportStats>,
}

impl ClosureOutcome {
    pub fn eligible(&self) -> usize {
        self.closures.len()
    }

    pub fn submitted(&self) -> bool {
        self.stats.is_some()
    }

    /// Print a formatted summary to console
    pub fn print_summary(&self) {
        println!("\n{}", "=== Closure Summary ===".cyan().bold());
        println!("Fetched:         {}", self.fetched);
        println!("Eligible:        {}", self.eligible().to_string().green());

        match &self.report_path {
            Some(path) => println!("Report:          {}", path.display()),
            None => println!("Report:          {}", "not written".yellow()),
        }

        match &self.stats {
            Some(stats) => println!(
                "Submitted:       created {} / updated {} / deleted {} / ignored {} / total {}",
                stats.created, stats.updated, stats.deleted, stats.ignored, stats.total
            ),
            None => println!("Submitted:       {}", "no (payload not sent)".yellow()),
        }
        println!("{}", "=======================".cyan());
    }

    /// Print one row per planned closure
    pub fn print_closures(&self) {
        if self.closures.is_empty() {
            return;
        }

        let widths = [14, 14, 14, 12, 12];
        utils::print_table_border(74);
        utils::print_table_row(
            &["Entity", "Enrollment", "Org Unit", "Last visit", "Closed on"],
            &widths,
        );
        utils::print_table_border(74);

        for closure in &self.closures {
            let closed_on = closure
                .event
                .occurred_at
                .map(|ts| utils::format_date(&ts))
                .unwrap_or_default();
            utils::print_table_row(
                &[
                    &closure.tracked_entity,
                    &closure.enrollment.enrollment,
                    &closure.event.org_unit,
                    &utils::format_date(&closure.last_qualifying),
                    &closed_on,
                ],
                &widths,
            );
        }
        utils::print_table_border(74);
    }
}

/// Fetch, reconcile, filter, report and (optionally) submit
pub struct ClosureEngine<R: TrackerRepository, X: ReportExporter> {
    repository: R,
    exporter: X,
    reconcile: ReconcileConfig,
}

impl<R: TrackerRepository, X: ReportExporter> ClosureEngine<R, X> {
    pub fn new(repository: R, exporter: X, reconcile: ReconcileConfig) -> Self {
        Self {
            repository,
            exporter,
            reconcile,
        }
    }

    /// Run one closure. `now` is captured once by the caller and used for every date computation.
    pub async fn close(&self, options: &CloseOptions, now: DateTime<Utc>) -> Result<ClosureOutcome> {
        options.rules.validate()?;

        let entities = self.repository.fetch(&options.query()).await?;
        let fetched = entities.len();
        info!("Fetched {} tracked entities", fetched);

        let reconciled = Reconciler::new(&self.repository, &self.reconcile)
            .reconcile(entities)
            .await?;

        let eligible = EligibilityFilter::new(&options.rules, now).filter(reconciled);
        info!(
            "{} of {} tracked entities are lost to follow-up (cutoff {})",
            eligible.len(),
            fetched,
            utils::format_date(&options.rules.cutoff(now))
        );

        if eligible.is_empty() {
            info!("No eligible tracked entities, skipping report and submission");
            return Ok(ClosureOutcome {
                fetched,
                closures: Vec::new(),
                payload: ClosurePayload::default(),
                report_path: None,
                stats: None,
            });
        }

        self.exporter
            .export(&eligible, &options.rules.program_id, &options.report_path)?;
        info!("Report: {}", options.report_path.display());

        let closures = ClosurePayloadBuilder::new(&options.rules, now).plan_all(&eligible);
        let payload = into_payload(closures.clone());

        let stats = if options.submit {
            let stats = self.repository.submit(&payload).await?;
            info!(
                "Closed patients. Enrollments and closure events: created {}, updated {}, ignored {}",
                stats.created, stats.updated, stats.ignored
            );
            Some(stats)
        } else {
            info!("Payload built but not submitted");
            None
        };

        Ok(ClosureOutcome {
            fetched,
            closures,
            payload,
            report_path: Some(options.report_path.clone()),
            stats,
        })
    }
}
