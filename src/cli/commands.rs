use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tracker_closure::{closure::ClosureRules, tracker::DataElementValue};

#[derive(Parser)]
#[command(name = "tracker-closure")]
#[command(about = "Close tracker enrollments of patients lost to follow-up")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (defaults to config/default.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Close the patients meeting the "lost to follow-up" conditions of a tracker program
    Close(CloseArgs),

    /// Show the resolved configuration
    ShowConfig,
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Tracker program reference ID
    #[arg(long = "tracker-program-id")]
    pub program_id: String,

    /// Organisation units to filter, comma-separated (all units when omitted)
    #[arg(long = "org-units-ids", value_delimiter = ',')]
    pub org_unit_ids: Option<Vec<String>>,

    /// Start of the enrollment period to filter (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// End of the enrollment period to filter (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Consultation program stages ID1,ID2[,IDN]
    #[arg(long = "program-stages-ids", value_delimiter = ',', required = true)]
    pub program_stage_ids: Vec<String>,

    /// Program stage of the closure event
    #[arg(long = "closure-program-id")]
    pub closure_stage_id: String,

    /// Days without consultation to consider a patient lost to follow-up
    #[arg(long)]
    pub time_of_reference: u32,

    /// Data elements filled at closure with their values DE1-Value1,DE2-Value2[,DEN-ValueN]
    #[arg(long = "pairs-de-value", value_delimiter = ',', required = true)]
    pub pairs_de_value: Vec<DataElementValue>,

    /// Comment data element with its value DE-Value
    #[arg(long)]
    pub comments: Option<DataElementValue>,

    /// Path of the CSV report of closed patients
    #[arg(long = "save-report")]
    pub save_report: PathBuf,

    /// Send the payload to the DHIS2 API. If not present, the payload is only shown.
    #[arg(long)]
    pub post: bool,

    /// Show a table of every planned closure
    #[arg(short, long)]
    pub verbose: bool,
}

impl CloseArgs {
    pub fn rules(&self) -> ClosureRules {
        ClosureRules {
            program_id: self.program_id.clone(),
            org_unit_ids: self.org_unit_ids.clone(),
            qualifying_stage_ids: self
                .program_stage_ids
                .iter()
                .filter(|id| !id.is_empty())
                .cloned()
                .collect(),
            closure_stage_id: self.closure_stage_id.clone(),
            time_of_reference_days: self.time_of_reference,
            data_values: self.pairs_de_value.clone(),
            comment: self.comments.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CloseArgs {
        let mut argv = vec!["tracker-closure", "close"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Close(args) => args,
            _ => panic!("expected close"),
        }
    }

    const REQUIRED: [&str; 10] = [
        "--tracker-program-id",
        "progHIV",
        "--program-stages-ids",
        "stageA,stageB",
        "--closure-program-id",
        "stageClosure",
        "--time-of-reference",
        "90",
        "--save-report",
        "report.csv",
    ];

    #[test]
    fn test_parse_close_arguments() {
        let mut args = REQUIRED.to_vec();
        args.extend([
            "--pairs-de-value",
            "deReason-LTFU,deDate-2023-01-01",
            "--comments",
            "deComment-Closed by script",
            "--org-units-ids",
            "ou1,ou2",
            "--start-date",
            "2023-01-01",
            "--post",
        ]);
        let close = parse(&args);
        let rules = close.rules();

        assert!(close.post);
        assert_eq!(close.start_date, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(rules.qualifying_stage_ids, vec!["stageA", "stageB"]);
        assert_eq!(rules.org_unit_ids, Some(vec!["ou1".to_string(), "ou2".to_string()]));
        assert_eq!(rules.time_of_reference_days, 90);
        assert_eq!(
            rules.data_values,
            vec![
                DataElementValue::new("deReason", "LTFU"),
                DataElementValue::new("deDate", "2023-01-01"),
            ]
        );
        assert_eq!(rules.comment, Some(DataElementValue::new("deComment", "Closed by script")));
    }

    #[test]
    fn test_org_units_optional() {
        let mut args = REQUIRED.to_vec();
        args.extend(["--pairs-de-value", "deReason-LTFU"]);
        let close = parse(&args);
        assert!(close.org_unit_ids.is_none());
        assert!(!close.post);
    }

    #[test]
    fn test_malformed_pair_rejected() {
        let mut argv = vec!["tracker-closure", "close"];
        argv.extend_from_slice(&REQUIRED);
        argv.extend(["--pairs-de-value", "justAnElement"]);
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
