mod cli;

use clap::Parser;
use cli::{Cli, CloseArgs, Commands};
use colored::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tracker_closure::{
    closure::{CloseOptions, ClosureEngine},
    error::{ClosureError, Result},
    report::CsvReportExporter,
    tracker::Dhis2Client,
    utils, Config,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tracker_closure=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Close(args) => close_patients(&config, args).await,
        Commands::ShowConfig => show_config(&config),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

async fn close_patients(config: &Config, args: CloseArgs) -> Result<()> {
    let options = CloseOptions {
        rules: args.rules(),
        start_date: args.start_date,
        end_date: args.end_date,
        report_path: args.save_report.clone(),
        submit: args.post,
    };

    let client = Dhis2Client::new(&config.dhis2)?;
    let engine = ClosureEngine::new(client, CsvReportExporter, config.reconcile.clone());

    let now = chrono::Utc::now();
    info!(
        "Closing patients of program {} inactive for {} days (run at {})",
        options.rules.program_id,
        options.rules.time_of_reference_days,
        utils::format_timestamp(&now)
    );

    let outcome = engine.close(&options, now).await?;

    if !options.submit {
        println!("{}", "Payload (not submitted, use --post to send):".yellow());
        println!("{}", serde_json::to_string_pretty(&outcome.payload)?);
    }

    if args.verbose {
        outcome.print_closures();
    }
    outcome.print_summary();

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&config.redacted())?;
    println!("{}", "=== Configuration ===".cyan().bold());
    println!("{}", rendered);

    if config.dhis2.url.contains('@') || config.dhis2.username.is_some() {
        println!("{}", "✓ Credentials configured".green());
    } else {
        return Err(ClosureError::Config(
            "no DHIS2 credentials: set dhis2.username/password or embed them in dhis2.url".to_string(),
        ));
    }

    Ok(())
}
