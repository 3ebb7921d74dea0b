use std::path::PathBuf;
use std::process;
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use ecosystem_service::analysis::charts::{self, ChartPoint};
use ecosystem_service::config::Config;
use ecosystem_service::dashboard::{ChartSeries, EcosystemDashboard, OrganizationFilter, Snapshot};
use ecosystem_service::dev_mode::DevMode;
use ecosystem_service::ingest::RowSource;
use ecosystem_service::ingest::postgrest::RestClient;
use ecosystem_service::logging::{self, Source};
use ecosystem_service::model::{BackendError, EcosystemStats, EcosystemType, Organization};
use ecosystem_service::realtime::ChangeFeed;
use ecosystem_service::{tables, verify};

/// Startup-ecosystem directory: fetch, normalize and summarize organizations
#[derive(Debug, Parser)]
#[command(name = "ecosystem_service", version)]
struct Cli {
    /// TOML config file (defaults to ./ecosystem.toml when present)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Serve rows from a JSON fixture instead of the live backend
    #[arg(long, value_name = "PATH", global = true)]
    fixture: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Headline statistics and chart series
    Summary,
    /// List organizations, optionally filtered
    List {
        /// accelerator, investor, funding, government, coworking or incubator
        #[arg(long = "type", value_name = "TYPE", value_parser = parse_type)]
        kind: Option<EcosystemType>,
        /// Case-insensitive match on name, tagline and tags
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Fetch one organization by id
    Show { id: String },
    /// Probe every backend table
    Verify,
    /// Print the summary, then refresh it on every database change
    Watch,
}

fn parse_type(value: &str) -> Result<EcosystemType, String> {
    EcosystemType::parse(&value.to_ascii_lowercase()).ok_or_else(|| {
        let valid: Vec<_> = EcosystemType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown type '{}', expected one of: {}", value, valid.join(", "))
    })
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    logging::init_logger(
        config.logging.level(),
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    if let Err(e) = run(&cli, &config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli, config: &Config) -> Result<(), BackendError> {
    match &cli.command {
        Command::Summary => {
            let mut dashboard = EcosystemDashboard::new(open_source(cli, config)?);
            let snapshot = dashboard.refresh()?;
            print_summary(snapshot, cli.json)
        }
        Command::List { kind, query } => {
            let mut dashboard = EcosystemDashboard::new(open_source(cli, config)?);
            dashboard.refresh()?;
            let filter = OrganizationFilter {
                kind: *kind,
                query: query.clone(),
            };
            let matches = dashboard.filter(&filter);
            if cli.json {
                println!("{}", to_json(&matches)?);
            } else {
                print_list(&matches);
            }
            Ok(())
        }
        Command::Show { id } => {
            let dashboard = EcosystemDashboard::new(open_source(cli, config)?);
            match dashboard.fetch_detail(id)? {
                Some(org) => {
                    println!("{}", to_json(&org)?);
                    Ok(())
                }
                None => {
                    eprintln!("No organization with id '{}'", id);
                    process::exit(2);
                }
            }
        }
        Command::Verify => {
            if cli.fixture.is_some() {
                return Err(BackendError::Config(
                    "verify probes the live backend and cannot run against a fixture".to_string(),
                ));
            }
            let client = RestClient::from_config(&config.backend)?;
            let report = verify::verify_tables(&client);
            if cli.json {
                println!("{}", to_json(&report)?);
            } else {
                verify::print_summary(&report);
            }
            Ok(())
        }
        Command::Watch => watch(cli, config),
    }
}

fn open_source(cli: &Cli, config: &Config) -> Result<Box<dyn RowSource>, BackendError> {
    match &cli.fixture {
        Some(path) => Ok(Box::new(DevMode::load(path)?)),
        None => Ok(Box::new(RestClient::from_config(&config.backend)?)),
    }
}

fn watch(cli: &Cli, config: &Config) -> Result<(), BackendError> {
    let mut dashboard = EcosystemDashboard::new(open_source(cli, config)?);
    print_summary(dashboard.refresh()?, cli.json)?;

    let (tx, rx) = mpsc::channel();
    let feed = ChangeFeed::open(&config.realtime, &tables::all_table_names(), move |batch| {
        // Receiver gone means we are shutting down.
        let _ = tx.send(batch);
    })?;

    // Ends when the listener thread exits and drops the sender.
    for batch in rx {
        logging::info(
            Source::Realtime,
            None,
            &format!("{} changes received, refreshing", batch.len()),
        );
        match dashboard.refresh() {
            Ok(snapshot) => print_summary(snapshot, cli.json)?,
            Err(e) => logging::log_backend_failure(Source::Rest, None, "refresh", &e),
        }
    }

    feed.close();
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryOutput<'a> {
    fetched_at: String,
    stats: &'a EcosystemStats,
    charts: ChartSeries,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, BackendError> {
    serde_json::to_string_pretty(value).map_err(|e| BackendError::Parse(e.to_string()))
}

fn print_summary(snapshot: &Snapshot, json: bool) -> Result<(), BackendError> {
    let series = ChartSeries::from_snapshot(snapshot);
    if json {
        let output = SummaryOutput {
            fetched_at: snapshot.fetched_at.to_rfc3339(),
            stats: &snapshot.stats,
            charts: series,
        };
        println!("{}", to_json(&output)?);
        return Ok(());
    }

    let stats = &snapshot.stats;
    println!("Ecosystem summary ({})", snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Organizations:       {}", charts::format_count(stats.total_players as u64));
    println!("  Startups supported:  {}", charts::format_count(stats.total_startups_supported));
    println!(
        "  Capital deployed:    {}",
        charts::format_optional_currency(Some(stats.total_capital_deployed))
    );
    println!("  Avg portfolio size:  {}", stats.average_portfolio_size);

    print_series("By type", &series.by_type);
    print_series("By stage", &series.by_stage);
    print_series("Top sectors", &series.top_sectors);
    print_series("Founded per year", &series.growth_trend);
    Ok(())
}

fn print_series(title: &str, points: &[ChartPoint]) {
    println!();
    println!("{}:", title);
    if points.is_empty() {
        println!("  (none)");
    }
    for point in points {
        println!("  {:<24} {}", point.name, point.value);
    }
}

fn print_list(organizations: &[&Organization]) {
    for org in organizations {
        println!("{:>8}  {:<12} {}", org.id, org.kind.as_str(), org.name);
        if !org.tagline.is_empty() {
            println!("{:>8}  {:<12} {}", "", "", org.tagline);
        }
    }
    println!("{} organizations", organizations.len());
}
