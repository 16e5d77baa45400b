use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use regatta_prestige::athletes::FilterConfig;
use regatta_prestige::config::{Config, FetchSettings};
use regatta_prestige::fetch::RunReport;
use regatta_prestige::regatta::{listing, Endpoints, HttpTransport};
use regatta_prestige::scoring::{AthleteScore, ScoringConfig};

const EXIT_SUCCESS: i32 = 0;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_OUTPUT: i32 = 5;

const DEFAULT_TOP: u64 = 20;

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Fetch every event in the listing, write both exports and print the ranking (default)
    Run,
    /// Re-score a previously written athlete export without touching the network
    Score {
        /// Athlete export to read
        input: PathBuf,
    },
    /// List the events found in the listing without fetching results
    Events,
}

#[derive(Parser, Debug)]
#[command(name = "regatta-prestige")]
#[command(about = "Rank regatta athletes by prestige score", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/regatta-prestige/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Results listing: URL or saved HTML file (overrides config)
    #[arg(long, global = true)]
    listing: Option<String>,

    /// Where to write the athlete export
    #[arg(long, global = true)]
    athletes: Option<PathBuf>,

    /// Where to write the prestige export
    #[arg(long, global = true)]
    prestige: Option<PathBuf>,

    /// Apply the athlete pre-filter even if the config has no filter section
    #[arg(long, global = true)]
    filter: bool,

    /// Number of athletes to show in the ranking
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TOP,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    top: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,regatta_prestige=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Settings every command needs, validated up front
struct Prepared {
    config: Config,
    fetch: FetchSettings,
    scoring: ScoringConfig,
    filter: Option<FilterConfig>,
}

fn prepare(cli: &Cli) -> Prepared {
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let config = match regatta_prestige::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let fetch_config = config.fetch.clone().unwrap_or_default();
    if let Err(errors) = regatta_prestige::config::validate_fetch(&fetch_config) {
        eprintln!("Fetch config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }
    let fetch = match fetch_config.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let scoring = config.scoring.clone().unwrap_or_default();
    if let Err(errors) = regatta_prestige::scoring::validate_scoring(&scoring) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let filter = match (&config.filter, cli.filter) {
        (Some(filter), _) => Some(filter.clone()),
        (None, true) => Some(FilterConfig::default()),
        (None, false) => None,
    };

    Prepared {
        config,
        fetch,
        scoring,
        filter,
    }
}

fn create_transport(settings: &FetchSettings) -> HttpTransport {
    match regatta_prestige::regatta::create_client(settings) {
        Ok(client) => HttpTransport::new(client),
        Err(e) => {
            eprintln!("Failed to create HTTP client: {:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    }
}

/// Load the listing page from `--listing` or the config
async fn load_listing_html(cli: &Cli, prepared: &Prepared, transport: &HttpTransport) -> String {
    let Some(source) = cli.listing.clone().or_else(|| prepared.config.listing.clone()) else {
        eprintln!("No results listing configured.");
        eprintln!("Pass --listing <URL or file> or add it to ~/.config/regatta-prestige/config.yaml:");
        eprintln!("  listing: \"https://www.regattacentral.com/regatta/results2?job_id=9168\"");
        std::process::exit(EXIT_CONFIG);
    };

    match listing::load_listing(
        transport,
        &source,
        &prepared.fetch.retry,
        prepared.fetch.event_timeout,
    )
    .await
    {
        Ok(html) => html,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(EXIT_NETWORK);
        }
    }
}

fn print_ranking(scores: &[AthleteScore], top: u64) {
    let use_colors = regatta_prestige::output::should_use_colors();
    let top = usize::try_from(top).unwrap_or(usize::MAX);
    let shown = &scores[..scores.len().min(top)];
    println!("{}", regatta_prestige::output::format_ranking(shown, use_colors));
}

fn print_summary(report: &RunReport, scored: usize, start_time: Instant) {
    eprintln!();
    eprintln!(
        "Events: {} fetched, {} skipped of {}",
        report.events_parsed,
        report.skipped.len(),
        report.events_total
    );
    for skipped in &report.skipped {
        eprintln!("  skipped {}: {}", skipped.event, skipped.reason);
    }
    eprintln!(
        "Lineups fetched: {}, rows: {} ({} without crew, {} unfinished or disqualified)",
        report.lineups_fetched, report.rows, report.dropped_rows, report.excluded_rows
    );
    if report.duplicates > 0 {
        eprintln!("Duplicate entries ignored: {}", report.duplicates);
    }
    eprintln!(
        "Athletes: {} recorded, {} scored in {:?}",
        report.athletes,
        scored,
        start_time.elapsed()
    );
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start_time = Instant::now();
    let prepared = prepare(&cli);
    let athletes_path = cli
        .athletes
        .clone()
        .unwrap_or_else(|| prepared.config.athletes_path());
    let prestige_path = cli
        .prestige
        .clone()
        .unwrap_or_else(|| prepared.config.prestige_path());

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => {
            let transport = create_transport(&prepared.fetch);
            let endpoints = Endpoints::new(prepared.config.base_url());
            let html = load_listing_html(&cli, &prepared, &transport).await;
            let events = listing::extract_event_refs(&html);

            if events.is_empty() {
                eprintln!("No events found in the results listing.");
                std::process::exit(EXIT_NETWORK);
            }
            tracing::info!(events = events.len(), "discovered events");

            let outcome = match regatta_prestige::fetch::fetch_and_aggregate(
                &transport,
                &endpoints,
                &events,
                &prepared.fetch,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_NETWORK);
                }
            };

            let (records, scores) = regatta_prestige::fetch::filter_and_score(
                outcome.records,
                &prepared.scoring,
                prepared.filter.as_ref(),
            );

            if let Err(e) = regatta_prestige::output::save_athletes(&athletes_path, &records) {
                eprintln!("{:#}", e);
                std::process::exit(EXIT_OUTPUT);
            }
            if let Err(e) = regatta_prestige::output::save_prestige(&prestige_path, &scores) {
                eprintln!("{:#}", e);
                std::process::exit(EXIT_OUTPUT);
            }

            print_ranking(&scores, cli.top);
            print_summary(&outcome.report, scores.len(), start_time);
            eprintln!(
                "Wrote {} and {}",
                athletes_path.display(),
                prestige_path.display()
            );
        }
        Commands::Score { input } => {
            let records = match regatta_prestige::output::load_athletes(&input) {
                Ok(records) => records,
                Err(e) => {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            let loaded = records.len();
            let (_, scores) = regatta_prestige::fetch::filter_and_score(
                records,
                &prepared.scoring,
                prepared.filter.as_ref(),
            );

            if let Err(e) = regatta_prestige::output::save_prestige(&prestige_path, &scores) {
                eprintln!("{:#}", e);
                std::process::exit(EXIT_OUTPUT);
            }

            print_ranking(&scores, cli.top);
            eprintln!();
            eprintln!(
                "Scored {} of {} athletes in {:?}, wrote {}",
                scores.len(),
                loaded,
                start_time.elapsed(),
                prestige_path.display()
            );
        }
        Commands::Events => {
            let transport = create_transport(&prepared.fetch);
            let endpoints = Endpoints::new(prepared.config.base_url());
            let html = load_listing_html(&cli, &prepared, &transport).await;
            let events = listing::extract_event_links(&html, &endpoints);
            for (event, url) in &events {
                println!("{}\t{}", event, url);
            }
            if cli.verbose {
                eprintln!("Total: {} events", events.len());
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_defaults_and_rejects_zero() {
        let cli = Cli::try_parse_from(["regatta-prestige"]).unwrap();
        assert_eq!(cli.top, DEFAULT_TOP);
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["regatta-prestige", "run", "--top", "3"]).unwrap();
        assert_eq!(cli.top, 3);

        assert!(Cli::try_parse_from(["regatta-prestige", "--top", "0"]).is_err());
    }

    #[test]
    fn test_score_subcommand_takes_input() {
        let cli = Cli::try_parse_from(["regatta-prestige", "score", "athletes.csv", "--filter"]).unwrap();
        assert!(cli.filter);
        match cli.command {
            Some(Commands::Score { input }) => assert_eq!(input, PathBuf::from("athletes.csv")),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
