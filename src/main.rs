mod batch;
mod browser;
mod config;
mod criteria;
mod db;
mod error;
mod parser;
mod runlog;
mod scraper;
mod throttle;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::batch::BatchRunner;
use crate::browser::ChromiumLauncher;
use crate::config::{Filters, Settings};
use crate::criteria::{DateRange, SearchCriteria};
use crate::runlog::RunLog;
use crate::scraper::ListScraper;
use crate::throttle::RandomThrottle;

#[derive(Parser)]
#[command(name = "npr_scraper", about = "Sheep registry pedigree & EBV scraper")]
struct Cli {
    /// Settings file (TOML); NPR__* environment variables override it
    #[arg(short, long, global = true, default_value = "npr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database table
    Init,
    /// Scrape every date range in a CSV and append the animals to the database
    Run {
        /// CSV with born_after,born_before columns (MM/DD/YYYY or empty)
        #[arg(short, long)]
        dates: PathBuf,
        /// Run log, one line appended per finished range
        #[arg(short, long)]
        log: PathBuf,
        /// Skip ranges already present in the run log. Keep one log per
        /// breed/group/gender; resuming a log written for other filters fails
        #[arg(long)]
        resume: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List animal IDs for one date range without visiting detail pages
    Ids {
        #[arg(long, default_value = "")]
        born_after: String,
        #[arg(long, default_value = "")]
        born_before: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show row counts
    Stats,
}

/// Overrides for the search filters in the settings file.
#[derive(Args)]
struct FilterArgs {
    /// Breed option value (e.g. object31 = Dorset)
    #[arg(long)]
    breed: Option<String>,
    /// Breed group option value (e.g. object:29 = Terminal)
    #[arg(long)]
    breed_group: Option<String>,
    /// 0 = both, 1 = male, 2 = female
    #[arg(long)]
    gender: Option<String>,
}

impl FilterArgs {
    fn apply(self, filters: &mut Filters) {
        if let Some(v) = self.breed {
            filters.breed = v;
        }
        if let Some(v) = self.breed_group {
            filters.breed_group = v;
        }
        if let Some(v) = self.gender {
            filters.gender = v;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn, &settings.table)?;
            println!(
                "Table '{}' ready in {}",
                settings.table,
                settings.db_path.display()
            );
            Ok(())
        }
        Commands::Run {
            dates,
            log,
            resume,
            filters,
        } => {
            filters.apply(&mut settings.filters);
            let ranges = criteria::load_date_ranges(&dates)
                .with_context(|| format!("Failed to load date ranges from {}", dates.display()))?;
            if ranges.is_empty() {
                println!("No date ranges in {}.", dates.display());
                return Ok(());
            }

            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn, &settings.table)?;
            let run_log = RunLog::new(log);

            println!(
                "Scraping {} date ranges (log: {})...",
                ranges.len(),
                run_log.path().display()
            );
            let summary = BatchRunner {
                settings: &settings,
                launcher: &ChromiumLauncher,
                throttle: &RandomThrottle,
                conn: &conn,
                log: &run_log,
                resume,
            }
            .run(&ranges)
            .await?;

            println!(
                "Done: {} ranges scraped ({} skipped), {} animals written.",
                summary.ranges_done, summary.ranges_skipped, summary.animals
            );
            Ok(())
        }
        Commands::Ids {
            born_after,
            born_before,
            filters,
        } => {
            filters.apply(&mut settings.filters);
            let criteria =
                SearchCriteria::new(&settings.filters, &DateRange::new(born_after, born_before));
            let ids = ListScraper {
                launcher: &ChromiumLauncher,
                throttle: &RandomThrottle,
                site: &settings.site,
                page_pause: settings.throttle.page,
                headless: settings.list_headless,
            }
            .collect_identifiers(&criteria)
            .await?;

            for id in &ids {
                println!("{}", id);
            }
            println!("\n{} animals found", ids.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn, &settings.table)?;
            let s = db::get_stats(&conn, &settings.table)?;
            println!("Rows:        {}", s.total);
            println!("Distinct ID: {}", s.distinct_ids);
            if !s.by_breed.is_empty() {
                println!("\n--- By breed ---");
                for (breed, n) in &s.by_breed {
                    println!("  {:<24} {:>7}", breed, n);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
