#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `footprint`: command-line entry point for the emission engine.
//!
//! Uses `indicatif-log-bridge` (via [`footprint_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod input;

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use footprint_calc::{
    BatchOptions, CalcConfig, EmissionEngine, EmissionStore, StoredActivity,
    recalculate_for_subjects,
};
use footprint_calc_models::{EmissionResult, SubjectId};
use footprint_cli_utils::IndicatifProgress;
use footprint_database::{FootprintDb, activities, factors, seed};
use footprint_factor::{FactorCatalogWriter, FactorQuery};
use footprint_factor_models::{ClassValue, EmissionType, Factor};

#[derive(Parser)]
#[command(name = "footprint", about = "Greenhouse-gas emission engine")]
struct Cli {
    /// `DuckDB` file (defaults to `$FOOTPRINT_DB`, then `data/footprint.duckdb`)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Calculation settings TOML; environment overrides still apply
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Migrate,
    /// Load the embedded seed factors and reference locations
    Seed,
    /// List catalog factors
    Factors {
        /// Only factors of this emission type (e.g., `train`)
        #[arg(long = "type")]
        emission_type: Option<EmissionType>,
        /// Include superseded versions
        #[arg(long)]
        all: bool,
    },
    /// Resolve the factor that applies to a classification
    Resolve {
        /// Emission type to resolve (e.g., `equipment`)
        #[arg(long = "type")]
        emission_type: EmissionType,
        /// Key every candidate must match, as `key=value`
        #[arg(long, value_parser = input::parse_key_value)]
        require: Vec<(String, ClassValue)>,
        /// Key that makes a candidate more specific, as `key=value`
        #[arg(long, value_parser = input::parse_key_value)]
        refine: Vec<(String, ClassValue)>,
        /// Resolve against factors valid at this time (RFC 3339)
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
    /// Store activity records from a TOML file of `[[activities]]`
    AddActivity {
        /// Path to the activity file
        file: PathBuf,
        /// Recalculate the added subjects right away
        #[arg(long)]
        recalculate: bool,
    },
    /// Recalculate and store emissions for subjects
    Recalculate {
        /// Subject ids to recalculate
        subject_ids: Vec<SubjectId>,
        /// Recalculate every subject with an activity record
        #[arg(long, conflicts_with = "subject_ids")]
        all: bool,
        /// Subjects per chunk
        #[arg(long, default_value_t = footprint_calc::batch::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Fail instead of skipping subjects whose factors are missing
        #[arg(long)]
        require_complete: bool,
        /// Use factors valid at this time (RFC 3339) instead of current ones
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
    /// Show the current emission rows of a subject
    Current {
        subject_id: SubjectId,
        /// Print full rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every emission row of a subject, oldest first
    History {
        subject_id: SubjectId,
        /// Print full rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the current factor of a slot with a new version from a TOML
    /// file containing a `[factor]` table
    Supersede {
        /// Path to the factor draft
        file: PathBuf,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = footprint_cli_utils::init_logger(log::LevelFilter::Info);
    let cli = Cli::parse();

    let mut db = match &cli.db {
        Some(path) => FootprintDb::open(path)?,
        None => FootprintDb::open_default()?,
    };

    match cli.command {
        Commands::Migrate => {
            log::info!("Database schema is up to date.");
        }
        Commands::Seed => {
            let summary = seed::seed_reference_data(&db)?;
            println!(
                "{} factor(s) added, {} already present, {} location(s)",
                summary.factors_inserted, summary.factors_skipped, summary.locations
            );
        }
        Commands::Factors { emission_type, all } => {
            let rows: Vec<Factor> = factors::load_factors(db.connection(), emission_type)?
                .into_iter()
                .filter(|f| all || f.is_current())
                .collect();
            print_factors(&rows)?;
        }
        Commands::Resolve {
            emission_type,
            require,
            refine,
            as_of,
        } => {
            let config = CalcConfig::load(cli.config.as_deref())?;
            let query = require
                .into_iter()
                .fold(FactorQuery::new(emission_type), |q, (k, v)| q.require(&k, v));
            let query = refine.into_iter().fold(query, |q, (k, v)| q.refine(&k, v));

            let engine = EmissionEngine::new(&db, &db, &config).at(as_of);
            let resolution = engine.resolve_required(query)?;
            print_factors(std::slice::from_ref(&resolution.factor))?;
            if resolution.fallback {
                println!(
                    "(fallback: matched {} key(s) of the query)",
                    resolution.matched_keys
                );
            }
            if resolution.is_ambiguous() {
                println!("(ambiguous: also matched {:?})", resolution.ambiguous_with);
            }
        }
        Commands::AddActivity { file, recalculate } => {
            let records = input::read_activities(&file)?;
            let mut ids = Vec::with_capacity(records.len());
            for record in &records {
                let stored = StoredActivity::from_record(record)?;
                activities::upsert_activity(db.connection(), &stored)?;
                ids.push(record.subject_id);
            }
            log::info!(
                "Stored {} activity record(s) from {}",
                ids.len(),
                file.display()
            );

            if recalculate {
                let config = CalcConfig::load(cli.config.as_deref())?;
                let options = BatchOptions::default();
                recalculate_and_report(&db, &config, &ids, &options, None, &multi)?;
            }
        }
        Commands::Recalculate {
            subject_ids,
            all,
            chunk_size,
            require_complete,
            as_of,
        } => {
            let config = CalcConfig::load(cli.config.as_deref())?;
            let ids = if all {
                activities::subject_ids(db.connection())?
            } else {
                subject_ids
            };
            if ids.is_empty() {
                return Err("No subjects to recalculate (pass ids or --all)".into());
            }
            let options = BatchOptions {
                chunk_size,
                require_complete,
            };
            recalculate_and_report(&db, &config, &ids, &options, as_of, &multi)?;
        }
        Commands::Current { subject_id, json } => {
            print_emissions(&db.current(subject_id)?, json)?;
        }
        Commands::History { subject_id, json } => {
            print_emissions(&db.history(subject_id)?, json)?;
        }
        Commands::Supersede { file } => {
            let draft = input::read_draft(&file)?;
            let outcome = db.supersede_factor(&draft)?;
            println!(
                "Factor {} is now current for {} {} (retired: {:?})",
                outcome.inserted.id,
                outcome.inserted.emission_type,
                outcome.inserted.classification,
                outcome.retired
            );
        }
    }

    Ok(())
}

fn recalculate_and_report(
    db: &FootprintDb,
    config: &CalcConfig,
    ids: &[SubjectId],
    options: &BatchOptions,
    as_of: Option<DateTime<Utc>>,
    multi: &footprint_cli_utils::MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let engine = EmissionEngine::new(db, db, config).at(as_of);
    let progress = IndicatifProgress::subjects_bar(multi, "Recalculating emissions");

    let report = recalculate_for_subjects(&engine, db, db, ids, options, progress.as_ref())?;

    for result in &report.incomplete {
        if let Some(message) = result.incomplete_message() {
            println!("{message}");
        }
    }
    for invalid in &report.invalid {
        println!("subject {}: {}", invalid.subject_id, invalid.message);
    }
    if !report.missing_subjects.is_empty() {
        println!("no activity for subject(s) {:?}", report.missing_subjects);
    }

    log::info!(
        "{} subject(s) processed in {:.1}s",
        ids.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn print_factors(rows: &[Factor]) -> Result<(), serde_json::Error> {
    println!(
        "{:<6} {:<16} {:<26} {:<26} CLASSIFICATION / VALUES",
        "ID", "TYPE", "VALID FROM", "VALID TO"
    );
    println!("{}", "-".repeat(110));
    for factor in rows {
        println!(
            "{:<6} {:<16} {:<26} {:<26} {} {}",
            factor.id,
            factor.emission_type,
            factor.valid_from.to_rfc3339(),
            factor
                .valid_to
                .map_or_else(|| "current".to_string(), |t| t.to_rfc3339()),
            factor.classification,
            serde_json::to_string(&factor.values)?,
        );
    }
    Ok(())
}

fn print_emissions(rows: &[EmissionResult], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    println!(
        "{:<14} {:>12} {:>12} {:<22} {:<8} COMPUTED AT",
        "TYPE", "KG CO2EQ", "DISTANCE KM", "FORMULA", "CURRENT"
    );
    println!("{}", "-".repeat(100));
    for row in rows {
        println!(
            "{:<14} {:>12} {:>12} {:<22} {:<8} {}",
            row.emission_type,
            row.kg_co2eq.map_or_else(|| "-".to_string(), |kg| format!("{kg:.2}")),
            row.distance_km.map_or_else(|| "-".to_string(), |km| format!("{km:.2}")),
            row.formula_version,
            if row.is_current { "yes" } else { "no" },
            row.computed_at.to_rfc3339(),
        );
    }
    Ok(())
}
