//! `qcost`: record and report quality costs.
//!
//! # Usage
//!
//! ```
//! qcost catalog import catalogs.json
//! qcost evaluate draft.json
//! qcost submit draft.json
//! qcost report copq --vehicles 120
//! qcost report trend --months 12
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use qcost_core::{analytics::TOP_PARTS, category::CostCategory, store::RecordQuery};
use qcost_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::AppConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "qcost", author, version, about = "Quality cost recording and reporting")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "qcost.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Manage unit, material and supplier catalogs.
  #[command(subcommand)]
  Catalog(CatalogCommand),

  /// Compute and validate a JSON draft without saving it.
  Evaluate {
    /// Draft file, or `-` for stdin.
    draft: PathBuf,
  },

  /// Validate a JSON draft and save it as a cost record.
  Submit {
    /// Draft file, or `-` for stdin.
    draft:  PathBuf,
    /// Replace the record with this id instead of creating one.
    #[arg(long, value_name = "ID")]
    update: Option<Uuid>,
  },

  /// Print one stored record as JSON.
  Show { id: Uuid },

  /// List stored records, newest cost date first.
  List {
    #[command(flatten)]
    filter: Filter,

    #[arg(long)]
    limit: Option<usize>,
  },

  /// Summaries over stored records.
  #[command(subcommand)]
  Report(ReportCommand),
}

#[derive(Subcommand)]
enum CatalogCommand {
  /// Upsert every entry of a JSON catalogs file.
  Import { file: PathBuf },
  /// Print the stored catalogs as JSON.
  Show,
}

#[derive(Subcommand)]
enum ReportCommand {
  /// Cost of poor quality by group.
  Copq {
    #[command(flatten)]
    filter:   Filter,
    /// Vehicles produced in the period, for cost per vehicle.
    #[arg(long)]
    vehicles: Option<u64>,
  },
  /// Costs attributed to each responsible unit or supplier.
  Parties {
    #[command(flatten)]
    filter: Filter,
  },
  /// Monthly totals and the direction of the last three months.
  Trend {
    #[command(flatten)]
    filter: Filter,
    #[arg(long, default_value_t = 6)]
    months: u32,
    /// Last month of the window (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    as_of:  Option<NaiveDate>,
  },
  /// Months that moved 50 % or more, overall and per unit.
  Anomalies {
    #[command(flatten)]
    filter: Filter,
    /// Month to check (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    as_of:  Option<NaiveDate>,
  },
  /// The most expensive part codes.
  Parts {
    #[command(flatten)]
    filter: Filter,
    #[arg(long, default_value_t = TOP_PARTS)]
    limit:  usize,
  },
  /// Scrap, rework and rejection figures per vehicle type.
  Vehicles {
    #[command(flatten)]
    filter: Filter,
  },
}

#[derive(clap::Args)]
struct Filter {
  #[arg(long, value_parser = parse_category)]
  category: Option<CostCategory>,
  #[arg(long, value_name = "ID")]
  supplier: Option<Uuid>,
  /// First cost date included (YYYY-MM-DD).
  #[arg(long)]
  from:     Option<NaiveDate>,
  /// Last cost date included (YYYY-MM-DD).
  #[arg(long)]
  until:    Option<NaiveDate>,
}

impl Filter {
  fn into_query(self, limit: Option<usize>) -> RecordQuery {
    RecordQuery {
      category: self.category,
      supplier_id: self.supplier,
      from: self.from,
      until: self.until,
      limit,
      offset: None,
    }
  }
}

fn parse_category(s: &str) -> Result<CostCategory, String> {
  CostCategory::parse(s).ok_or_else(|| {
    let known: Vec<&str> = CostCategory::ALL.iter().map(|c| c.as_str()).collect();
    format!("unknown category {s:?}; expected one of {}", known.join(", "))
  })
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
  date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let app_cfg = AppConfig::load(&cli.config)?;
  let engine_cfg = app_cfg.engine();

  let store_path = app_cfg.resolved_store_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Catalog(CatalogCommand::Import { file }) => {
      commands::catalog_import(&store, &file).await
    }
    Command::Catalog(CatalogCommand::Show) => commands::catalog_show(&store).await,
    Command::Evaluate { draft } => {
      commands::evaluate(&store, engine_cfg, &draft).await
    }
    Command::Submit { draft, update } => {
      commands::submit_draft(&store, engine_cfg, &draft, update).await
    }
    Command::Show { id } => commands::show(&store, id).await,
    Command::List { filter, limit } => {
      commands::list(&store, filter.into_query(limit)).await
    }
    Command::Report(ReportCommand::Copq { filter, vehicles }) => {
      commands::report_copq(&store, filter.into_query(None), vehicles).await
    }
    Command::Report(ReportCommand::Parties { filter }) => {
      commands::report_parties(&store, filter.into_query(None)).await
    }
    Command::Report(ReportCommand::Trend { filter, months, as_of }) => {
      commands::report_trend(&store, filter.into_query(None), months, today_or(as_of))
        .await
    }
    Command::Report(ReportCommand::Anomalies { filter, as_of }) => {
      commands::report_anomalies(&store, filter.into_query(None), today_or(as_of))
        .await
    }
    Command::Report(ReportCommand::Parts { filter, limit }) => {
      commands::report_parts(&store, filter.into_query(None), limit).await
    }
    Command::Report(ReportCommand::Vehicles { filter }) => {
      commands::report_vehicles(&store, filter.into_query(None)).await
    }
  }
}
