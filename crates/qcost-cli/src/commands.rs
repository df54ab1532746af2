//! One function per subcommand. Each returns once its output is printed.

use std::{io::Read as _, path::Path};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use qcost_core::{
  CostEngine, EngineConfig, SubmitTarget,
  analytics::{detect_anomalies, monthly_trend, part_leaders, vehicle_breakdown},
  catalog::Catalogs,
  draft::CostDraft,
  record::CostRecord,
  report::{copq_summary, party_distribution},
  store::{CatalogStore, CostStore, RecordQuery},
  submit,
};
use qcost_store_sqlite::SqliteStore;
use serde::{Serialize, de::DeserializeOwned};
use tracing::info;
use uuid::Uuid;

/// Read JSON from `path`, or from stdin when `path` is `-`.
fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
  let raw = if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("reading stdin")?;
    buf
  } else {
    std::fs::read_to_string(path)
      .with_context(|| format!("reading {}", path.display()))?
  };
  serde_json::from_str(&raw)
    .with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn engine(store: &SqliteStore, config: EngineConfig) -> anyhow::Result<CostEngine> {
  let catalogs = store
    .load_catalogs()
    .await
    .context("failed to load catalogs")?;
  Ok(CostEngine::with_config(catalogs, config))
}

/// Every stored record, for the reports.
async fn all_records(
  store: &SqliteStore,
  query: RecordQuery,
) -> anyhow::Result<Vec<CostRecord>> {
  store
    .list_records(&RecordQuery { limit: None, offset: None, ..query })
    .await
    .context("failed to list records")
}

// ─── Catalogs ────────────────────────────────────────────────────────────────

pub async fn catalog_import(store: &SqliteStore, file: &Path) -> anyhow::Result<()> {
  let catalogs: Catalogs = read_json(file)?;
  catalogs
    .validate()
    .with_context(|| format!("{} was not imported", file.display()))?;
  let (units, materials, suppliers) = (
    catalogs.unit_costs.len(),
    catalogs.material_costs.len(),
    catalogs.suppliers.len(),
  );

  for rate in catalogs.unit_costs {
    store.put_unit_rate(rate).await?;
  }
  for rate in catalogs.material_costs {
    store.put_material_rate(rate).await?;
  }
  for supplier in catalogs.suppliers {
    store.put_supplier(supplier).await?;
  }

  info!(units, materials, suppliers, "catalogs imported");
  Ok(())
}

pub async fn catalog_show(store: &SqliteStore) -> anyhow::Result<()> {
  print_json(&store.load_catalogs().await?)
}

// ─── Drafts ──────────────────────────────────────────────────────────────────

/// Print the breakdown of a draft and whether it would be accepted.
/// Exits non-zero when the draft is invalid.
pub async fn evaluate(
  store: &SqliteStore,
  config: EngineConfig,
  file: &Path,
) -> anyhow::Result<()> {
  let draft: CostDraft = read_json(file)?;
  let evaluation = engine(store, config).await?.evaluate(&draft);

  let verdict = match &evaluation.outcome {
    Ok(()) => serde_json::json!({ "valid": true }),
    Err(e) => serde_json::json!({
      "valid": false,
      "kind": e.kind(),
      "message": e.to_string(),
    }),
  };
  print_json(&serde_json::json!({
    "breakdown": evaluation.breakdown,
    "validation": verdict,
  }))?;

  if let Err(e) = evaluation.outcome {
    bail!("draft is not valid: {e}");
  }
  Ok(())
}

pub async fn submit_draft(
  store: &SqliteStore,
  config: EngineConfig,
  file: &Path,
  update: Option<Uuid>,
) -> anyhow::Result<()> {
  let draft: CostDraft = read_json(file)?;
  let engine = engine(store, config).await?;
  let target = update.map_or(SubmitTarget::Insert, SubmitTarget::Update);
  let record = submit(store, &engine, draft, target).await?;
  print_json(&record)
}

// ─── Records ─────────────────────────────────────────────────────────────────

pub async fn show(store: &SqliteStore, id: Uuid) -> anyhow::Result<()> {
  match store.get_record(id).await? {
    Some(record) => print_json(&record),
    None => bail!("no cost record with id {id}"),
  }
}

pub async fn list(store: &SqliteStore, query: RecordQuery) -> anyhow::Result<()> {
  let records = store
    .list_records(&query)
    .await
    .context("failed to list records")?;

  for r in &records {
    println!(
      "{}  {}  {:<28} {:>12.2}",
      r.record_id,
      r.data.cost_date,
      r.category().as_str(),
      r.amount()
    );
  }
  Ok(())
}

// ─── Reports ─────────────────────────────────────────────────────────────────

pub async fn report_copq(
  store: &SqliteStore,
  query: RecordQuery,
  vehicles: Option<u64>,
) -> anyhow::Result<()> {
  let records = all_records(store, query).await?;
  print_json(&copq_summary(&records, vehicles))
}

pub async fn report_parties(
  store: &SqliteStore,
  query: RecordQuery,
) -> anyhow::Result<()> {
  let records = all_records(store, query).await?;
  let catalogs = store.load_catalogs().await?;

  for row in party_distribution(&records, &catalogs) {
    println!(
      "{:<32} {:>12.2} {:>6.1}%  ({} entries)",
      row.label, row.total, row.percentage, row.count
    );
  }
  Ok(())
}

pub async fn report_trend(
  store: &SqliteStore,
  query: RecordQuery,
  months: u32,
  as_of: NaiveDate,
) -> anyhow::Result<()> {
  let records = all_records(store, query).await?;
  print_json(&monthly_trend(&records, as_of, months))
}

pub async fn report_anomalies(
  store: &SqliteStore,
  query: RecordQuery,
  as_of: NaiveDate,
) -> anyhow::Result<()> {
  let records = all_records(store, query).await?;
  let anomalies = detect_anomalies(&records, as_of);
  if anomalies.is_empty() {
    info!(month = %qcost_core::analytics::Month::of(as_of), "no cost anomalies");
  }
  print_json(&anomalies)
}

pub async fn report_parts(
  store: &SqliteStore,
  query: RecordQuery,
  limit: usize,
) -> anyhow::Result<()> {
  let records = all_records(store, query).await?;

  for part in part_leaders(&records, limit) {
    println!(
      "{:>3}. {:<20} {:>12.2}  ({} records)  {}",
      part.rank,
      part.part_code,
      part.total,
      part.count,
      part.part_name.as_deref().unwrap_or("-")
    );
  }
  Ok(())
}

pub async fn report_vehicles(
  store: &SqliteStore,
  query: RecordQuery,
) -> anyhow::Result<()> {
  let records = all_records(store, query).await?;
  print_json(&vehicle_breakdown(&records))
}
