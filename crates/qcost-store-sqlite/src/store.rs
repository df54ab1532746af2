//! [`SqliteStore`], the SQLite implementation of [`CostStore`] and
//! [`CatalogStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use qcost_core::{
  catalog::{Catalogs, MaterialCostRate, Supplier, UnitCostRate},
  record::{CostRecord, NewCostRecord},
  store::{CatalogStore, CostStore, RecordQuery},
};

use crate::{
  encode::{
    RawCostRecord, RawSupplier, decode_dt, encode_category, encode_date,
    encode_dt, encode_payload, encode_uuid, material_rate_from_row, unit_rate_from_row,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A quality-cost store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Column values shared by insert and update.
struct RecordColumns {
  category:    &'static str,
  cost_date:   String,
  unit:        Option<String>,
  supplier_id: Option<String>,
  amount:      f64,
  payload:     String,
}

impl RecordColumns {
  fn of(record: &NewCostRecord) -> Result<Self> {
    Ok(Self {
      category:    encode_category(record.category),
      cost_date:   encode_date(record.cost_date),
      unit:        record.unit.clone(),
      supplier_id: record.source.supplier_id().map(encode_uuid),
      amount:      record.amount,
      payload:     encode_payload(record)?,
    })
  }
}

// ─── CostStore impl ──────────────────────────────────────────────────────────

impl CostStore for SqliteStore {
  type Error = Error;

  async fn insert_record(&self, record: NewCostRecord) -> Result<CostRecord> {
    let now = Utc::now();
    let stored = CostRecord {
      record_id:   Uuid::new_v4(),
      recorded_at: now,
      updated_at:  now,
      data:        record,
    };

    let cols   = RecordColumns::of(&stored.data)?;
    let id_str = encode_uuid(stored.record_id);
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cost_records (
             record_id, recorded_at, updated_at, category, cost_date,
             unit, supplier_id, amount, payload_json
           ) VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            at_str,
            cols.category,
            cols.cost_date,
            cols.unit,
            cols.supplier_id,
            cols.amount,
            cols.payload,
          ],
        )?;
        Ok(())
      })
      .await?;

    debug!(record_id = %stored.record_id, "inserted cost record");
    Ok(stored)
  }

  async fn update_record(
    &self,
    id:     Uuid,
    record: NewCostRecord,
  ) -> Result<CostRecord> {
    let now    = Utc::now();
    let cols   = RecordColumns::of(&record)?;
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now);

    let recorded_at: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let recorded_at: Option<String> = tx
          .query_row(
            "SELECT recorded_at FROM cost_records WHERE record_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;

        if recorded_at.is_some() {
          tx.execute(
            "UPDATE cost_records SET
               updated_at = ?2, category = ?3, cost_date = ?4, unit = ?5,
               supplier_id = ?6, amount = ?7, payload_json = ?8
             WHERE record_id = ?1",
            rusqlite::params![
              id_str,
              at_str,
              cols.category,
              cols.cost_date,
              cols.unit,
              cols.supplier_id,
              cols.amount,
              cols.payload,
            ],
          )?;
        }
        tx.commit()?;
        Ok(recorded_at)
      })
      .await?;

    let Some(recorded_at) = recorded_at else {
      return Err(Error::RecordNotFound(id));
    };

    debug!(record_id = %id, "updated cost record");
    Ok(CostRecord {
      record_id:   id,
      recorded_at: decode_dt(&recorded_at)?,
      updated_at:  now,
      data:        record,
    })
  }

  async fn get_record(&self, id: Uuid) -> Result<Option<CostRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCostRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM cost_records WHERE record_id = ?1",
          RawCostRecord::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawCostRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCostRecord::into_record).transpose()
  }

  async fn list_records(&self, query: &RecordQuery) -> Result<Vec<CostRecord>> {
    let category_str = query.category.map(encode_category);
    let supplier_str = query.supplier_id.map(encode_uuid);
    let from_str     = query.from.map(encode_date);
    let until_str    = query.until.map(encode_date);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val    = query.limit.map(|l| l as i64).unwrap_or(-1);
    let offset_val   = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawCostRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM cost_records
           WHERE (?1 IS NULL OR category    =  ?1)
             AND (?2 IS NULL OR supplier_id =  ?2)
             AND (?3 IS NULL OR cost_date   >= ?3)
             AND (?4 IS NULL OR cost_date   <= ?4)
           ORDER BY cost_date DESC, recorded_at DESC
           LIMIT ?5 OFFSET ?6",
          RawCostRecord::COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              category_str,
              supplier_str,
              from_str,
              until_str,
              limit_val,
              offset_val,
            ],
            RawCostRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCostRecord::into_record).collect()
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  async fn load_catalogs(&self) -> Result<Catalogs> {
    let (unit_costs, material_costs, raw_suppliers) = self
      .conn
      .call(|conn| {
        let units = conn
          .prepare("SELECT unit_name, cost_per_minute FROM unit_costs ORDER BY unit_name")?
          .query_map([], unit_rate_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let materials = conn
          .prepare(
            "SELECT material_name, purchase_price_per_kg, scrap_price_per_kg
             FROM material_costs ORDER BY material_name",
          )?
          .query_map([], material_rate_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let suppliers = conn
          .prepare("SELECT supplier_id, name, status FROM suppliers ORDER BY name")?
          .query_map([], |row| {
            Ok(RawSupplier {
              supplier_id: row.get(0)?,
              name:        row.get(1)?,
              status:      row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((units, materials, suppliers))
      })
      .await?;

    let suppliers = raw_suppliers
      .into_iter()
      .map(RawSupplier::into_supplier)
      .collect::<Result<_>>()?;

    Ok(Catalogs { unit_costs, material_costs, suppliers })
  }

  async fn put_unit_rate(&self, rate: UnitCostRate) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO unit_costs (unit_name, cost_per_minute) VALUES (?1, ?2)
           ON CONFLICT(unit_name) DO UPDATE SET cost_per_minute = excluded.cost_per_minute",
          rusqlite::params![rate.unit_name, rate.cost_per_minute],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn put_material_rate(&self, rate: MaterialCostRate) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO material_costs
             (material_name, purchase_price_per_kg, scrap_price_per_kg)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(material_name) DO UPDATE SET
             purchase_price_per_kg = excluded.purchase_price_per_kg,
             scrap_price_per_kg    = excluded.scrap_price_per_kg",
          rusqlite::params![
            rate.material_name,
            rate.purchase_price_per_kg,
            rate.scrap_price_per_kg,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn put_supplier(&self, supplier: Supplier) -> Result<()> {
    let id_str     = encode_uuid(supplier.supplier_id);
    let status_str = supplier.status.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO suppliers (supplier_id, name, status) VALUES (?1, ?2, ?3)
           ON CONFLICT(supplier_id) DO UPDATE SET
             name = excluded.name, status = excluded.status",
          rusqlite::params![id_str, supplier.name, status_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
