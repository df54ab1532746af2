//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, cost dates are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase strings. The record payload is compact JSON.

use chrono::{DateTime, NaiveDate, Utc};
use qcost_core::{
  catalog::{MaterialCostRate, Supplier, SupplierStatus, UnitCostRate},
  category::CostCategory,
  record::{CostRecord, NewCostRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_category(c: CostCategory) -> &'static str { c.as_str() }

pub fn decode_status(s: &str) -> Result<SupplierStatus> {
  SupplierStatus::parse(s).ok_or_else(|| Error::UnknownValue {
    column: "status",
    value:  s.to_owned(),
  })
}

// ─── Payload ─────────────────────────────────────────────────────────────────

pub fn encode_payload(record: &NewCostRecord) -> Result<String> {
  Ok(serde_json::to_string(record)?)
}

pub fn decode_payload(s: &str) -> Result<NewCostRecord> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `cost_records` row.
pub struct RawCostRecord {
  pub record_id:    String,
  pub recorded_at:  String,
  pub updated_at:   String,
  pub payload_json: String,
}

impl RawCostRecord {
  pub const COLUMNS: &'static str = "record_id, recorded_at, updated_at, payload_json";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:    row.get(0)?,
      recorded_at:  row.get(1)?,
      updated_at:   row.get(2)?,
      payload_json: row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<CostRecord> {
    Ok(CostRecord {
      record_id:   decode_uuid(&self.record_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
      data:        decode_payload(&self.payload_json)?,
    })
  }
}

/// Raw values read from a `suppliers` row.
pub struct RawSupplier {
  pub supplier_id: String,
  pub name:        String,
  pub status:      String,
}

impl RawSupplier {
  pub fn into_supplier(self) -> Result<Supplier> {
    Ok(Supplier {
      supplier_id: decode_uuid(&self.supplier_id)?,
      name:        self.name,
      status:      decode_status(&self.status)?,
    })
  }
}

pub fn unit_rate_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UnitCostRate> {
  Ok(UnitCostRate {
    unit_name:       row.get(0)?,
    cost_per_minute: row.get(1)?,
  })
}

pub fn material_rate_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<MaterialCostRate> {
  Ok(MaterialCostRate {
    material_name:         row.get(0)?,
    purchase_price_per_kg: row.get(1)?,
    scrap_price_per_kg:    row.get(2)?,
  })
}
