//! The `CostStore` and `CatalogStore` traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g. `qcost-store-sqlite`).
//! The engine only needs "accept a record, return success or an error with a
//! message"; everything else here serves the read side.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  catalog::{Catalogs, MaterialCostRate, Supplier, UnitCostRate},
  category::CostCategory,
  record::{CostRecord, NewCostRecord},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`CostStore::list_records`].
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub category:    Option<CostCategory>,
  /// Only records sourced from this supplier.
  pub supplier_id: Option<Uuid>,
  /// Inclusive lower bound on `cost_date`.
  pub from:        Option<NaiveDate>,
  /// Inclusive upper bound on `cost_date`.
  pub until:       Option<NaiveDate>,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Abstraction over a cost-record store backend.
///
/// A record is written as one unit: either the whole payload is stored or the
/// call fails and nothing is.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait CostStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new record. `record_id` and timestamps are set by the store.
  fn insert_record(
    &self,
    record: NewCostRecord,
  ) -> impl Future<Output = Result<CostRecord, Self::Error>> + Send + '_;

  /// Replace the payload of an existing record, keeping its id and
  /// `recorded_at`. Fails if `id` is unknown.
  fn update_record(
    &self,
    id: Uuid,
    record: NewCostRecord,
  ) -> impl Future<Output = Result<CostRecord, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CostRecord>, Self::Error>> + Send + '_;

  /// List records matching `query`, newest `cost_date` first.
  fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<CostRecord>, Self::Error>> + Send + 'a;
}

/// Abstraction over wherever the unit, material and supplier catalogs live.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load all three catalogs.
  fn load_catalogs(
    &self,
  ) -> impl Future<Output = Result<Catalogs, Self::Error>> + Send + '_;

  /// Insert or replace the rate for `rate.unit_name`.
  fn put_unit_rate(
    &self,
    rate: UnitCostRate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or replace the prices for `rate.material_name`.
  fn put_material_rate(
    &self,
    rate: MaterialCostRate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or replace the supplier with `supplier.supplier_id`.
  fn put_supplier(
    &self,
    supplier: Supplier,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
