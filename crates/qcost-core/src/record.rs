//! The validated cost record: the payload handed to a [`crate::store::CostStore`].
//!
//! A [`NewCostRecord`] is only ever built by [`crate::CostEngine::assemble`],
//! after every validation rule has passed. Once built it is never edited; a
//! correction is a fresh draft submitted as an update.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  allocation::AllocationShare,
  category::CostCategory,
  draft::{AffectedUnit, IndirectCost, Party, SharedCost},
};

/// Whether the cost originates internally or from a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostSource {
  #[default]
  Internal,
  Supplier { supplier_id: Uuid },
}

impl CostSource {
  pub fn supplier_id(&self) -> Option<Uuid> {
    match self {
      Self::Internal => None,
      Self::Supplier { supplier_id } => Some(*supplier_id),
    }
  }
}

/// A line item in its final form: responsibility resolved, amount fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLine {
  pub part_code:   Option<String>,
  pub part_name:   Option<String>,
  pub responsible: Party,
  pub quantity:    Option<f64>,
  pub unit_price:  Option<f64>,
  pub amount:      f64,
  pub subtype:     Option<String>,
  pub description: Option<String>,
}

/// Input to [`crate::store::CostStore::insert_record`] and
/// [`crate::store::CostStore::update_record`].
/// `record_id` and timestamps are always set by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCostRecord {
  pub category:              CostCategory,
  pub cost_date:             NaiveDate,
  pub unit:                  Option<String>,
  pub source:                CostSource,
  /// Only ever set for External Failure.
  pub customer_name:         Option<String>,
  pub vehicle_type:          Option<String>,
  pub part_code:             Option<String>,
  pub part_name:             Option<String>,
  pub description:           Option<String>,
  pub quantity:              Option<f64>,
  pub material:              Option<String>,
  pub scrap_weight_kg:       Option<f64>,
  pub rework_duration_min:   Option<f64>,
  /// Merged: at most one entry per unit.
  pub affected_units:        Vec<AffectedUnit>,
  pub additional_labor_cost: f64,
  /// Grand total: base amount plus shared and indirect costs.
  pub amount:                f64,
  pub line_items:            Vec<RecordLine>,
  pub shared_costs:          Vec<SharedCost>,
  pub indirect_costs:        Vec<IndirectCost>,
  /// `None` when allocation mode was off.
  pub allocations:           Option<Vec<AllocationShare>>,
}

/// A persisted cost record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
  pub record_id:   Uuid,
  /// Set on insert; never changes.
  pub recorded_at: DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(flatten)]
  pub data:        NewCostRecord,
}

impl CostRecord {
  pub fn amount(&self) -> f64 { self.data.amount }

  pub fn category(&self) -> CostCategory { self.data.category }
}
