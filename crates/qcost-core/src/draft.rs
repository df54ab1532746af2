//! Draft types: the user-entered facts a cost record is composed from.
//!
//! A draft is edited freely (lines added and removed, fields half-filled) and
//! is never persisted. [`crate::CostEngine`] evaluates it on demand and, once
//! it validates, assembles it into a [`crate::record::NewCostRecord`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::CostCategory;

// ─── Responsibility ──────────────────────────────────────────────────────────

/// Who a cost (or a share of it) is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Party {
  /// An internal unit, by catalog name.
  Unit { unit_name: String },
  /// An external supplier, by catalog id.
  Supplier { supplier_id: Uuid },
}

impl Party {
  pub fn unit(name: impl Into<String>) -> Self {
    Self::Unit { unit_name: name.into() }
  }

  pub fn supplier(id: Uuid) -> Self { Self::Supplier { supplier_id: id } }

  /// A unit party with a blank name counts as "not chosen".
  pub fn is_chosen(&self) -> bool {
    match self {
      Self::Unit { unit_name } => !unit_name.trim().is_empty(),
      Self::Supplier { .. } => true,
    }
  }
}

/// `Some(party)` only if the party has actually been chosen.
pub(crate) fn chosen(party: Option<&Party>) -> Option<&Party> {
  party.filter(|p| p.is_chosen())
}

// ─── Collections ─────────────────────────────────────────────────────────────

/// One itemized cost line (an invoice line, a claim position).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
  pub part_code:   Option<String>,
  pub part_name:   Option<String>,
  pub responsible: Option<Party>,
  pub quantity:    Option<f64>,
  pub unit_price:  Option<f64>,
  /// Manually entered amount; ignored when `quantity × unit_price` is
  /// positive.
  pub amount:      Option<f64>,
  pub subtype:     Option<String>,
  pub description: Option<String>,
}

impl LineItem {
  /// The product of quantity and unit price, if both are positive.
  pub fn derived_amount(&self) -> Option<f64> {
    match (self.quantity, self.unit_price) {
      (Some(q), Some(p)) if q > 0.0 && p > 0.0 => Some(q * p),
      _ => None,
    }
  }

  /// The amount this line contributes to the line-items total.
  pub fn effective_amount(&self) -> f64 {
    self
      .derived_amount()
      .or(self.amount)
      .unwrap_or(0.0)
  }
}

/// A surcharge that belongs to the record as a whole (freight, travel) and is
/// distributed over line items for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedCost {
  pub category:         String,
  pub amount:           f64,
  pub measurement_unit: Option<String>,
  pub description:      Option<String>,
}

/// A flat surcharge that is never distributed (reputation, opportunity).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndirectCost {
  pub category:    String,
  pub amount:      f64,
  pub description: Option<String>,
}

/// A percentage of the grand total attributed to a party.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allocation {
  pub party:      Option<Party>,
  pub percentage: f64,
}

/// Extra minutes a rework consumed in a unit other than the primary one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectedUnit {
  pub unit_name:    String,
  pub duration_min: f64,
}

// ─── Amount mode ─────────────────────────────────────────────────────────────

/// How the amount of a formula category is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AmountMode {
  /// Derived from the formula on every evaluation.
  #[default]
  Auto,
  /// Typed in by the user; the formula is not applied.
  Manual { amount: f64 },
}

// ─── CostDraft ───────────────────────────────────────────────────────────────

/// Everything the user has entered for one cost record so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostDraft {
  pub category:            Option<CostCategory>,
  pub cost_date:           Option<NaiveDate>,
  /// Source unit; for Rework, the primary responsible unit.
  pub unit:                Option<String>,
  pub supplier_sourced:    bool,
  pub supplier_id:         Option<Uuid>,
  pub customer_name:       Option<String>,
  pub vehicle_type:        Option<String>,
  pub part_code:           Option<String>,
  pub part_name:           Option<String>,
  pub description:         Option<String>,

  // ── Formula inputs ──────────────────────────────────────────────────────
  pub quantity:            Option<f64>,
  pub material:            Option<String>,
  pub scrap_weight_kg:     Option<f64>,
  /// Scrap only: add a 50 % labour surcharge on top of the material cost.
  pub include_labor:       bool,
  pub rework_duration_min: Option<f64>,
  pub affected_units:      Vec<AffectedUnit>,
  pub amount_mode:         AmountMode,

  // ── Itemized inputs ─────────────────────────────────────────────────────
  pub line_items:          Vec<LineItem>,
  pub shared_costs:        Vec<SharedCost>,
  pub indirect_costs:      Vec<IndirectCost>,
  /// `Some` turns allocation mode on.
  pub allocations:         Option<Vec<Allocation>>,
}

impl CostDraft {
  pub fn new(category: CostCategory, cost_date: NaiveDate) -> Self {
    Self {
      category: Some(category),
      cost_date: Some(cost_date),
      ..Self::default()
    }
  }

  pub fn is_formula(&self) -> bool {
    self.category.is_some_and(CostCategory::is_formula)
  }
}

/// Trimmed, non-empty text, or `None`.
pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
  s.map(str::trim).filter(|s| !s.is_empty())
}
