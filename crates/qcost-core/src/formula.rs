//! Closed-form amount calculators for the formula categories.
//!
//! - Scrap / Waste: `(purchase − scrap price) × weight × quantity`, plus an
//!   optional 50 % labour surcharge for Scrap.
//! - Rework: minutes spent in each unit × that unit's rate, × quantity.

use serde::{Deserialize, Serialize};

use crate::{
  catalog::{Catalogs, MaterialCostRate},
  category::CostCategory,
  draft::{AffectedUnit, AmountMode, CostDraft, non_blank},
};

/// Share of the material cost added as labour when Scrap includes labour.
pub const SCRAP_LABOR_FACTOR: f64 = 0.5;

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The derived amount of a formula category, or why there is none yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulaOutcome {
  Material {
    material_cost:         f64,
    additional_labor_cost: f64,
    amount:                f64,
  },
  Rework {
    /// Cost of reworking a single piece.
    per_piece_cost: f64,
    amount:         f64,
    /// Units referenced by the draft but missing from the catalog; they were
    /// costed at zero.
    unknown_units:  Vec<String>,
  },
  Manual {
    amount: f64,
  },
  NotComputable {
    reason: String,
  },
}

impl FormulaOutcome {
  pub fn amount(&self) -> Option<f64> {
    match self {
      Self::Material { amount, .. }
      | Self::Rework { amount, .. }
      | Self::Manual { amount } => Some(*amount),
      Self::NotComputable { .. } => None,
    }
  }

  pub fn additional_labor_cost(&self) -> f64 {
    match self {
      Self::Material { additional_labor_cost, .. } => *additional_labor_cost,
      _ => 0.0,
    }
  }

  fn not_computable(reason: impl Into<String>) -> Self {
    Self::NotComputable { reason: reason.into() }
  }
}

// ─── Scrap / Waste ───────────────────────────────────────────────────────────

/// Price a scrapped or wasted quantity of material.
///
/// `with_labor` adds [`SCRAP_LABOR_FACTOR`] × material cost on top and
/// reports it separately.
pub fn material_cost(
  rate: &MaterialCostRate,
  weight_kg: f64,
  quantity: f64,
  with_labor: bool,
) -> FormulaOutcome {
  let material_cost = rate.loss_per_kg() * weight_kg * quantity;
  let additional_labor_cost = if with_labor {
    material_cost * SCRAP_LABOR_FACTOR
  } else {
    0.0
  };
  FormulaOutcome::Material {
    material_cost,
    additional_labor_cost,
    amount: material_cost + additional_labor_cost,
  }
}

// ─── Rework ──────────────────────────────────────────────────────────────────

/// Drop blank or zero-duration entries and fold duplicates of the same unit
/// into one entry by summing their durations. First-seen order is kept.
pub fn merge_affected_units(units: &[AffectedUnit]) -> Vec<AffectedUnit> {
  let mut merged: Vec<AffectedUnit> = Vec::new();
  for au in units {
    let name = au.unit_name.trim();
    if name.is_empty() || au.duration_min <= 0.0 {
      continue;
    }
    match merged.iter_mut().find(|m| m.unit_name == name) {
      Some(existing) => existing.duration_min += au.duration_min,
      None => merged.push(AffectedUnit {
        unit_name:    name.to_owned(),
        duration_min: au.duration_min,
      }),
    }
  }
  merged
}

/// Price a rework: the primary unit's minutes plus every affected unit's
/// minutes, each at its catalog rate, times `quantity`.
pub fn rework_cost(
  catalogs: &Catalogs,
  primary: Option<(&str, f64)>,
  affected: &[AffectedUnit],
  quantity: f64,
) -> FormulaOutcome {
  let mut unknown_units = Vec::new();
  let mut cost_of = |unit: &str, minutes: f64| -> f64 {
    if catalogs.unit(unit).is_none() && !unknown_units.iter().any(|u| u == unit) {
      unknown_units.push(unit.to_owned());
    }
    minutes * catalogs.unit_rate(unit)
  };

  let mut per_piece_cost = 0.0;
  if let Some((unit, minutes)) = primary
    && minutes > 0.0
  {
    per_piece_cost += cost_of(unit, minutes);
  }
  for au in merge_affected_units(affected) {
    per_piece_cost += cost_of(&au.unit_name, au.duration_min);
  }

  FormulaOutcome::Rework {
    per_piece_cost,
    amount: per_piece_cost * quantity,
    unknown_units,
  }
}

// ─── Draft dispatch ──────────────────────────────────────────────────────────

/// Derive the formula amount for a draft of a formula category.
///
/// Returns `None` for itemized categories and drafts without a category.
pub fn derive(
  draft: &CostDraft,
  catalogs: &Catalogs,
) -> Option<FormulaOutcome> {
  let category = draft.category.filter(|c| c.is_formula())?;

  if let AmountMode::Manual { amount } = draft.amount_mode {
    return Some(FormulaOutcome::Manual { amount });
  }

  let quantity = match draft.quantity {
    Some(q) if q > 0.0 => q,
    _ => return Some(FormulaOutcome::not_computable("quantity must be positive")),
  };

  let outcome = if category.is_material_formula() {
    let Some(material) = non_blank(draft.material.as_deref()) else {
      return Some(FormulaOutcome::not_computable("no material selected"));
    };
    let weight = match draft.scrap_weight_kg {
      Some(w) if w > 0.0 => w,
      _ => {
        return Some(FormulaOutcome::not_computable(
          "scrap weight must be positive",
        ));
      }
    };
    match catalogs.require_material(material) {
      Ok(rate) => material_cost(
        rate,
        weight,
        quantity,
        category == CostCategory::Scrap && draft.include_labor,
      ),
      Err(e) => FormulaOutcome::not_computable(e.to_string()),
    }
  } else {
    let primary = non_blank(draft.unit.as_deref())
      .map(|u| (u, draft.rework_duration_min.unwrap_or(0.0)));
    rework_cost(catalogs, primary, &draft.affected_units, quantity)
  };

  Some(outcome)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::catalog::UnitCostRate;

  fn steel() -> MaterialCostRate {
    MaterialCostRate {
      material_name:         "Steel".into(),
      purchase_price_per_kg: 100.0,
      scrap_price_per_kg:    20.0,
    }
  }

  fn catalogs() -> Catalogs {
    Catalogs {
      unit_costs:     vec![
        UnitCostRate { unit_name: "Assembly".into(), cost_per_minute: 10.0 },
        UnitCostRate { unit_name: "Paint".into(), cost_per_minute: 5.0 },
      ],
      material_costs: vec![steel()],
      suppliers:      vec![],
    }
  }

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 3, 14).unwrap() }

  #[test]
  fn scrap_without_labor() {
    let out = material_cost(&steel(), 5.0, 2.0, false);
    assert_eq!(out, FormulaOutcome::Material {
      material_cost:         800.0,
      additional_labor_cost: 0.0,
      amount:                800.0,
    });
  }

  #[test]
  fn scrap_with_labor_records_surcharge_separately() {
    let out = material_cost(&steel(), 5.0, 2.0, true);
    assert_eq!(out.amount(), Some(1200.0));
    assert_eq!(out.additional_labor_cost(), 400.0);
  }

  #[test]
  fn labor_toggle_ignored_for_waste() {
    let mut draft = CostDraft::new(CostCategory::Waste, date());
    draft.material = Some("Steel".into());
    draft.scrap_weight_kg = Some(5.0);
    draft.quantity = Some(2.0);
    draft.include_labor = true;
    let out = derive(&draft, &catalogs()).unwrap();
    assert_eq!(out.amount(), Some(800.0));
    assert_eq!(out.additional_labor_cost(), 0.0);
  }

  #[test]
  fn unknown_material_is_not_computable() {
    let mut draft = CostDraft::new(CostCategory::Scrap, date());
    draft.material = Some("Titanium".into());
    draft.scrap_weight_kg = Some(5.0);
    draft.quantity = Some(2.0);
    let out = derive(&draft, &catalogs()).unwrap();
    assert!(matches!(out, FormulaOutcome::NotComputable { .. }));
    assert_eq!(out.amount(), None);
  }

  #[test]
  fn non_positive_weight_or_quantity_is_not_computable() {
    let mut draft = CostDraft::new(CostCategory::Scrap, date());
    draft.material = Some("Steel".into());
    draft.scrap_weight_kg = Some(0.0);
    draft.quantity = Some(2.0);
    assert_eq!(derive(&draft, &catalogs()).unwrap().amount(), None);

    draft.scrap_weight_kg = Some(5.0);
    draft.quantity = Some(-1.0);
    assert_eq!(derive(&draft, &catalogs()).unwrap().amount(), None);
  }

  #[test]
  fn rework_scenario() {
    let out = rework_cost(
      &catalogs(),
      Some(("Assembly", 30.0)),
      &[AffectedUnit { unit_name: "Paint".into(), duration_min: 10.0 }],
      3.0,
    );
    assert_eq!(out.amount(), Some(1050.0));
  }

  #[test]
  fn duplicate_affected_units_merge_before_costing() {
    let affected = vec![
      AffectedUnit { unit_name: "Paint".into(), duration_min: 4.0 },
      AffectedUnit { unit_name: "Assembly".into(), duration_min: 1.0 },
      AffectedUnit { unit_name: "Paint ".into(), duration_min: 6.0 },
      AffectedUnit { unit_name: "".into(), duration_min: 9.0 },
      AffectedUnit { unit_name: "Assembly".into(), duration_min: 0.0 },
    ];
    let merged = merge_affected_units(&affected);
    assert_eq!(merged, vec![
      AffectedUnit { unit_name: "Paint".into(), duration_min: 10.0 },
      AffectedUnit { unit_name: "Assembly".into(), duration_min: 1.0 },
    ]);

    let out = rework_cost(&catalogs(), None, &affected, 2.0);
    assert_eq!(out.amount(), Some(2.0 * (10.0 * 5.0 + 1.0 * 10.0)));
  }

  #[test]
  fn unknown_rework_unit_costs_zero_and_is_reported() {
    let out = rework_cost(
      &catalogs(),
      Some(("Assembly", 10.0)),
      &[AffectedUnit { unit_name: "Foundry".into(), duration_min: 50.0 }],
      1.0,
    );
    match out {
      FormulaOutcome::Rework { amount, unknown_units, .. } => {
        assert_eq!(amount, 100.0);
        assert_eq!(unknown_units, vec!["Foundry".to_string()]);
      }
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[test]
  fn manual_mode_skips_formula() {
    let mut draft = CostDraft::new(CostCategory::Scrap, date());
    draft.amount_mode = AmountMode::Manual { amount: 321.0 };
    draft.include_labor = true;
    let out = derive(&draft, &catalogs()).unwrap();
    assert_eq!(out, FormulaOutcome::Manual { amount: 321.0 });
    assert_eq!(out.additional_labor_cost(), 0.0);
  }

  #[test]
  fn itemized_category_has_no_formula() {
    let draft = CostDraft::new(CostCategory::Warranty, date());
    assert!(derive(&draft, &catalogs()).is_none());
  }
}
