//! [`CostEngine`] evaluates drafts against the catalogs and assembles the
//! final payload.
//!
//! Evaluation is pure: it reads the draft and catalogs and returns derived
//! values, so it may run on every edit. Only [`CostEngine::assemble`]
//! consumes the draft, and it does so strictly after validation passed.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{
    LineShare, distribute_shared, grand_total, indirect_costs_total,
    line_items_total, shared_costs_total,
  },
  allocation::{AllocationShare, CLOSURE_TOLERANCE, allocation_shares},
  catalog::Catalogs,
  category::CostCategory,
  draft::{AmountMode, CostDraft, Party, chosen, non_blank},
  formula::{self, FormulaOutcome, merge_affected_units},
  record::{CostSource, NewCostRecord, RecordLine},
  validate::validate,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Allowed deviation of the allocation percentage sum from 100.
  pub allocation_tolerance: f64,
}

impl Default for EngineConfig {
  fn default() -> Self { Self { allocation_tolerance: CLOSURE_TOLERANCE } }
}

// ─── Warnings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
  /// A unit, material or supplier is not in its catalog.
  LookupMiss,
  /// A chosen supplier is not approved.
  SupplierStatus,
}

/// A notice that does not block submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
  pub kind:    WarningKind,
  pub message: String,
}

impl Warning {
  fn lookup_miss(message: impl Into<String>) -> Self {
    Self { kind: WarningKind::LookupMiss, message: message.into() }
  }
}

// ─── Breakdown ───────────────────────────────────────────────────────────────

/// Every value derived from a draft, for display and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
  /// `None` for itemized categories.
  pub formula:              Option<FormulaOutcome>,
  /// Formula amount or line-items total; 0 while not computable.
  pub base_amount:          f64,
  pub line_items_total:     f64,
  pub shared_costs_total:   f64,
  pub indirect_costs_total: f64,
  pub grand_total:          f64,
  pub distribution:         Vec<LineShare>,
  pub allocations:          Vec<AllocationShare>,
  pub warnings:             Vec<Warning>,
}

/// A breakdown together with the verdict of the validation pipeline.
#[derive(Debug)]
pub struct Evaluation {
  pub breakdown: CostBreakdown,
  pub outcome:   Result<()>,
}

impl Evaluation {
  pub fn is_valid(&self) -> bool { self.outcome.is_ok() }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CostEngine {
  catalogs: Catalogs,
  config:   EngineConfig,
}

impl CostEngine {
  pub fn new(catalogs: Catalogs) -> Self {
    Self { catalogs, config: EngineConfig::default() }
  }

  pub fn with_config(catalogs: Catalogs, config: EngineConfig) -> Self {
    Self { catalogs, config }
  }

  pub fn catalogs(&self) -> &Catalogs { &self.catalogs }

  /// Derive all amounts for `draft`. Never fails; values that cannot be
  /// computed yet count as 0.
  pub fn compute(&self, draft: &CostDraft) -> CostBreakdown {
    let formula = formula::derive(draft, &self.catalogs);
    self.breakdown(draft, formula)
  }

  /// Run the validation pipeline and return the first violated rule.
  ///
  /// A catalog with a negative or non-finite price fails every draft with
  /// [`Error::InvalidCatalog`] before any rule runs.
  pub fn validate(&self, draft: &CostDraft) -> Result<()> {
    self.catalogs.validate()?;
    let formula = formula::derive(draft, &self.catalogs);
    validate(draft, formula.as_ref(), self.config.allocation_tolerance)
  }

  /// [`CostEngine::compute`] and [`CostEngine::validate`] in one pass.
  pub fn evaluate(&self, draft: &CostDraft) -> Evaluation {
    let formula = formula::derive(draft, &self.catalogs);
    let outcome = self.catalogs.validate().and_then(|()| {
      validate(draft, formula.as_ref(), self.config.allocation_tolerance)
    });
    Evaluation { breakdown: self.breakdown(draft, formula), outcome }
  }

  /// Validate `draft` and turn it into the immutable submission payload.
  ///
  /// After validation the grand total is recomputed and overwrites any
  /// displayed amount, duplicate affected units are merged, and fields that
  /// do not apply (supplier of an internal cost, customer outside External
  /// Failure, formula inputs of other categories) are dropped.
  pub fn assemble(&self, draft: CostDraft) -> Result<NewCostRecord> {
    self.catalogs.validate()?;
    let formula = formula::derive(&draft, &self.catalogs);
    validate(&draft, formula.as_ref(), self.config.allocation_tolerance)?;

    let breakdown = self.breakdown(&draft, formula);
    for w in &breakdown.warnings {
      warn!(kind = ?w.kind, "{}", w.message);
    }

    let (Some(category), Some(cost_date)) = (draft.category, draft.cost_date)
    else {
      return Err(Error::missing("category and cost date"));
    };

    let source = match (draft.supplier_sourced, draft.supplier_id) {
      (true, Some(supplier_id)) => CostSource::Supplier { supplier_id },
      (true, None) => return Err(Error::missing("supplier")),
      (false, _) => CostSource::Internal,
    };

    let customer_name = if category.requires_customer() {
      non_blank(draft.customer_name.as_deref()).map(str::to_owned)
    } else {
      None
    };

    let is_material = category.is_material_formula();
    let is_rework = category == CostCategory::Rework;

    let line_items = if category.is_formula() {
      Vec::new()
    } else {
      draft
        .line_items
        .iter()
        .enumerate()
        .map(|(i, line)| {
          let responsible = chosen(line.responsible.as_ref())
            .cloned()
            .ok_or_else(|| {
              Error::missing(format!("responsible party of line {}", i + 1))
            })?;
          Ok(RecordLine {
            part_code: line.part_code.clone(),
            part_name: line.part_name.clone(),
            responsible,
            quantity: line.quantity,
            unit_price: line.unit_price,
            amount: line.effective_amount(),
            subtype: line.subtype.clone(),
            description: line.description.clone(),
          })
        })
        .collect::<Result<Vec<_>>>()?
    };

    let allocations = draft
      .allocations
      .as_deref()
      .map(|entries| allocation_shares(entries, breakdown.grand_total));

    let record = NewCostRecord {
      category,
      cost_date,
      unit: non_blank(draft.unit.as_deref()).map(str::to_owned),
      source,
      customer_name,
      vehicle_type: draft.vehicle_type,
      part_code: draft.part_code,
      part_name: draft.part_name,
      description: draft.description,
      quantity: draft.quantity,
      material: if is_material { draft.material } else { None },
      scrap_weight_kg: if is_material { draft.scrap_weight_kg } else { None },
      rework_duration_min: if is_rework {
        draft.rework_duration_min
      } else {
        None
      },
      affected_units: if is_rework {
        merge_affected_units(&draft.affected_units)
      } else {
        Vec::new()
      },
      additional_labor_cost: breakdown
        .formula
        .as_ref()
        .map(FormulaOutcome::additional_labor_cost)
        .unwrap_or(0.0),
      amount: breakdown.grand_total,
      line_items,
      shared_costs: draft.shared_costs,
      indirect_costs: draft.indirect_costs,
      allocations,
    };

    debug!(
      category = category.as_str(),
      amount = record.amount,
      lines = record.line_items.len(),
      "assembled cost record"
    );
    Ok(record)
  }

  fn breakdown(
    &self,
    draft: &CostDraft,
    formula: Option<FormulaOutcome>,
  ) -> CostBreakdown {
    let itemized = draft.category.is_some_and(|c| !c.is_formula());
    let lines = if itemized { &draft.line_items[..] } else { &[] };

    let line_items_total = line_items_total(lines);
    let shared_costs_total = shared_costs_total(&draft.shared_costs);
    let indirect_costs_total = indirect_costs_total(&draft.indirect_costs);

    let base_amount = match &formula {
      Some(outcome) => outcome.amount().unwrap_or(0.0),
      None => line_items_total,
    };
    let grand_total =
      grand_total(base_amount, shared_costs_total, indirect_costs_total);

    let allocations = draft
      .allocations
      .as_deref()
      .map(|entries| allocation_shares(entries, grand_total))
      .unwrap_or_default();

    let warnings = self.warnings(draft, formula.as_ref());

    CostBreakdown {
      formula,
      base_amount,
      line_items_total,
      shared_costs_total,
      indirect_costs_total,
      grand_total,
      distribution: distribute_shared(lines, shared_costs_total),
      allocations,
      warnings,
    }
  }

  fn warnings(
    &self,
    draft: &CostDraft,
    formula: Option<&FormulaOutcome>,
  ) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if let Some(FormulaOutcome::Rework { unknown_units, .. }) = formula {
      for unit in unknown_units {
        warnings.push(Warning::lookup_miss(format!(
          "unit {unit:?} has no cost rate; costed at 0"
        )));
      }
    }

    let auto_rework = draft.category == Some(CostCategory::Rework)
      && draft.amount_mode == AmountMode::Auto;
    if auto_rework
      && non_blank(draft.unit.as_deref()).is_none()
      && let Some(minutes) = draft.rework_duration_min.filter(|m| *m > 0.0)
    {
      warnings.push(Warning::lookup_miss(format!(
        "rework duration of {minutes} min has no primary unit; not costed"
      )));
    }

    let auto_material = draft.category.is_some_and(|c| c.is_material_formula())
      && draft.amount_mode == AmountMode::Auto;
    if auto_material
      && let Some(material) = non_blank(draft.material.as_deref())
      && self.catalogs.material(material).is_none()
    {
      warnings.push(Warning::lookup_miss(format!(
        "material {material:?} has no price"
      )));
    }

    // Every supplier the draft refers to, first-seen order, no repeats.
    let mut supplier_ids: Vec<Uuid> = Vec::new();
    if draft.supplier_sourced
      && let Some(id) = draft.supplier_id
    {
      supplier_ids.push(id);
    }
    let parties = draft
      .line_items
      .iter()
      .filter_map(|l| l.responsible.as_ref())
      .chain(
        draft
          .allocations
          .iter()
          .flatten()
          .filter_map(|a| a.party.as_ref()),
      );
    for party in parties {
      if let Party::Supplier { supplier_id } = party
        && !supplier_ids.contains(supplier_id)
      {
        supplier_ids.push(*supplier_id);
      }
    }

    for id in supplier_ids {
      match self.catalogs.supplier(id) {
        None => {
          warnings.push(Warning::lookup_miss(format!("supplier {id} is unknown")))
        }
        Some(s) if !s.status.is_approved() => warnings.push(Warning {
          kind:    WarningKind::SupplierStatus,
          message: format!(
            "supplier {:?} is {}",
            s.name,
            s.status.as_str()
          ),
        }),
        Some(_) => {}
      }
    }

    warnings
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    ErrorKind,
    catalog::{MaterialCostRate, Supplier, SupplierStatus, UnitCostRate},
    draft::{AffectedUnit, Allocation, IndirectCost, LineItem, SharedCost},
  };

  const ACME: Uuid = Uuid::from_u128(0xac3e);

  fn catalogs() -> Catalogs {
    Catalogs {
      unit_costs:     vec![
        UnitCostRate { unit_name: "Assembly".into(), cost_per_minute: 10.0 },
        UnitCostRate { unit_name: "Paint".into(), cost_per_minute: 5.0 },
      ],
      material_costs: vec![MaterialCostRate {
        material_name:         "Steel".into(),
        purchase_price_per_kg: 100.0,
        scrap_price_per_kg:    20.0,
      }],
      suppliers:      vec![Supplier {
        supplier_id: ACME,
        name:        "Acme Castings".into(),
        status:      SupplierStatus::Suspended,
      }],
    }
  }

  fn engine() -> CostEngine { CostEngine::new(catalogs()) }

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 1, 20).unwrap() }

  fn scrap_draft(include_labor: bool) -> CostDraft {
    let mut d = CostDraft::new(CostCategory::Scrap, date());
    d.unit = Some("Assembly".into());
    d.material = Some("Steel".into());
    d.scrap_weight_kg = Some(5.0);
    d.quantity = Some(2.0);
    d.include_labor = include_labor;
    d
  }

  fn line(unit: &str, amount: f64) -> LineItem {
    LineItem {
      responsible: Some(Party::unit(unit)),
      amount: Some(amount),
      ..LineItem::default()
    }
  }

  #[test]
  fn scenario_a_scrap_without_labor() {
    let record = engine().assemble(scrap_draft(false)).unwrap();
    assert_eq!(record.amount, 800.0);
    assert_eq!(record.additional_labor_cost, 0.0);
  }

  #[test]
  fn scenario_b_scrap_with_labor() {
    let record = engine().assemble(scrap_draft(true)).unwrap();
    assert_eq!(record.amount, 1200.0);
    assert_eq!(record.additional_labor_cost, 400.0);
  }

  #[test]
  fn scenario_c_rework() {
    let mut d = CostDraft::new(CostCategory::Rework, date());
    d.unit = Some("Assembly".into());
    d.rework_duration_min = Some(30.0);
    d.affected_units = vec![AffectedUnit {
      unit_name:    "Paint".into(),
      duration_min: 10.0,
    }];
    d.quantity = Some(3.0);
    let record = engine().assemble(d).unwrap();
    assert_eq!(record.amount, 1050.0);
  }

  #[test]
  fn scenario_d_shared_cost_distribution() {
    let mut d = CostDraft::new(CostCategory::Complaint, date());
    d.line_items =
      vec![line("A", 100.0), line("B", 200.0), line("C", 700.0)];
    d.shared_costs = vec![SharedCost {
      category: "Freight".into(),
      amount: 100.0,
      ..SharedCost::default()
    }];
    let b = engine().compute(&d);
    let expected = [10.0, 20.0, 70.0];
    for (share, want) in b.distribution.iter().zip(expected) {
      assert!((share.shared_share - want).abs() < 1e-9);
    }
    assert_eq!(b.grand_total, 1100.0);

    // Distribution does not touch the stored line amounts.
    let record = engine().assemble(d).unwrap();
    let amounts: Vec<f64> = record.line_items.iter().map(|l| l.amount).collect();
    assert_eq!(amounts, vec![100.0, 200.0, 700.0]);
    assert_eq!(record.amount, 1100.0);
  }

  #[test]
  fn scenario_e_allocation_closure() {
    let mut d = CostDraft::new(CostCategory::Warranty, date());
    d.line_items = vec![line("A", 1000.0)];
    d.allocations = Some(vec![
      Allocation { party: Some(Party::unit("A")), percentage: 60.0 },
      Allocation { party: Some(Party::supplier(ACME)), percentage: 30.0 },
      Allocation { party: Some(Party::unit("C")), percentage: 9.0 },
    ]);
    let err = engine().assemble(d.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AllocationClosureViolation);

    if let Some(entries) = d.allocations.as_mut() {
      entries[2].percentage = 10.0;
    }
    let record = engine().assemble(d).unwrap();
    let allocs = record.allocations.unwrap();
    let amounts: Vec<f64> = allocs.iter().map(|a| a.amount).collect();
    assert_eq!(amounts, vec![600.0, 300.0, 100.0]);
  }

  #[test]
  fn scenario_f_external_failure_needs_customer() {
    let mut d = CostDraft::new(CostCategory::ExternalFailure, date());
    d.line_items = vec![line("A", 50.0)];
    let err = engine().assemble(d).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
  }

  #[test]
  fn grand_total_includes_surcharges_and_is_idempotent() {
    let mut d = scrap_draft(false);
    d.shared_costs = vec![SharedCost { amount: 50.0, ..SharedCost::default() }];
    d.indirect_costs = vec![IndirectCost {
      category: "Opportunity".into(),
      amount: 25.0,
      description: None,
    }];
    let e = engine();
    let first = e.compute(&d);
    let second = e.compute(&d);
    assert_eq!(first, second);
    assert_eq!(first.grand_total, 875.0);
    assert!(first.distribution.is_empty());
  }

  #[test]
  fn assembled_total_overrides_manual_display() {
    let mut d = CostDraft::new(CostCategory::Rework, date());
    d.quantity = Some(1.0);
    d.amount_mode = AmountMode::Manual { amount: 300.0 };
    d.indirect_costs = vec![IndirectCost {
      category: "Downtime".into(),
      amount: 20.0,
      description: None,
    }];
    let record = engine().assemble(d).unwrap();
    assert_eq!(record.amount, 320.0);
  }

  #[test]
  fn re_enabling_auto_replaces_manual_amount() {
    let mut d = scrap_draft(false);
    d.amount_mode = AmountMode::Manual { amount: 5.0 };
    assert_eq!(engine().compute(&d).grand_total, 5.0);
    d.amount_mode = AmountMode::Auto;
    assert_eq!(engine().compute(&d).grand_total, 800.0);
  }

  #[test]
  fn internal_record_drops_supplier_and_customer() {
    let mut d = CostDraft::new(CostCategory::Warranty, date());
    d.line_items = vec![line("A", 10.0)];
    d.supplier_id = Some(ACME);
    d.customer_name = Some("Someone".into());
    d.material = Some("Steel".into());
    let record = engine().assemble(d).unwrap();
    assert_eq!(record.source, CostSource::Internal);
    assert_eq!(record.customer_name, None);
    assert_eq!(record.material, None);
  }

  #[test]
  fn affected_units_merged_once_in_payload() {
    let mut d = CostDraft::new(CostCategory::Rework, date());
    d.unit = Some("Assembly".into());
    d.quantity = Some(1.0);
    d.affected_units = vec![
      AffectedUnit { unit_name: "Paint".into(), duration_min: 3.0 },
      AffectedUnit { unit_name: "Paint".into(), duration_min: 7.0 },
    ];
    // Evaluating repeatedly does not change the draft or the amount.
    let e = engine();
    assert_eq!(e.compute(&d).grand_total, 50.0);
    assert_eq!(e.compute(&d).grand_total, 50.0);
    assert_eq!(d.affected_units.len(), 2);

    let record = e.assemble(d).unwrap();
    assert_eq!(record.affected_units, vec![AffectedUnit {
      unit_name:    "Paint".into(),
      duration_min: 10.0,
    }]);
    assert_eq!(record.amount, 50.0);
  }

  #[test]
  fn rework_with_only_unknown_units_is_rejected_with_warning() {
    let mut d = CostDraft::new(CostCategory::Rework, date());
    d.unit = Some("Foundry".into());
    d.rework_duration_min = Some(45.0);
    d.quantity = Some(2.0);
    let eval = engine().evaluate(&d);
    assert_eq!(
      eval.outcome.as_ref().unwrap_err().kind(),
      ErrorKind::NonPositiveAmount
    );
    assert_eq!(eval.breakdown.warnings.len(), 1);
    assert_eq!(eval.breakdown.warnings[0].kind, WarningKind::LookupMiss);
  }

  #[test]
  fn rework_duration_without_primary_unit_warns() {
    let mut d = CostDraft::new(CostCategory::Rework, date());
    d.rework_duration_min = Some(30.0);
    d.quantity = Some(1.0);
    d.affected_units =
      vec![AffectedUnit { unit_name: "Paint".into(), duration_min: 4.0 }];
    let eval = engine().evaluate(&d);
    assert!(eval.is_valid());
    assert_eq!(eval.breakdown.grand_total, 20.0);
    assert_eq!(eval.breakdown.warnings, vec![Warning::lookup_miss(
      "rework duration of 30 min has no primary unit; not costed"
    )]);

    // Manual amounts never look at the duration.
    d.amount_mode = AmountMode::Manual { amount: 75.0 };
    assert!(engine().evaluate(&d).breakdown.warnings.is_empty());
  }

  #[test]
  fn negative_unit_rate_rejects_the_draft() {
    let mut catalogs = catalogs();
    catalogs
      .unit_costs
      .push(UnitCostRate { unit_name: "Body".into(), cost_per_minute: -5.0 });
    let engine = CostEngine::new(catalogs);

    let mut d = CostDraft::new(CostCategory::Rework, date());
    d.unit = Some("Assembly".into());
    d.rework_duration_min = Some(10.0);
    d.quantity = Some(1.0);
    d.affected_units =
      vec![AffectedUnit { unit_name: "Body".into(), duration_min: 10.0 }];

    assert_eq!(
      engine.assemble(d.clone()).unwrap_err().kind(),
      ErrorKind::InvalidCatalog
    );
    assert_eq!(engine.validate(&d).unwrap_err().kind(), ErrorKind::InvalidCatalog);
    let eval = engine.evaluate(&d);
    assert_eq!(
      eval.outcome.as_ref().unwrap_err().kind(),
      ErrorKind::InvalidCatalog
    );
  }

  #[test]
  fn non_approved_supplier_warns_but_does_not_block() {
    let mut d = CostDraft::new(CostCategory::SupplierFailure, date());
    d.supplier_sourced = true;
    d.supplier_id = Some(ACME);
    d.line_items = vec![LineItem {
      responsible: Some(Party::supplier(ACME)),
      quantity: Some(2.0),
      unit_price: Some(40.0),
      ..LineItem::default()
    }];
    let eval = engine().evaluate(&d);
    assert!(eval.is_valid());
    assert_eq!(eval.breakdown.warnings, vec![Warning {
      kind:    WarningKind::SupplierStatus,
      message: "supplier \"Acme Castings\" is suspended".into(),
    }]);

    let record = engine().assemble(d).unwrap();
    assert_eq!(record.source, CostSource::Supplier { supplier_id: ACME });
    assert_eq!(record.amount, 80.0);
  }
}
