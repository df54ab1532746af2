//! Read-side reports over stored cost records.

use serde::{Deserialize, Serialize};

use crate::{
  catalog::Catalogs,
  category::CopqGroup,
  draft::Party,
  record::{CostRecord, CostSource},
};

// ─── COPQ summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
  pub amount: f64,
  pub count:  usize,
}

impl GroupTotal {
  fn add(&mut self, amount: f64) {
    self.amount += amount;
    self.count += 1;
  }
}

/// Cost of poor quality split into its four classic buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopqSummary {
  pub internal_failure: GroupTotal,
  pub external_failure: GroupTotal,
  pub appraisal:        GroupTotal,
  pub prevention:       GroupTotal,
  pub total:            f64,
  /// `total / produced_vehicles`; 0 when no production count is known.
  pub cost_per_vehicle: f64,
}

impl CopqSummary {
  pub fn group(&self, group: CopqGroup) -> GroupTotal {
    match group {
      CopqGroup::InternalFailure => self.internal_failure,
      CopqGroup::ExternalFailure => self.external_failure,
      CopqGroup::Appraisal => self.appraisal,
      CopqGroup::Prevention => self.prevention,
    }
  }
}

/// Supplier-sourced costs always count as external failure; everything else
/// follows its category.
pub fn copq_group_of(record: &CostRecord) -> CopqGroup {
  match record.data.source {
    CostSource::Supplier { .. } => CopqGroup::ExternalFailure,
    CostSource::Internal => record.category().copq_group(),
  }
}

pub fn copq_summary(
  records: &[CostRecord],
  produced_vehicles: Option<u64>,
) -> CopqSummary {
  let mut summary = CopqSummary::default();
  for record in records {
    let amount = record.amount();
    let bucket = match copq_group_of(record) {
      CopqGroup::InternalFailure => &mut summary.internal_failure,
      CopqGroup::ExternalFailure => &mut summary.external_failure,
      CopqGroup::Appraisal => &mut summary.appraisal,
      CopqGroup::Prevention => &mut summary.prevention,
    };
    bucket.add(amount);
    summary.total += amount;
  }
  summary.cost_per_vehicle = match produced_vehicles {
    Some(n) if n > 0 => summary.total / n as f64,
    _ => 0.0,
  };
  summary
}

// ─── Party distribution ──────────────────────────────────────────────────────

/// Label used when a record names no responsible unit at all.
pub const UNASSIGNED: &str = "unassigned";

/// Everything attributed to one responsible party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyCost {
  /// Unit name, or the supplier's catalog name.
  pub label:       String,
  /// `None` for the unassigned bucket.
  pub party:       Option<Party>,
  pub total:       f64,
  /// Number of attributions (lines, allocation entries or whole records).
  pub count:       usize,
  /// Share of the overall attributed total, 0–100.
  pub percentage:  f64,
}

/// Attribute stored costs to the parties responsible for them.
///
/// A record with line items attributes each positive line to its party.
/// Otherwise a record with allocations attributes each allocation amount.
/// Otherwise the whole amount goes to the record's unit, or to
/// [`UNASSIGNED`]. Sorted by total, largest first.
pub fn party_distribution(
  records: &[CostRecord],
  catalogs: &Catalogs,
) -> Vec<PartyCost> {
  let mut rows: Vec<PartyCost> = Vec::new();
  let mut add = |party: Option<Party>, amount: f64| {
    match rows.iter_mut().find(|r| r.party == party) {
      Some(row) => {
        row.total += amount;
        row.count += 1;
      }
      None => {
        let label = match &party {
          Some(Party::Unit { unit_name }) => unit_name.clone(),
          Some(Party::Supplier { supplier_id }) => {
            catalogs.supplier_name(*supplier_id)
          }
          None => UNASSIGNED.to_owned(),
        };
        rows.push(PartyCost { label, party, total: amount, count: 1, percentage: 0.0 });
      }
    }
  };

  for record in records {
    let data = &record.data;
    if !data.line_items.is_empty() {
      for line in data.line_items.iter().filter(|l| l.amount > 0.0) {
        add(Some(line.responsible.clone()), line.amount);
      }
    } else if let Some(allocs) = data.allocations.as_ref().filter(|a| !a.is_empty()) {
      for share in allocs {
        add(Some(share.party.clone()), share.amount);
      }
    } else {
      add(data.unit.clone().map(Party::unit), data.amount);
    }
  }

  let total: f64 = rows.iter().map(|r| r.total).sum();
  for row in &mut rows {
    row.percentage = if total > 0.0 { row.total / total * 100.0 } else { 0.0 };
  }
  rows.sort_by(|a, b| b.total.total_cmp(&a.total));
  rows
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    allocation::AllocationShare,
    category::CostCategory,
    catalog::{Supplier, SupplierStatus},
    record::{NewCostRecord, RecordLine},
  };

  fn record(category: CostCategory, amount: f64) -> CostRecord {
    let now = Utc::now();
    CostRecord {
      record_id:   Uuid::new_v4(),
      recorded_at: now,
      updated_at:  now,
      data:        NewCostRecord {
        category,
        cost_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        unit: None,
        source: CostSource::Internal,
        customer_name: None,
        vehicle_type: None,
        part_code: None,
        part_name: None,
        description: None,
        quantity: None,
        material: None,
        scrap_weight_kg: None,
        rework_duration_min: None,
        affected_units: vec![],
        additional_labor_cost: 0.0,
        amount,
        line_items: vec![],
        shared_costs: vec![],
        indirect_costs: vec![],
        allocations: None,
      },
    }
  }

  fn line(party: Party, amount: f64) -> RecordLine {
    RecordLine {
      part_code: None,
      part_name: None,
      responsible: party,
      quantity: None,
      unit_price: None,
      amount,
      subtype: None,
      description: None,
    }
  }

  #[test]
  fn copq_buckets_and_cost_per_vehicle() {
    let mut supplier_scrap = record(CostCategory::Scrap, 50.0);
    supplier_scrap.data.source = CostSource::Supplier { supplier_id: Uuid::new_v4() };

    let records = vec![
      record(CostCategory::Scrap, 100.0),
      record(CostCategory::Warranty, 300.0),
      record(CostCategory::QualityControl, 40.0),
      record(CostCategory::Training, 60.0),
      supplier_scrap,
    ];
    let s = copq_summary(&records, Some(10));
    assert_eq!(s.internal_failure, GroupTotal { amount: 100.0, count: 1 });
    assert_eq!(s.external_failure, GroupTotal { amount: 350.0, count: 2 });
    assert_eq!(s.group(CopqGroup::Appraisal).amount, 40.0);
    assert_eq!(s.group(CopqGroup::Prevention).amount, 60.0);
    assert_eq!(s.total, 550.0);
    assert_eq!(s.cost_per_vehicle, 55.0);

    assert_eq!(copq_summary(&records, Some(0)).cost_per_vehicle, 0.0);
  }

  #[test]
  fn parties_from_lines_allocations_and_units() {
    let acme = Uuid::new_v4();
    let catalogs = Catalogs {
      suppliers: vec![Supplier {
        supplier_id: acme,
        name:        "Acme".into(),
        status:      SupplierStatus::Approved,
      }],
      ..Catalogs::default()
    };

    let mut itemized = record(CostCategory::Complaint, 999.0);
    itemized.data.line_items = vec![
      line(Party::unit("Paint"), 200.0),
      line(Party::supplier(acme), 300.0),
    ];

    let mut allocated = record(CostCategory::Scrap, 1000.0);
    allocated.data.allocations = Some(vec![
      AllocationShare { party: Party::unit("Paint"), percentage: 60.0, amount: 600.0 },
      AllocationShare { party: Party::unit("Welding"), percentage: 40.0, amount: 400.0 },
    ]);

    let mut by_unit = record(CostCategory::Rework, 100.0);
    by_unit.data.unit = Some("Welding".into());

    let orphan = record(CostCategory::Waste, 100.0);

    let rows =
      party_distribution(&[itemized, allocated, by_unit, orphan], &catalogs);
    let summary: Vec<(&str, f64, usize)> = rows
      .iter()
      .map(|r| (r.label.as_str(), r.total, r.count))
      .collect();
    assert_eq!(summary, vec![
      ("Paint", 800.0, 2),
      ("Welding", 500.0, 2),
      ("Acme", 300.0, 1),
      (UNASSIGNED, 100.0, 1),
    ]);
    let pct: f64 = rows.iter().map(|r| r.percentage).sum();
    assert!((pct - 100.0).abs() < 1e-9);
  }
}
