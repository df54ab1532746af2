//! Month-by-month and per-part analyses over stored cost records: the cost
//! trend, month-over-month anomalies, the most expensive parts, and the
//! per-vehicle breakdown.

use std::fmt;

use chrono::{Datelike as _, NaiveDate};
use serde::Serialize;

use crate::{
  category::{CopqGroup, CostCategory},
  record::CostRecord,
  report::{UNASSIGNED, copq_group_of},
};

/// Label for records without a part code or vehicle type.
pub const UNKNOWN: &str = "unknown";

// ─── Month ───────────────────────────────────────────────────────────────────

/// A calendar month. Orders chronologically; displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct Month {
  pub year:  i32,
  /// 1 to 12.
  pub month: u32,
}

impl Month {
  pub fn of(date: NaiveDate) -> Self {
    Self { year: date.year(), month: date.month() }
  }

  /// The month `n` months before this one.
  pub fn back(self, n: u32) -> Self {
    Self::from_index(self.index() - n as i32)
  }

  fn index(self) -> i32 { self.year * 12 + self.month as i32 - 1 }

  fn from_index(index: i32) -> Self {
    Self {
      year:  index.div_euclid(12),
      month: index.rem_euclid(12) as u32 + 1,
    }
  }
}

impl fmt::Display for Month {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

impl From<Month> for String {
  fn from(m: Month) -> Self { m.to_string() }
}

fn month_total(records: &[CostRecord], month: Month) -> f64 {
  records
    .iter()
    .filter(|r| Month::of(r.data.cost_date) == month)
    .map(CostRecord::amount)
    .sum()
}

fn change_percent(current: f64, reference: f64) -> f64 {
  if reference > 0.0 {
    (current - reference) / reference * 100.0
  } else {
    0.0
  }
}

// ─── Trend ───────────────────────────────────────────────────────────────────

/// A change of the recent average beyond this many percent is a trend.
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Months on each side of the trend comparison.
const TREND_SPAN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
  pub month:            Month,
  pub total:            f64,
  pub count:            usize,
  pub internal_failure: f64,
  pub external_failure: f64,
  pub appraisal:        f64,
  pub prevention:       f64,
}

impl MonthTotal {
  fn empty(month: Month) -> Self {
    Self {
      month,
      total: 0.0,
      count: 0,
      internal_failure: 0.0,
      external_failure: 0.0,
      appraisal: 0.0,
      prevention: 0.0,
    }
  }

  fn add(&mut self, record: &CostRecord) {
    let amount = record.amount();
    self.total += amount;
    self.count += 1;
    *match copq_group_of(record) {
      CopqGroup::InternalFailure => &mut self.internal_failure,
      CopqGroup::ExternalFailure => &mut self.external_failure,
      CopqGroup::Appraisal => &mut self.appraisal,
      CopqGroup::Prevention => &mut self.prevention,
    } += amount;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
  Increasing,
  Decreasing,
  Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostTrend {
  /// Oldest month first, ending with the month of the reference date.
  pub months:         Vec<MonthTotal>,
  /// Average monthly total of the last three months.
  pub recent_avg:     f64,
  /// Average of the three months before those; equals `recent_avg` when
  /// the window is too short to have them.
  pub previous_avg:   f64,
  /// Signed; 0 when `previous_avg` is 0.
  pub change_percent: f64,
  pub direction:      TrendDirection,
}

/// Monthly totals for the `months` months ending with the month of `as_of`,
/// and whether the last three months cost more or less than the three before.
/// Records outside the window are ignored.
pub fn monthly_trend(
  records: &[CostRecord],
  as_of: NaiveDate,
  months: u32,
) -> CostTrend {
  let months = months.max(1);
  let first = Month::of(as_of).back(months - 1);
  let mut totals: Vec<MonthTotal> = (0..months)
    .map(|i| MonthTotal::empty(Month::from_index(first.index() + i as i32)))
    .collect();

  for record in records {
    let offset = Month::of(record.data.cost_date).index() - first.index();
    if let Some(slot) = usize::try_from(offset).ok().and_then(|i| totals.get_mut(i)) {
      slot.add(record);
    }
  }

  let average = |window: &[MonthTotal]| {
    window.iter().map(|m| m.total).sum::<f64>() / window.len() as f64
  };
  let split = totals.len().saturating_sub(TREND_SPAN);
  let (before, recent) = totals.split_at(split);
  let recent_avg = average(recent);
  let previous = &before[before.len().saturating_sub(TREND_SPAN)..];
  let previous_avg = if previous.is_empty() { recent_avg } else { average(previous) };

  let change_percent = change_percent(recent_avg, previous_avg);
  let direction = if change_percent > TREND_THRESHOLD_PERCENT {
    TrendDirection::Increasing
  } else if change_percent < -TREND_THRESHOLD_PERCENT {
    TrendDirection::Decreasing
  } else {
    TrendDirection::Stable
  };

  CostTrend { months: totals, recent_avg, previous_avg, change_percent, direction }
}

// ─── Anomalies ───────────────────────────────────────────────────────────────

/// A month differing from its reference by at least this many percent, up or
/// down, is an anomaly.
pub const ANOMALY_THRESHOLD_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AnomalyScope {
  /// All records, this month against last month.
  Overall,
  /// All records, this month against the average of the three before it.
  VersusAverage,
  /// One unit's records (or the unassigned ones), month over month.
  Unit { unit: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
  Rising,
  Falling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
  #[serde(flatten)]
  pub scope:          AnomalyScope,
  pub month:          Month,
  pub current:        f64,
  pub reference:      f64,
  pub change_percent: f64,
  pub movement:       Movement,
}

impl Anomaly {
  fn detect(
    scope: AnomalyScope,
    month: Month,
    current: f64,
    reference: f64,
  ) -> Option<Self> {
    if reference <= 0.0 {
      return None;
    }
    let change_percent = change_percent(current, reference);
    (change_percent.abs() >= ANOMALY_THRESHOLD_PERCENT).then(|| Self {
      scope,
      month,
      current,
      reference,
      change_percent,
      movement: if change_percent > 0.0 {
        Movement::Rising
      } else {
        Movement::Falling
      },
    })
  }
}

/// Compare the month of `as_of` with last month and with the three-month
/// average, overall and per unit. Units need records in at least two
/// different months to be compared. Unit anomalies are sorted by unit name.
pub fn detect_anomalies(records: &[CostRecord], as_of: NaiveDate) -> Vec<Anomaly> {
  let current = Month::of(as_of);
  let last = current.back(1);

  let this_total = month_total(records, current);
  let last_total = month_total(records, last);
  let average = (1..=3).map(|n| month_total(records, current.back(n))).sum::<f64>() / 3.0;

  let mut anomalies: Vec<Anomaly> = [
    Anomaly::detect(AnomalyScope::Overall, current, this_total, last_total),
    Anomaly::detect(AnomalyScope::VersusAverage, current, this_total, average),
  ]
  .into_iter()
  .flatten()
  .collect();

  // Per unit: (unit, [(month, total)]).
  let mut units: Vec<(String, Vec<(Month, f64)>)> = Vec::new();
  for record in records {
    let unit = record.data.unit.as_deref().unwrap_or(UNASSIGNED);
    let month = Month::of(record.data.cost_date);
    let idx = match units.iter().position(|(u, _)| u == unit) {
      Some(i) => i,
      None => {
        units.push((unit.to_owned(), Vec::new()));
        units.len() - 1
      }
    };
    let by_month = &mut units[idx].1;
    match by_month.iter_mut().find(|(m, _)| *m == month) {
      Some((_, total)) => *total += record.amount(),
      None => by_month.push((month, record.amount())),
    }
  }
  units.sort_by(|a, b| a.0.cmp(&b.0));

  for (unit, by_month) in units {
    if by_month.len() < 2 {
      continue;
    }
    let total_in = |m: Month| {
      by_month.iter().find(|(bm, _)| *bm == m).map_or(0.0, |(_, t)| *t)
    };
    let (now, before) = (total_in(current), total_in(last));
    anomalies.extend(Anomaly::detect(AnomalyScope::Unit { unit }, current, now, before));
  }

  anomalies
}

// ─── Part leaders ────────────────────────────────────────────────────────────

/// Default length of the part leader board.
pub const TOP_PARTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAmount {
  pub category: CostCategory,
  pub amount:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartCost {
  /// 1 for the most expensive part.
  pub rank:        usize,
  /// The record's part code, or [`UNKNOWN`].
  pub part_code:   String,
  /// First part name seen for the code.
  pub part_name:   Option<String>,
  pub total:       f64,
  pub count:       usize,
  /// Largest category first.
  pub by_category: Vec<CategoryAmount>,
}

/// The `limit` part codes with the highest total cost.
pub fn part_leaders(records: &[CostRecord], limit: usize) -> Vec<PartCost> {
  let mut parts: Vec<PartCost> = Vec::new();

  for record in records {
    let code = record.data.part_code.as_deref().unwrap_or(UNKNOWN);
    let amount = record.amount();
    let part = match parts.iter().position(|p| p.part_code == code) {
      Some(i) => &mut parts[i],
      None => {
        parts.push(PartCost {
          rank:        0,
          part_code:   code.to_owned(),
          part_name:   None,
          total:       0.0,
          count:       0,
          by_category: Vec::new(),
        });
        let last = parts.len() - 1;
        &mut parts[last]
      }
    };

    part.total += amount;
    part.count += 1;
    if part.part_name.is_none() {
      part.part_name = record.data.part_name.clone();
    }
    let category = record.category();
    match part.by_category.iter_mut().find(|c| c.category == category) {
      Some(c) => c.amount += amount,
      None => part.by_category.push(CategoryAmount { category, amount }),
    }
  }

  parts.sort_by(|a, b| b.total.total_cmp(&a.total));
  parts.truncate(limit);
  for (i, part) in parts.iter_mut().enumerate() {
    part.rank = i + 1;
    part.by_category.sort_by(|a, b| b.amount.total_cmp(&a.amount));
  }
  parts
}

// ─── Vehicle breakdown ───────────────────────────────────────────────────────

/// Scrap, rework and rejection figures divided by the number of distinct
/// part codes seen for the vehicle type (at least 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerPart {
  pub scrap_cost:   f64,
  pub rework_cost:  f64,
  pub scrap_kg:     f64,
  pub waste_kg:     f64,
  pub rejected_qty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleCost {
  /// The record's vehicle type, or [`UNKNOWN`].
  pub vehicle_type: String,
  pub total:        f64,
  pub scrap_cost:   f64,
  pub rework_cost:  f64,
  pub scrap_kg:     f64,
  pub waste_kg:     f64,
  /// Quantity of scrapped pieces.
  pub rejected_qty: f64,
  pub part_count:   usize,
  pub per_part:     PerPart,
}

/// Cost figures per vehicle type, most expensive first.
pub fn vehicle_breakdown(records: &[CostRecord]) -> Vec<VehicleCost> {
  // Distinct part codes, kept beside each row while accumulating.
  let mut rows: Vec<(VehicleCost, Vec<&str>)> = Vec::new();

  for record in records {
    let data = &record.data;
    let vehicle = data.vehicle_type.as_deref().unwrap_or(UNKNOWN);
    let idx = match rows.iter().position(|(v, _)| v.vehicle_type == vehicle) {
      Some(i) => i,
      None => {
        rows.push((
          VehicleCost {
            vehicle_type: vehicle.to_owned(),
            total:        0.0,
            scrap_cost:   0.0,
            rework_cost:  0.0,
            scrap_kg:     0.0,
            waste_kg:     0.0,
            rejected_qty: 0.0,
            part_count:   0,
            per_part:     PerPart::default(),
          },
          Vec::new(),
        ));
        rows.len() - 1
      }
    };
    let (row, codes) = &mut rows[idx];

    if let Some(code) = data.part_code.as_deref()
      && !codes.contains(&code)
    {
      codes.push(code);
    }
    row.total += data.amount;
    match data.category {
      CostCategory::Scrap => {
        row.scrap_cost += data.amount;
        row.scrap_kg += data.scrap_weight_kg.unwrap_or(0.0);
        row.rejected_qty += data.quantity.unwrap_or(0.0);
      }
      CostCategory::Waste => row.waste_kg += data.scrap_weight_kg.unwrap_or(0.0),
      CostCategory::Rework => row.rework_cost += data.amount,
      _ => {}
    }
  }

  let mut out: Vec<VehicleCost> = rows
    .into_iter()
    .map(|(mut row, codes)| {
      row.part_count = codes.len();
      let n = codes.len().max(1) as f64;
      row.per_part = PerPart {
        scrap_cost:   row.scrap_cost / n,
        rework_cost:  row.rework_cost / n,
        scrap_kg:     row.scrap_kg / n,
        waste_kg:     row.waste_kg / n,
        rejected_qty: row.rejected_qty / n,
      };
      row
    })
    .collect();
  out.sort_by(|a, b| b.total.total_cmp(&a.total));
  out
}
