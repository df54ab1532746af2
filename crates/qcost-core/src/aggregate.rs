//! Line-item, shared-cost and indirect-cost totals, and the proportional
//! distribution of shared costs over line items.

use serde::{Deserialize, Serialize};

use crate::draft::{IndirectCost, LineItem, SharedCost};

pub fn line_items_total(lines: &[LineItem]) -> f64 {
  lines.iter().map(LineItem::effective_amount).sum()
}

pub fn shared_costs_total(shared: &[SharedCost]) -> f64 {
  shared.iter().map(|s| s.amount).sum()
}

pub fn indirect_costs_total(indirect: &[IndirectCost]) -> f64 {
  indirect.iter().map(|i| i.amount).sum()
}

/// The base amount (formula amount or line-items total) plus every surcharge.
pub fn grand_total(base: f64, shared_total: f64, indirect_total: f64) -> f64 {
  base + shared_total + indirect_total
}

// ─── Distribution ────────────────────────────────────────────────────────────

/// One line item's share of the shared costs. Reporting only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineShare {
  /// Position of the line in the draft.
  pub index:             usize,
  pub line_amount:       f64,
  /// The line's share of the line-items total, 0–100.
  pub percentage:        f64,
  pub shared_share:      f64,
  pub total_with_shared: f64,
}

/// Spread `shared_total` over `lines` in proportion to each line's amount.
///
/// Returns an empty vector when there are no lines; the shared total then
/// still counts towards the grand total, just unattributed.
pub fn distribute_shared(lines: &[LineItem], shared_total: f64) -> Vec<LineShare> {
  let total = line_items_total(lines);
  lines
    .iter()
    .enumerate()
    .map(|(index, line)| {
      let line_amount = line.effective_amount();
      let percentage = if total == 0.0 {
        0.0
      } else {
        line_amount / total * 100.0
      };
      let shared_share = shared_total * percentage / 100.0;
      LineShare {
        index,
        line_amount,
        percentage,
        shared_share,
        total_with_shared: line_amount + shared_share,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(amount: f64) -> LineItem {
    LineItem { amount: Some(amount), ..LineItem::default() }
  }

  fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

  #[test]
  fn distributes_freight_proportionally() {
    let lines = vec![line(100.0), line(200.0), line(700.0)];
    let shares = distribute_shared(&lines, 100.0);

    let got: Vec<f64> = shares.iter().map(|s| s.shared_share).collect();
    assert!(close(got[0], 10.0) && close(got[1], 20.0) && close(got[2], 70.0));

    let with: Vec<f64> = shares.iter().map(|s| s.total_with_shared).collect();
    assert!(close(with[0], 110.0));
    assert!(close(with[1], 220.0));
    assert!(close(with[2], 770.0));
  }

  #[test]
  fn shares_sum_to_shared_total_and_percentages_to_hundred() {
    let lines = vec![line(13.37), line(0.5), line(999.99), line(42.0)];
    let shares = distribute_shared(&lines, 77.77);
    let share_sum: f64 = shares.iter().map(|s| s.shared_share).sum();
    let pct_sum: f64 = shares.iter().map(|s| s.percentage).sum();
    assert!(close(share_sum, 77.77));
    assert!(close(pct_sum, 100.0));
  }

  #[test]
  fn zero_total_gives_zero_percentages() {
    let lines = vec![LineItem::default(), LineItem::default()];
    let shares = distribute_shared(&lines, 50.0);
    assert!(shares.iter().all(|s| s.percentage == 0.0 && s.shared_share == 0.0));
  }

  #[test]
  fn no_lines_no_distribution() {
    assert!(distribute_shared(&[], 50.0).is_empty());
  }

  #[test]
  fn changing_one_line_leaves_others_untouched() {
    let mut lines = vec![line(100.0), line(200.0)];
    let before = lines[1].effective_amount();
    lines[0].amount = Some(5000.0);
    assert_eq!(lines[1].effective_amount(), before);
    assert_eq!(line_items_total(&lines), 5200.0);
  }

  #[test]
  fn surcharge_totals() {
    let shared = vec![
      SharedCost { category: "Freight".into(), amount: 40.0, ..SharedCost::default() },
      SharedCost { category: "Travel".into(), amount: 60.0, ..SharedCost::default() },
    ];
    let indirect = vec![IndirectCost {
      category: "Reputation".into(),
      amount: 25.0,
      description: None,
    }];
    assert_eq!(shared_costs_total(&shared), 100.0);
    assert_eq!(indirect_costs_total(&indirect), 25.0);
    assert_eq!(grand_total(1000.0, 100.0, 25.0), 1125.0);
  }
}
